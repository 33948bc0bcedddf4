//! Embedded Kubernetes manifests and the `{{ Key }}` renderer used by the plugins.

use regex::{Captures, Regex};

use crate::contract::{CoreError, Values};

pub const VENONA: &str = include_str!("templates/venona.yaml");
pub const ENGINE: &str = include_str!("templates/engine.yaml");
pub const VOLUME_PROVISIONER: &str = include_str!("templates/volume-provisioner.yaml");

/// Substitute every `{{ Key }}` (or `{{ .Key }}`) placeholder from `values`.
///
/// Strings are inserted verbatim, numbers and booleans through their JSON form.
/// A placeholder without a scalar value is an error.
pub fn render(template: &str, values: &Values) -> Result<String, CoreError> {
    let re = Regex::new(r"\{\{\s*\.?([A-Za-z][A-Za-z0-9_]*)\s*\}\}")?;
    let mut missing = Vec::new();
    let rendered = re.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match values.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v @ serde_json::Value::Number(_)) | Some(v @ serde_json::Value::Bool(_)) => {
                v.to_string()
            }
            _ => {
                missing.push(key.to_string());
                String::new()
            }
        }
    });
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(format!("unresolved template values: {}", missing.join(", ")).into());
    }
    Ok(rendered.into_owned())
}
