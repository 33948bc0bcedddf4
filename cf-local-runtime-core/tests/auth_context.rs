use std::fs::write;
use std::path::Path;

use cf_local_runtime_core::auth::{read_auth_context, AuthError};
use cf_local_runtime_core::codefresh::CodefreshClient;
use tempfile::NamedTempFile;

const CFCONFIG: &str = r#"
contexts:
  default:
    type: APIKey
    name: default
    url: https://g.codefresh.io
    token: 5d1f.abcdef
    beta: false
    onPrem: false
  staging:
    type: APIKey
    url: https://staging.codefresh.io
    token: staging-token
current-context: default
"#;

fn cfconfig(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp cfconfig");
    write(file.path(), content).unwrap();
    file
}

#[test]
fn empty_name_selects_current_context() {
    let file = cfconfig(CFCONFIG);
    for name in [None, Some("")] {
        let ctx = read_auth_context(file.path(), name).expect("context");
        assert_eq!(ctx.name, "default");
        assert_eq!(ctx.url, "https://g.codefresh.io");
        assert_eq!(ctx.token, "5d1f.abcdef");
        assert_eq!(ctx.kind.as_deref(), Some("APIKey"));
    }
}

#[test]
fn named_context_takes_its_key_as_name() {
    let file = cfconfig(CFCONFIG);
    let ctx = read_auth_context(file.path(), Some("staging")).unwrap();
    assert_eq!(ctx.name, "staging");
    assert_eq!(ctx.token, "staging-token");
}

#[test]
fn missing_file_reports_read_failure() {
    let err = read_auth_context(Path::new("/nonexistent/.cfconfig"), None).unwrap_err();
    assert!(matches!(err, AuthError::Read(..)));
    assert!(err.to_string().starts_with("Failed to read codefresh config file"));
}

#[test]
fn unknown_context_and_missing_token_are_errors() {
    let file = cfconfig(CFCONFIG);
    assert!(matches!(
        read_auth_context(file.path(), Some("prod")),
        Err(AuthError::UnknownContext(name)) if name == "prod"
    ));

    let file = cfconfig(
        "contexts:\n  default:\n    url: https://g.codefresh.io\ncurrent-context: default\n",
    );
    assert!(matches!(
        read_auth_context(file.path(), None),
        Err(AuthError::MissingToken(_))
    ));
}

#[test]
fn no_current_context_is_an_error() {
    let file = cfconfig("contexts: {}\n");
    assert!(matches!(
        read_auth_context(file.path(), None),
        Err(AuthError::NoCurrentContext)
    ));
}

#[test]
fn invalid_yaml_is_a_parse_error() {
    let file = cfconfig("contexts: [:::");
    assert!(matches!(
        read_auth_context(file.path(), None),
        Err(AuthError::Parse(..))
    ));
}

#[test]
fn context_without_url_targets_default_host() {
    let file = cfconfig("contexts:\n  default:\n    token: abc\ncurrent-context: default\n");
    let ctx = read_auth_context(file.path(), None).expect("url is optional");
    assert_eq!(ctx.url, "");

    let client = CodefreshClient::from_auth_context(&ctx).expect("client");
    assert_eq!(client.host().as_str(), "https://g.codefresh.io/");
}
