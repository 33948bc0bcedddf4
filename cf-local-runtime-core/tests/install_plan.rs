use std::fs::write;
use std::path::PathBuf;

use cf_local_runtime_core::install::{
    is_using_default_storage_class, plan_install, InstallCmdOptions, InstallTarget, KubeOptions,
    PluginBuilder, PluginType, DEFAULT_STORAGE_CLASS_NAME_PREFIX,
};
use tempfile::NamedTempFile;

const KIND_KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: kind-kind
clusters:
  - name: kind-kind
    cluster:
      server: https://127.0.0.1:40123
contexts:
  - name: kind-kind
    context:
      cluster: kind-kind
      user: kind-kind
users:
  - name: kind-kind
"#;

fn kubeconfig() -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp kubeconfig");
    write(file.path(), KIND_KUBECONFIG).unwrap();
    file
}

fn target(kubeconfig: PathBuf) -> InstallTarget {
    InstallTarget {
        codefresh_host: "https://g.codefresh.io".into(),
        codefresh_token: "secret".into(),
        kubeconfig,
    }
}

fn with_context() -> InstallCmdOptions {
    InstallCmdOptions {
        kube: KubeOptions {
            context: "kubernetes-admin@kind".into(),
            ..KubeOptions::default()
        },
        ..InstallCmdOptions::default()
    }
}

#[test]
fn default_storage_class_detection() {
    assert!(is_using_default_storage_class(""));
    assert!(is_using_default_storage_class("dind-local-volumes-venona-ci"));
    assert!(!is_using_default_storage_class("standard"));
}

#[test]
fn builder_keeps_insertion_order() {
    let mut builder = PluginBuilder::new();
    builder.add(PluginType::Venona).add(PluginType::Engine);
    assert_eq!(builder.get(), &[PluginType::Venona, PluginType::Engine]);
}

struct Case {
    name: &'static str,
    opts: InstallCmdOptions,
    expected: Vec<PluginType>,
}

#[test]
fn plugin_selection_follows_flags() {
    let file = kubeconfig();
    let cases = vec![
        Case {
            name: "defaults",
            opts: with_context(),
            expected: vec![
                PluginType::RuntimeEnvironment,
                PluginType::Venona,
                PluginType::VolumeProvisioner,
            ],
        },
        Case {
            name: "kubernetes runner type goes first",
            opts: InstallCmdOptions {
                kubernetes_runner_type: true,
                ..with_context()
            },
            expected: vec![
                PluginType::Engine,
                PluginType::RuntimeEnvironment,
                PluginType::Venona,
                PluginType::VolumeProvisioner,
            ],
        },
        Case {
            name: "only runtime environment",
            opts: InstallCmdOptions {
                install_only_runtime_environment: true,
                ..with_context()
            },
            expected: vec![PluginType::RuntimeEnvironment, PluginType::VolumeProvisioner],
        },
        Case {
            name: "skip runtime installation",
            opts: InstallCmdOptions {
                skip_runtime_installation: true,
                runtime_environment_name: "kind/default".into(),
                ..with_context()
            },
            expected: vec![PluginType::Venona, PluginType::VolumeProvisioner],
        },
        Case {
            name: "custom storage class skips provisioner",
            opts: InstallCmdOptions {
                storage_class: "standard".into(),
                ..with_context()
            },
            expected: vec![PluginType::RuntimeEnvironment, PluginType::Venona],
        },
    ];

    for case in cases {
        let plan = plan_install(&case.opts, &target(file.path().to_path_buf()))
            .unwrap_or_else(|e| panic!("{}: plan failed: {}", case.name, e));
        assert_eq!(plan.plugins, case.expected, "{}", case.name);
    }
}

#[test]
fn conflicting_flags_are_rejected() {
    let opts = InstallCmdOptions {
        install_only_runtime_environment: true,
        skip_runtime_installation: true,
        runtime_environment_name: "kind/default".into(),
        ..with_context()
    };
    let err = plan_install(&opts, &target(PathBuf::from("/nonexistent"))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot use both flags skip-runtime-installation and only-runtime-environment"
    );
}

#[test]
fn skip_runtime_installation_requires_runtime_environment() {
    let opts = InstallCmdOptions {
        skip_runtime_installation: true,
        ..with_context()
    };
    let err = plan_install(&opts, &target(PathBuf::from("/nonexistent"))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "runtime-environment flag is required when using flag skip-runtime-installation"
    );
}

#[test]
fn empty_context_and_namespace_are_resolved() {
    let file = kubeconfig();
    let plan = plan_install(&InstallCmdOptions::default(), &target(file.path().to_path_buf()))
        .expect("plan");

    assert_eq!(plan.options.kube.context, "kind-kind");
    assert_eq!(plan.options.kube.namespace, "default");
    assert_eq!(plan.options.cluster_namespace, "default");
    assert_eq!(plan.options.cluster_name, "kind-kind");
    assert!(plan.options.register_with_agent);
    assert_eq!(plan.values["Context"], "kind-kind");
}

#[test]
fn missing_kubeconfig_fails_only_when_context_is_needed() {
    let err = plan_install(
        &InstallCmdOptions::default(),
        &target(PathBuf::from("/nonexistent/kubeconfig")),
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to read kubeconfig"), "{err}");

    let missing = target(PathBuf::from("/nonexistent/kubeconfig"));
    assert!(plan_install(&with_context(), &missing).is_ok());
}

#[test]
fn cluster_name_in_codefresh_disables_agent_registration() {
    let opts = InstallCmdOptions {
        cluster_name_in_codefresh: "my-cluster".into(),
        ..with_context()
    };
    let plan = plan_install(&opts, &target(PathBuf::from("/unused"))).unwrap();
    assert_eq!(plan.options.cluster_name, "my-cluster");
    assert!(!plan.options.register_with_agent);
    assert_eq!(plan.options.kube.context, "kubernetes-admin@kind");
}

#[test]
fn storage_class_and_version_land_in_values() {
    let opts = InstallCmdOptions {
        venona_version: "0.30.1".into(),
        kube: KubeOptions {
            namespace: "codefresh".into(),
            context: "kind-kind".into(),
            in_cluster: false,
        },
        ..InstallCmdOptions::default()
    };
    let plan = plan_install(&opts, &target(PathBuf::from("/unused"))).unwrap();

    assert_eq!(plan.options.storage_class, DEFAULT_STORAGE_CLASS_NAME_PREFIX);
    assert!(plan.options.is_default_storage_class);
    assert_eq!(
        plan.values["StorageClass"],
        "dind-local-volumes-venona-codefresh"
    );
    assert_eq!(plan.values["ImageTag"], "0.30.1");
    assert_eq!(plan.values["Namespace"], "codefresh");
    assert!(plan.values.get("RuntimeEnvironment").is_none());
}

#[test]
fn custom_storage_class_is_kept_verbatim() {
    let opts = InstallCmdOptions {
        storage_class: "standard".into(),
        dry_run: true,
        set_default_runtime: true,
        ..with_context()
    };
    let plan = plan_install(&opts, &target(PathBuf::from("/unused"))).unwrap();
    assert_eq!(plan.options.effective_storage_class(), "standard");
    assert!(plan.options.dry_run);
    assert!(plan.options.mark_as_default);
    assert_eq!(plan.values["DryRun"], true);
}
