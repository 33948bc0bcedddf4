use std::path::{Path, PathBuf};

use cf_local_runtime_core::cluster::{create_cluster, report_pods, CreatedCluster};
use cf_local_runtime_core::contract::{
    ClusterCreateError, ClusterOptions, MockClusterProvider, MockKubectl, PodSummary,
};

fn options(name: &str) -> ClusterOptions {
    ClusterOptions {
        name: name.to_string(),
        kubeconfig: Some(PathBuf::from("/tmp/kind-kubeconfig")),
        ..ClusterOptions::default()
    }
}

#[tokio::test]
async fn creates_cluster_when_name_is_free() {
    let mut provider = MockClusterProvider::new();
    provider
        .expect_is_known()
        .withf(|name| name == "dev")
        .times(1)
        .returning(|_| Ok(false));
    provider
        .expect_create()
        .withf(|opts: &ClusterOptions| opts.name == "dev" && opts.wait.as_secs() == 120)
        .times(1)
        .returning(|_| Ok(()));

    let created = create_cluster(&options("dev"), &provider)
        .await
        .expect("cluster should be created");
    assert_eq!(
        created,
        CreatedCluster {
            name: "dev".into(),
            kubeconfig: Some(PathBuf::from("/tmp/kind-kubeconfig")),
        }
    );
}

#[tokio::test]
async fn refuses_existing_cluster_without_creating() {
    let mut provider = MockClusterProvider::new();
    provider.expect_is_known().returning(|_| Ok(true));
    provider.expect_create().never();

    let err = create_cluster(&options("kind"), &provider).await.unwrap_err();
    assert_eq!(err.to_string(), "a cluster with the name \"kind\" already exists");
}

#[tokio::test]
async fn lookup_errors_are_surfaced_unchanged() {
    let mut provider = MockClusterProvider::new();
    provider
        .expect_is_known()
        .returning(|_| Err("docker daemon unreachable".into()));
    provider.expect_create().never();

    let err = create_cluster(&options("kind"), &provider).await.unwrap_err();
    assert_eq!(err.to_string(), "docker daemon unreachable");
}

#[tokio::test]
async fn invalid_config_aborts_with_fixed_message() {
    let mut provider = MockClusterProvider::new();
    provider.expect_is_known().returning(|_| Ok(false));
    provider.expect_create().returning(|_| {
        Err(ClusterCreateError::InvalidConfig(vec![
            "unknown field \"nodez\"".into(),
            "invalid role \"master\"".into(),
        ]))
    });

    let err = create_cluster(&options("kind"), &provider).await.unwrap_err();
    assert_eq!(err.to_string(), "aborting due to invalid configuration");
}

#[tokio::test]
async fn other_create_failures_are_wrapped() {
    let mut provider = MockClusterProvider::new();
    provider.expect_is_known().returning(|_| Ok(false));
    provider
        .expect_create()
        .returning(|_| Err(ClusterCreateError::Failed("node image not found".into())));

    let err = create_cluster(&options("kind"), &provider).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to create cluster: node image not found");
}

#[tokio::test]
async fn report_pods_counts_all_namespaces_once() {
    let mut kubectl = MockKubectl::new();
    kubectl
        .expect_list_pods()
        .withf(|path: &Path| path == Path::new("/tmp/kind-kubeconfig"))
        .times(1)
        .returning(|_| {
            Ok(vec![
                PodSummary {
                    name: "coredns-5c98db65d4-8qbvr".into(),
                    namespace: "kube-system".into(),
                    phase: Some("Running".into()),
                },
                PodSummary {
                    name: "etcd-kind-control-plane".into(),
                    namespace: "kube-system".into(),
                    phase: None,
                },
            ])
        });

    let count = report_pods(&kubectl, Path::new("/tmp/kind-kubeconfig"))
        .await
        .unwrap();
    assert_eq!(count, 2);
}
