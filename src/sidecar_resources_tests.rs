// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `sidecar_resources`

#[cfg(test)]
mod tests {
    use crate::config::{OidcProviderConfig, OperatorConfig};
    use crate::constants::{
        CA_BUNDLE_KEY, KUBECONFIG_KEY, OAUTH2_PROXY_PORT, OAUTH2_SERVICE_PORT, OIDC_CONFIG_KEY,
        RBAC_CONFIG_KEY,
    };
    use crate::labels::{
        ANNOTATION_CONFIG_HASH, ANNOTATION_HOST, ANNOTATION_SUFFIX, GATE_LABEL_KEY,
        STS_POD_NAME_LABEL,
    };
    use crate::reconcilers::rollout::content_hash;
    use crate::sidecar_resources::{
        attach_owner_reference, build_ca_bundle_secret, build_kubeconfig_secret, build_labels,
        build_oidc_config_secret, build_proxy_ingress, build_proxy_service,
        build_resource_attributes_secret, dependent_name, derive_pod_host, render_oauth2_config,
    };
    use crate::workload::{SidecarTarget, Workload};
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet};
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn test_config() -> OperatorConfig {
        OperatorConfig {
            tenancy: None,
            kubeconfig_source: None,
            ca_bundle_source: None,
            oidc: OidcProviderConfig {
                issuer_url: "https://issuer.example.com".to_string(),
                client_id: "oidc-gate".to_string(),
            },
            ingress_class: Some("nginx".to_string()),
            ingress_tls_secret: None,
        }
    }

    fn test_deployment(name: &str) -> Deployment {
        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_HOST.to_string(), "auth.example.com".to_string());

        let mut match_labels = BTreeMap::new();
        match_labels.insert("app".to_string(), name.to_string());

        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("test-ns".to_string()),
                annotations: Some(annotations),
                uid: Some("uid-1234".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(match_labels),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn test_pod(name: &str, pod_name_label: Option<&str>) -> Pod {
        let mut labels = BTreeMap::new();
        if let Some(value) = pod_name_label {
            labels.insert(STS_POD_NAME_LABEL.to_string(), value.to_string());
        }
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("test-ns".to_string()),
                labels: Some(labels),
                uid: Some("pod-uid-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_labels() {
        let labels = build_labels("my-app");
        assert_eq!(labels.get(GATE_LABEL_KEY).unwrap(), "auth-sidecar");
        assert_eq!(labels.get("app.kubernetes.io/instance").unwrap(), "my-app");
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").unwrap(),
            "oidc-gate"
        );
        assert_eq!(labels.get("app.kubernetes.io/part-of").unwrap(), "oidc-gate");
    }

    #[test]
    fn test_dependent_name_with_suffix() {
        assert_eq!(
            dependent_name("oauth2-proxy", "my-app", Some("abc12")),
            "oauth2-proxy-my-app-abc12"
        );
    }

    #[test]
    fn test_dependent_name_without_suffix() {
        assert_eq!(dependent_name("oauth2-proxy", "my-app", None), "oauth2-proxy-my-app");
        // An empty suffix is treated the same as no suffix
        assert_eq!(
            dependent_name("oauth2-proxy", "my-app", Some("")),
            "oauth2-proxy-my-app"
        );
    }

    #[test]
    fn test_attach_owner_reference_is_idempotent() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);

        let mut meta = ObjectMeta::default();
        attach_owner_reference(&mut meta, workload.owner_reference());
        attach_owner_reference(&mut meta, workload.owner_reference());

        let refs = meta.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "Deployment");
        assert_eq!(refs[0].name, "my-app");
        assert_eq!(refs[0].uid, "uid-1234");
    }

    #[test]
    fn test_build_oidc_config_secret() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let config = test_config();

        let secret = build_oidc_config_secret(&workload, &config).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("oauth2-proxy-my-app"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("test-ns"));
        assert!(secret
            .metadata
            .labels
            .as_ref()
            .unwrap()
            .contains_key(GATE_LABEL_KEY));

        let data = secret.data.as_ref().unwrap();
        let payload = String::from_utf8(data.get(OIDC_CONFIG_KEY).unwrap().0.clone()).unwrap();
        assert!(payload.contains("oidc_issuer_url = \"https://issuer.example.com\""));
        assert!(payload.contains("redirect_url = \"https://auth.example.com/oauth2/callback\""));

        // The hash annotation must match the payload
        let hash = secret
            .metadata
            .annotations
            .as_ref()
            .unwrap()
            .get(ANNOTATION_CONFIG_HASH)
            .unwrap();
        assert_eq!(hash, &content_hash(&payload));
    }

    #[test]
    fn test_build_oidc_config_secret_rejects_unnamed_workload() {
        let mut deployment = test_deployment("my-app");
        deployment.metadata.name = None;
        let workload = Workload::Deployment(&deployment);

        let err = build_oidc_config_secret(&workload, &test_config()).unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
        assert!(!err.is_missing_source());
    }

    #[test]
    fn test_render_oauth2_config_is_deterministic() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let config = test_config();

        assert_eq!(
            render_oauth2_config(&workload, &config),
            render_oauth2_config(&workload, &config)
        );
    }

    #[test]
    fn test_build_resource_attributes_secret() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);

        let secret = build_resource_attributes_secret(&workload, "tenant-ns").unwrap();
        assert_eq!(
            secret.metadata.name.as_deref(),
            Some("resource-attributes-my-app")
        );

        let data = secret.data.as_ref().unwrap();
        let payload = String::from_utf8(data.get(RBAC_CONFIG_KEY).unwrap().0.clone()).unwrap();
        assert!(payload.contains("namespace: tenant-ns"));
        assert!(payload.contains("resource: deployments"));
        assert!(payload.contains("name: my-app"));
    }

    #[test]
    fn test_build_resource_attributes_secret_cluster_scoped() {
        let statefulset = StatefulSet {
            metadata: ObjectMeta {
                name: Some("my-set".to_string()),
                namespace: Some("garden".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let workload = Workload::StatefulSet(&statefulset);

        // An empty namespace requests cluster-scoped attributes downstream
        let secret = build_resource_attributes_secret(&workload, "").unwrap();
        let data = secret.data.as_ref().unwrap();
        let payload = String::from_utf8(data.get(RBAC_CONFIG_KEY).unwrap().0.clone()).unwrap();
        assert!(payload.contains("namespace: ''"));
        assert!(payload.contains("resource: statefulsets"));
    }

    #[test]
    fn test_build_kubeconfig_secret_without_source_is_soft() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let config = test_config();

        let err = build_kubeconfig_secret(&workload, &config).unwrap_err();
        assert!(err.is_missing_source());
    }

    #[test]
    fn test_build_kubeconfig_secret_with_missing_file_is_soft() {
        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let mut config = test_config();
        config.kubeconfig_source = Some("/nonexistent/kubeconfig".into());

        let err = build_kubeconfig_secret(&workload, &config).unwrap_err();
        assert!(err.is_missing_source());
    }

    #[test]
    fn test_build_kubeconfig_secret_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "apiVersion: v1\nkind: Config").unwrap();

        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let mut config = test_config();
        config.kubeconfig_source = Some(file.path().to_path_buf());

        let secret = build_kubeconfig_secret(&workload, &config).unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("kubeconfig-my-app"));

        let data = secret.data.as_ref().unwrap();
        let payload = String::from_utf8(data.get(KUBECONFIG_KEY).unwrap().0.clone()).unwrap();
        assert!(payload.contains("kind: Config"));
    }

    #[test]
    fn test_build_ca_bundle_secret_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-----BEGIN CERTIFICATE-----").unwrap();

        let deployment = test_deployment("my-app");
        let workload = Workload::Deployment(&deployment);
        let mut config = test_config();
        config.ca_bundle_source = Some(file.path().to_path_buf());

        let secret = build_ca_bundle_secret(&workload, &config).unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("oidc-ca-my-app"));
        assert!(secret.data.as_ref().unwrap().contains_key(CA_BUNDLE_KEY));
    }

    #[test]
    fn test_build_proxy_service_for_deployment() {
        let deployment = test_deployment("my-app");
        let target = SidecarTarget::Deployment(&deployment);

        let service = build_proxy_service(&target);
        assert_eq!(service.metadata.name.as_deref(), Some("oauth2-service-my-app"));

        let spec = service.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        // Routed through the workload's own selector
        assert_eq!(spec.selector.as_ref().unwrap().get("app").unwrap(), "my-app");

        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, OAUTH2_SERVICE_PORT);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(OAUTH2_PROXY_PORT)));
    }

    #[test]
    fn test_build_proxy_service_for_replica_pins_pod() {
        let pod = test_pod("my-set-2", Some("my-set-2"));
        let target = SidecarTarget::StatefulSetReplica(&pod);

        let service = build_proxy_service(&target);
        assert_eq!(service.metadata.name.as_deref(), Some("oauth2-service-my-set-2"));

        let selector = service.spec.unwrap().selector.unwrap();
        assert_eq!(selector.get(STS_POD_NAME_LABEL).unwrap(), "my-set-2");
    }

    #[test]
    fn test_build_proxy_service_honors_pod_suffix() {
        let mut pod = test_pod("my-set-0", Some("my-set-0"));
        pod.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(ANNOTATION_SUFFIX.to_string(), "abc12".to_string());
        let target = SidecarTarget::StatefulSetReplica(&pod);

        let service = build_proxy_service(&target);
        assert_eq!(
            service.metadata.name.as_deref(),
            Some("oauth2-service-my-set-0-abc12")
        );
    }

    #[test]
    fn test_build_proxy_ingress() {
        let deployment = test_deployment("my-app");
        let target = SidecarTarget::Deployment(&deployment);
        let config = test_config();

        let ingress = build_proxy_ingress(&target, "auth.example.com", &config);
        assert_eq!(ingress.metadata.name.as_deref(), Some("oauth2-ingress-my-app"));

        let spec = ingress.spec.unwrap();
        assert_eq!(spec.ingress_class_name.as_deref(), Some("nginx"));
        assert!(spec.tls.is_none());

        let rules = spec.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].host.as_deref(), Some("auth.example.com"));

        let paths = &rules[0].http.as_ref().unwrap().paths;
        let backend = paths[0].backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "oauth2-service-my-app");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(OAUTH2_SERVICE_PORT));
    }

    #[test]
    fn test_build_proxy_ingress_with_tls_secret() {
        let deployment = test_deployment("my-app");
        let target = SidecarTarget::Deployment(&deployment);
        let mut config = test_config();
        config.ingress_tls_secret = Some("wildcard-tls".to_string());

        let ingress = build_proxy_ingress(&target, "auth.example.com", &config);
        let tls = ingress.spec.unwrap().tls.unwrap();
        assert_eq!(tls[0].secret_name.as_deref(), Some("wildcard-tls"));
        assert_eq!(tls[0].hosts.as_ref().unwrap()[0], "auth.example.com");
    }

    #[test]
    fn test_derive_pod_host_with_ordinal() {
        let pod = test_pod("myset-2", Some("myset-2"));
        assert_eq!(derive_pod_host("auth.example.com", &pod), "auth-2.example.com");
    }

    #[test]
    fn test_derive_pod_host_without_pod_name_label() {
        let pod = test_pod("myset-2", None);
        assert_eq!(derive_pod_host("auth.example.com", &pod), "auth.example.com");
    }

    #[test]
    fn test_derive_pod_host_without_domain() {
        let pod = test_pod("myset-2", Some("myset-2"));
        // A prefix with no domain separator is used unchanged
        assert_eq!(derive_pod_host("auth", &pod), "auth");
    }

    #[test]
    fn test_derive_pod_host_multi_segment_pod_name() {
        let pod = test_pod("my-long-set-11", Some("my-long-set-11"));
        assert_eq!(
            derive_pod_host("auth.apps.example.com", &pod),
            "auth-11.apps.example.com"
        );
    }
}
