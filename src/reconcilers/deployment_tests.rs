// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `deployment.rs`

#[cfg(test)]
mod tests {
    use crate::config::{OidcProviderConfig, OperatorConfig};
    use crate::labels::ANNOTATION_HOST;
    use crate::reconcilers::deployment::reconcile_deployment_dependencies;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use std::collections::BTreeMap;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> OperatorConfig {
        OperatorConfig {
            tenancy: None,
            kubeconfig_source: None,
            ca_bundle_source: None,
            oidc: OidcProviderConfig {
                issuer_url: "https://issuer.example.com".to_string(),
                client_id: "oidc-gate".to_string(),
            },
            ingress_class: None,
            ingress_tls_secret: None,
        }
    }

    /// A client backed by a server that rejects every request and asserts
    /// on shutdown that none arrived.
    async fn client_expecting_no_requests() -> (MockServer, kube::Client) {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = kube::Config::new(server.uri().parse().unwrap());
        let client = kube::Client::try_from(config).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_terminating_deployment_causes_no_writes() {
        let (server, client) = client_expecting_no_requests().await;

        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_HOST.to_string(), "auth.example.com".to_string());

        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("my-app".to_string()),
                namespace: Some("test-ns".to_string()),
                uid: Some("uid-1234".to_string()),
                annotations: Some(annotations),
                deletion_timestamp: Some(Time(Default::default())),
                ..Default::default()
            },
            ..Default::default()
        };

        reconcile_deployment_dependencies(&client, &test_config(), &deployment)
            .await
            .expect("a terminating deployment is a no-op");

        server.verify().await;
    }
}
