// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `namespace.rs`

#[cfg(test)]
mod tests {
    use crate::config::{OidcProviderConfig, OperatorConfig, TenancyConfig};
    use crate::crd::{ClusterRegistration, ClusterRegistrationSpec};
    use crate::reconcilers::namespace::{classify, tenant_namespace, AttributesSource};
    use serde_json::json;

    fn config(shared_namespace: Option<&str>) -> OperatorConfig {
        OperatorConfig {
            tenancy: shared_namespace.map(|ns| TenancyConfig {
                shared_namespace: ns.to_string(),
            }),
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

    fn registration(name: &str, tenant: serde_json::Value) -> ClusterRegistration {
        ClusterRegistration::new(name, ClusterRegistrationSpec { tenant })
    }

    #[test]
    fn test_classify_single_tenant_uses_workload_namespace() {
        assert_eq!(
            classify(&config(None), "any-ns"),
            AttributesSource::WorkloadNamespace
        );
    }

    #[test]
    fn test_classify_shared_namespace_is_cluster_scoped() {
        assert_eq!(
            classify(&config(Some("garden")), "garden"),
            AttributesSource::ClusterScoped
        );
    }

    #[test]
    fn test_classify_tenant_namespace_requires_lookup() {
        assert_eq!(
            classify(&config(Some("garden")), "shoot--proj--a"),
            AttributesSource::TenantLookup
        );
    }

    #[test]
    fn test_tenant_namespace_resolves_matching_registration() {
        let registrations = vec![
            registration(
                "shoot--proj--a",
                json!({ "metadata": { "name": "a", "namespace": "project-a" } }),
            ),
            registration(
                "shoot--proj--b",
                json!({ "metadata": { "name": "b", "namespace": "project-b" } }),
            ),
        ];

        assert_eq!(
            tenant_namespace(&registrations, "shoot--proj--b"),
            Some("project-b".to_string())
        );
    }

    #[test]
    fn test_tenant_namespace_no_match_is_none() {
        let registrations = vec![registration(
            "shoot--proj--a",
            json!({ "metadata": { "namespace": "project-a" } }),
        )];

        assert_eq!(tenant_namespace(&registrations, "shoot--proj--x"), None);
    }

    #[test]
    fn test_tenant_namespace_unparsable_spec_is_none() {
        // A tenant document that is not an object cannot carry a namespace
        let registrations = vec![registration("shoot--proj--a", json!("not-an-object"))];

        assert_eq!(tenant_namespace(&registrations, "shoot--proj--a"), None);
    }

    #[test]
    fn test_tenant_namespace_without_namespace_field_is_none() {
        let registrations = vec![registration(
            "shoot--proj--a",
            json!({ "metadata": { "name": "a" } }),
        )];

        assert_eq!(tenant_namespace(&registrations, "shoot--proj--a"), None);
    }

    #[test]
    fn test_tenant_namespace_empty_list_is_none() {
        assert_eq!(tenant_namespace(&[], "shoot--proj--a"), None);
    }
}
