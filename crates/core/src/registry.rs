//! Storage layout exceptions hard-coded into the API server.
//!
//! These tables are read-only for the lifetime of the process.

use crate::ResourceIdentity;

/// `(group, resource, prefix)`: resources stored under a historical prefix.
const PREFIX_OVERRIDES: &[(&str, &str, &str)] = &[
    ("", "replicationcontrollers", "controllers"),
    ("", "endpoints", "services/endpoints"),
    ("", "nodes", "minions"),
    ("", "services", "services/specs"),
    ("extensions", "ingresses", "ingress"),
    ("networking.k8s.io", "ingresses", "ingress"),
    ("policy", "podsecuritypolicies", "podsecuritypolicy"),
];

/// Groups served by the aggregator and extension servers. They keep the
/// group segment in their keys and are stored as JSON.
const EXCEPTION_GROUPS: &[&str] = &["apiextensions.k8s.io", "apiregistration.k8s.io"];

/// Literal storage prefix for an identity with an irregular layout.
pub fn prefix_override(id: &ResourceIdentity) -> Option<&'static str> {
    PREFIX_OVERRIDES
        .iter()
        .find(|(group, resource, _)| *group == id.group && *resource == id.resource)
        .map(|(_, _, prefix)| *prefix)
}

pub fn is_exception_group(group: &str) -> bool {
    EXCEPTION_GROUPS.contains(&group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_match_exact_identity_only() {
        assert_eq!(prefix_override(&ResourceIdentity::new("", "nodes")), Some("minions"));
        assert_eq!(prefix_override(&ResourceIdentity::new("networking.k8s.io", "ingresses")), Some("ingress"));
        assert_eq!(prefix_override(&ResourceIdentity::new("example.com", "nodes")), None);
        assert_eq!(prefix_override(&ResourceIdentity::new("", "pods")), None);
    }

    #[test]
    fn exception_groups() {
        assert!(is_exception_group("apiextensions.k8s.io"));
        assert!(!is_exception_group("apps"));
    }
}
