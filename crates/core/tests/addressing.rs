#![forbid(unsafe_code)]

use kectl_core::{media_type_for, prefix_for, wellknown, MediaType, ResourceIdentity};

#[test]
fn every_builtin_kind_resolves_to_a_binary_ungrouped_or_overridden_prefix() {
    for kind in ["Pod", "ConfigMap", "Secret", "Deployment", "Job", "Lease", "Role"] {
        let group = match kind {
            "Deployment" => "apps",
            "Job" => "batch",
            "Lease" => "coordination.k8s.io",
            "Role" => "rbac.authorization.k8s.io",
            _ => "",
        };
        let id = wellknown::identity_for_kind(group, kind);
        let prefix = prefix_for(&id).unwrap();
        assert_eq!(prefix, id.resource, "{kind}");
        assert!(!prefix.ends_with('/'));
        assert_eq!(media_type_for(&id).unwrap(), MediaType::StorageBinary, "{kind}");
    }
}

#[test]
fn custom_resources_are_json_under_their_group() {
    let id = wellknown::identity_for_kind("stable.example.com", "CronTab");
    assert_eq!(id, ResourceIdentity::new("stable.example.com", "crontabs"));
    assert_eq!(prefix_for(&id).unwrap(), "stable.example.com/crontabs");
    assert_eq!(media_type_for(&id).unwrap(), MediaType::Json);
}

#[test]
fn resolution_is_deterministic() {
    let id = ResourceIdentity::parse("widgets.example.com");
    let first = (prefix_for(&id).unwrap(), media_type_for(&id).unwrap());
    for _ in 0..8 {
        assert_eq!((prefix_for(&id).unwrap(), media_type_for(&id).unwrap()), first);
    }
}
