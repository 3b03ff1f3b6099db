//! Built-in Kubernetes resources: names, short names and scope.
//!
//! Used to correct user-typed resource names (`po`, `deploy`, `Pod`) to the
//! canonical identity and to map a kind to its resource without discovery.

use crate::ResourceIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnown {
    pub group: &'static str,
    pub resource: &'static str,
    pub kind: &'static str,
    pub short_names: &'static [&'static str],
    pub namespaced: bool,
}

const fn wk(
    group: &'static str,
    resource: &'static str,
    kind: &'static str,
    short_names: &'static [&'static str],
    namespaced: bool,
) -> WellKnown {
    WellKnown { group, resource, kind, short_names, namespaced }
}

// Core group first: an ungrouped name resolves to the first match.
const BUILTINS: &[WellKnown] = &[
    wk("", "pods", "Pod", &["po"], true),
    wk("", "services", "Service", &["svc"], true),
    wk("", "endpoints", "Endpoints", &["ep"], true),
    wk("", "configmaps", "ConfigMap", &["cm"], true),
    wk("", "secrets", "Secret", &[], true),
    wk("", "serviceaccounts", "ServiceAccount", &["sa"], true),
    wk("", "persistentvolumeclaims", "PersistentVolumeClaim", &["pvc"], true),
    wk("", "events", "Event", &["ev"], true),
    wk("", "limitranges", "LimitRange", &["limits"], true),
    wk("", "resourcequotas", "ResourceQuota", &["quota"], true),
    wk("", "replicationcontrollers", "ReplicationController", &["rc"], true),
    wk("", "podtemplates", "PodTemplate", &[], true),
    wk("", "namespaces", "Namespace", &["ns"], false),
    wk("", "nodes", "Node", &["no"], false),
    wk("", "persistentvolumes", "PersistentVolume", &["pv"], false),
    wk("apps", "deployments", "Deployment", &["deploy"], true),
    wk("apps", "statefulsets", "StatefulSet", &["sts"], true),
    wk("apps", "daemonsets", "DaemonSet", &["ds"], true),
    wk("apps", "replicasets", "ReplicaSet", &["rs"], true),
    wk("apps", "controllerrevisions", "ControllerRevision", &[], true),
    wk("batch", "jobs", "Job", &[], true),
    wk("batch", "cronjobs", "CronJob", &["cj"], true),
    wk("autoscaling", "horizontalpodautoscalers", "HorizontalPodAutoscaler", &["hpa"], true),
    wk("policy", "poddisruptionbudgets", "PodDisruptionBudget", &["pdb"], true),
    wk("networking.k8s.io", "ingresses", "Ingress", &["ing"], true),
    wk("networking.k8s.io", "networkpolicies", "NetworkPolicy", &["netpol"], true),
    wk("networking.k8s.io", "ingressclasses", "IngressClass", &[], false),
    wk("rbac.authorization.k8s.io", "roles", "Role", &[], true),
    wk("rbac.authorization.k8s.io", "rolebindings", "RoleBinding", &[], true),
    wk("rbac.authorization.k8s.io", "clusterroles", "ClusterRole", &[], false),
    wk("rbac.authorization.k8s.io", "clusterrolebindings", "ClusterRoleBinding", &[], false),
    wk("storage.k8s.io", "storageclasses", "StorageClass", &["sc"], false),
    wk("storage.k8s.io", "csidrivers", "CSIDriver", &[], false),
    wk("storage.k8s.io", "csinodes", "CSINode", &[], false),
    wk("storage.k8s.io", "volumeattachments", "VolumeAttachment", &[], false),
    wk("coordination.k8s.io", "leases", "Lease", &[], true),
    wk("discovery.k8s.io", "endpointslices", "EndpointSlice", &[], true),
    wk("scheduling.k8s.io", "priorityclasses", "PriorityClass", &["pc"], false),
    wk("node.k8s.io", "runtimeclasses", "RuntimeClass", &[], false),
    wk("certificates.k8s.io", "certificatesigningrequests", "CertificateSigningRequest", &["csr"], false),
    wk("admissionregistration.k8s.io", "mutatingwebhookconfigurations", "MutatingWebhookConfiguration", &[], false),
    wk("admissionregistration.k8s.io", "validatingwebhookconfigurations", "ValidatingWebhookConfiguration", &[], false),
    wk("flowcontrol.apiserver.k8s.io", "flowschemas", "FlowSchema", &[], false),
    wk("flowcontrol.apiserver.k8s.io", "prioritylevelconfigurations", "PriorityLevelConfiguration", &[], false),
    wk("apiextensions.k8s.io", "customresourcedefinitions", "CustomResourceDefinition", &["crd", "crds"], false),
    wk("apiregistration.k8s.io", "apiservices", "APIService", &[], false),
];

impl WellKnown {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.group, self.resource)
    }

    fn answers_to(&self, name: &str) -> bool {
        self.resource == name
            || self.kind.eq_ignore_ascii_case(name)
            || self.short_names.contains(&name)
    }
}

/// Look up a user-supplied identity (`po`, `Pod`, `deploy.apps`, ...).
///
/// An ungrouped name matches any group; a grouped one only its own group.
pub fn lookup(id: &ResourceIdentity) -> Option<&'static WellKnown> {
    let name = id.resource.to_ascii_lowercase();
    BUILTINS
        .iter()
        .find(|w| (id.group.is_empty() || id.group == w.group) && w.answers_to(&name))
}

/// Canonical identity plus whether the resource is namespaced.
pub fn correct(id: &ResourceIdentity) -> Option<(ResourceIdentity, bool)> {
    lookup(id).map(|w| (w.identity(), w.namespaced))
}

/// Resource name for a built-in kind in `group`.
pub fn resource_for_kind(group: &str, kind: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|w| w.group == group && w.kind == kind)
        .map(|w| w.resource)
}

/// Naive English plural of a kind, for kinds without a table entry.
pub fn guess_resource(kind: &str) -> String {
    let singular = kind.to_ascii_lowercase();
    if singular.ends_with('s') {
        format!("{singular}es")
    } else if let Some(stem) = singular.strip_suffix('y') {
        format!("{stem}ies")
    } else {
        format!("{singular}s")
    }
}

/// Identity for an object of `kind` in `group`.
pub fn identity_for_kind(group: &str, kind: &str) -> ResourceIdentity {
    match resource_for_kind(group, kind) {
        Some(resource) => ResourceIdentity::new(group, resource),
        None => ResourceIdentity::new(group, guess_resource(kind)),
    }
}
