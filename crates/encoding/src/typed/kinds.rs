//! Protobuf field tables for the built-in kinds stored as typed bodies.
//!
//! Tags follow the `generated.proto` files of `k8s.io/api` and
//! `k8s.io/apimachinery`.

use super::pod::{LOCAL_OBJECT_REFERENCE, POD, POD_TEMPLATE_SPEC};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Ty {
    Str,
    Bool,
    I32,
    I64,
    /// base64 in JSON, raw bytes on the wire.
    Bytes,
    Time,
    MicroTime,
    Quantity,
    IntOrString,
    /// Arbitrary JSON kept as bytes, e.g. `fieldsV1`.
    RawJson,
    Msg(&'static [Field]),
    StrMap,
    BytesMap,
    QuantityMap,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Field {
    pub name: &'static str,
    pub tag: u32,
    pub ty: Ty,
    pub repeated: bool,
    /// Embedded message whose fields sit on the parent JSON object.
    pub inline: bool,
}

pub(crate) const fn one(name: &'static str, tag: u32, ty: Ty) -> Field {
    Field { name, tag, ty, repeated: false, inline: false }
}

pub(crate) const fn many(name: &'static str, tag: u32, ty: Ty) -> Field {
    Field { name, tag, ty, repeated: true, inline: false }
}

pub(crate) const fn inline(tag: u32, fields: &'static [Field]) -> Field {
    Field { name: "", tag, ty: Ty::Msg(fields), repeated: false, inline: true }
}

use Ty::*;

// meta/v1

const OWNER_REFERENCE: &[Field] = &[
    one("kind", 1, Str),
    one("name", 3, Str),
    one("uid", 4, Str),
    one("apiVersion", 5, Str),
    one("controller", 6, Bool),
    one("blockOwnerDeletion", 7, Bool),
];

const MANAGED_FIELDS_ENTRY: &[Field] = &[
    one("manager", 1, Str),
    one("operation", 2, Str),
    one("apiVersion", 3, Str),
    one("time", 4, Time),
    one("fieldsType", 6, Str),
    one("fieldsV1", 7, RawJson),
    one("subresource", 8, Str),
];

pub(crate) const OBJECT_META: &[Field] = &[
    one("name", 1, Str),
    one("generateName", 2, Str),
    one("namespace", 3, Str),
    one("selfLink", 4, Str),
    one("uid", 5, Str),
    one("resourceVersion", 6, Str),
    one("generation", 7, I64),
    one("creationTimestamp", 8, Time),
    one("deletionTimestamp", 9, Time),
    one("deletionGracePeriodSeconds", 10, I64),
    one("labels", 11, StrMap),
    one("annotations", 12, StrMap),
    many("ownerReferences", 13, Msg(OWNER_REFERENCE)),
    many("finalizers", 14, Str),
    many("managedFields", 17, Msg(MANAGED_FIELDS_ENTRY)),
];

const LABEL_SELECTOR_REQUIREMENT: &[Field] = &[one("key", 1, Str), one("operator", 2, Str), many("values", 3, Str)];

pub(crate) const LABEL_SELECTOR: &[Field] =
    &[one("matchLabels", 1, StrMap), many("matchExpressions", 2, Msg(LABEL_SELECTOR_REQUIREMENT))];

const CONDITION: &[Field] = &[
    one("type", 1, Str),
    one("status", 2, Str),
    one("observedGeneration", 3, I64),
    one("lastTransitionTime", 4, Time),
    one("reason", 5, Str),
    one("message", 6, Str),
];

// core/v1

const CONFIG_MAP: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("data", 2, StrMap),
    one("binaryData", 3, BytesMap),
    one("immutable", 4, Bool),
];

const SECRET: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("data", 2, BytesMap),
    one("type", 3, Str),
    one("stringData", 4, StrMap),
    one("immutable", 5, Bool),
];

const NAMESPACE_CONDITION: &[Field] = &[
    one("type", 1, Str),
    one("status", 2, Str),
    one("lastTransitionTime", 4, Time),
    one("reason", 5, Str),
    one("message", 6, Str),
];

const NAMESPACE_SPEC: &[Field] = &[many("finalizers", 1, Str)];

const NAMESPACE_STATUS: &[Field] = &[one("phase", 1, Str), many("conditions", 2, Msg(NAMESPACE_CONDITION))];

const NAMESPACE: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("spec", 2, Msg(NAMESPACE_SPEC)),
    one("status", 3, Msg(NAMESPACE_STATUS)),
];

const OBJECT_REFERENCE: &[Field] = &[
    one("kind", 1, Str),
    one("namespace", 2, Str),
    one("name", 3, Str),
    one("uid", 4, Str),
    one("apiVersion", 5, Str),
    one("resourceVersion", 6, Str),
    one("fieldPath", 7, Str),
];

const SERVICE_ACCOUNT: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    many("secrets", 2, Msg(OBJECT_REFERENCE)),
    many("imagePullSecrets", 3, Msg(LOCAL_OBJECT_REFERENCE)),
    one("automountServiceAccountToken", 4, Bool),
];

const SERVICE_PORT: &[Field] = &[
    one("name", 1, Str),
    one("protocol", 2, Str),
    one("port", 3, I32),
    one("targetPort", 4, IntOrString),
    one("nodePort", 5, I32),
    one("appProtocol", 6, Str),
];

const CLIENT_IP_CONFIG: &[Field] = &[one("timeoutSeconds", 1, I32)];

const SESSION_AFFINITY_CONFIG: &[Field] = &[one("clientIP", 1, Msg(CLIENT_IP_CONFIG))];

const SERVICE_SPEC: &[Field] = &[
    many("ports", 1, Msg(SERVICE_PORT)),
    one("selector", 2, StrMap),
    one("clusterIP", 3, Str),
    one("type", 4, Str),
    many("externalIPs", 5, Str),
    one("sessionAffinity", 7, Str),
    one("loadBalancerIP", 8, Str),
    many("loadBalancerSourceRanges", 9, Str),
    one("externalName", 10, Str),
    one("externalTrafficPolicy", 11, Str),
    one("healthCheckNodePort", 12, I32),
    one("publishNotReadyAddresses", 13, Bool),
    one("sessionAffinityConfig", 14, Msg(SESSION_AFFINITY_CONFIG)),
    one("ipFamilyPolicy", 17, Str),
    many("clusterIPs", 18, Str),
    many("ipFamilies", 19, Str),
    one("allocateLoadBalancerNodePorts", 20, Bool),
    one("loadBalancerClass", 21, Str),
    one("internalTrafficPolicy", 22, Str),
];

const PORT_STATUS: &[Field] = &[one("port", 1, I32), one("protocol", 2, Str), one("error", 3, Str)];

const LOAD_BALANCER_INGRESS: &[Field] =
    &[one("ip", 1, Str), one("hostname", 2, Str), many("ports", 4, Msg(PORT_STATUS))];

const LOAD_BALANCER_STATUS: &[Field] = &[many("ingress", 1, Msg(LOAD_BALANCER_INGRESS))];

const SERVICE_STATUS: &[Field] = &[
    one("loadBalancer", 1, Msg(LOAD_BALANCER_STATUS)),
    many("conditions", 2, Msg(CONDITION)),
];

const SERVICE: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("spec", 2, Msg(SERVICE_SPEC)),
    one("status", 3, Msg(SERVICE_STATUS)),
];

const TAINT: &[Field] = &[one("key", 1, Str), one("value", 2, Str), one("effect", 3, Str), one("timeAdded", 4, Time)];

const NODE_SPEC: &[Field] = &[
    one("podCIDR", 1, Str),
    one("providerID", 3, Str),
    one("unschedulable", 4, Bool),
    many("taints", 5, Msg(TAINT)),
    many("podCIDRs", 7, Str),
];

const NODE_CONDITION: &[Field] = &[
    one("type", 1, Str),
    one("status", 2, Str),
    one("lastHeartbeatTime", 3, Time),
    one("lastTransitionTime", 4, Time),
    one("reason", 5, Str),
    one("message", 6, Str),
];

const NODE_SYSTEM_INFO: &[Field] = &[
    one("machineID", 1, Str),
    one("systemUUID", 2, Str),
    one("bootID", 3, Str),
    one("kernelVersion", 4, Str),
    one("osImage", 5, Str),
    one("containerRuntimeVersion", 6, Str),
    one("kubeletVersion", 7, Str),
    one("kubeProxyVersion", 8, Str),
    one("operatingSystem", 9, Str),
    one("architecture", 10, Str),
];

const NODE_ADDRESS: &[Field] = &[one("type", 1, Str), one("address", 2, Str)];

const DAEMON_ENDPOINT: &[Field] = &[one("Port", 1, I32)];

const NODE_DAEMON_ENDPOINTS: &[Field] = &[one("kubeletEndpoint", 1, Msg(DAEMON_ENDPOINT))];

const NODE_STATUS: &[Field] = &[
    one("capacity", 1, QuantityMap),
    one("allocatable", 2, QuantityMap),
    one("phase", 3, Str),
    many("conditions", 4, Msg(NODE_CONDITION)),
    many("addresses", 5, Msg(NODE_ADDRESS)),
    one("daemonEndpoints", 6, Msg(NODE_DAEMON_ENDPOINTS)),
    one("nodeInfo", 7, Msg(NODE_SYSTEM_INFO)),
];

const NODE: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("spec", 2, Msg(NODE_SPEC)),
    one("status", 3, Msg(NODE_STATUS)),
];

// apps/v1

const ROLLING_UPDATE_DEPLOYMENT: &[Field] = &[one("maxUnavailable", 1, IntOrString), one("maxSurge", 2, IntOrString)];

const DEPLOYMENT_STRATEGY: &[Field] = &[one("type", 1, Str), one("rollingUpdate", 2, Msg(ROLLING_UPDATE_DEPLOYMENT))];

const DEPLOYMENT_SPEC: &[Field] = &[
    one("replicas", 1, I32),
    one("selector", 2, Msg(LABEL_SELECTOR)),
    one("template", 3, Msg(POD_TEMPLATE_SPEC)),
    one("strategy", 4, Msg(DEPLOYMENT_STRATEGY)),
    one("minReadySeconds", 5, I32),
    one("revisionHistoryLimit", 6, I32),
    one("paused", 7, Bool),
    one("progressDeadlineSeconds", 9, I32),
];

const DEPLOYMENT_CONDITION: &[Field] = &[
    one("type", 1, Str),
    one("status", 2, Str),
    one("reason", 4, Str),
    one("message", 5, Str),
    one("lastUpdateTime", 6, Time),
    one("lastTransitionTime", 7, Time),
];

const DEPLOYMENT_STATUS: &[Field] = &[
    one("observedGeneration", 1, I64),
    one("replicas", 2, I32),
    one("updatedReplicas", 3, I32),
    one("availableReplicas", 4, I32),
    one("unavailableReplicas", 5, I32),
    many("conditions", 6, Msg(DEPLOYMENT_CONDITION)),
    one("readyReplicas", 7, I32),
    one("collisionCount", 8, I32),
];

const DEPLOYMENT: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("spec", 2, Msg(DEPLOYMENT_SPEC)),
    one("status", 3, Msg(DEPLOYMENT_STATUS)),
];

// coordination.k8s.io/v1

const LEASE_SPEC: &[Field] = &[
    one("holderIdentity", 1, Str),
    one("leaseDurationSeconds", 2, I32),
    one("acquireTime", 3, MicroTime),
    one("renewTime", 4, MicroTime),
    one("leaseTransitions", 5, I32),
];

const LEASE: &[Field] = &[one("metadata", 1, Msg(OBJECT_META)), one("spec", 2, Msg(LEASE_SPEC))];

/// `(apiVersion, kind)` pairs with a typed body.
const KINDS: &[(&str, &str, &[Field])] = &[
    ("v1", "Pod", POD),
    ("v1", "ConfigMap", CONFIG_MAP),
    ("v1", "Secret", SECRET),
    ("v1", "Namespace", NAMESPACE),
    ("v1", "ServiceAccount", SERVICE_ACCOUNT),
    ("v1", "Service", SERVICE),
    ("v1", "Node", NODE),
    ("apps/v1", "Deployment", DEPLOYMENT),
    ("coordination.k8s.io/v1", "Lease", LEASE),
];

pub(crate) fn lookup(api_version: &str, kind: &str) -> Option<&'static [Field]> {
    KINDS.iter().find(|(v, k, _)| *v == api_version && *k == kind).map(|(_, _, fields)| *fields)
}
