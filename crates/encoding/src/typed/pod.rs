//! core/v1 Pod and the pod template used by workload kinds.

use super::kinds::Ty::*;
use super::kinds::{inline, many, one, Field, LABEL_SELECTOR, OBJECT_META};

pub(crate) const LOCAL_OBJECT_REFERENCE: &[Field] = &[one("name", 1, Str)];

const OBJECT_FIELD_SELECTOR: &[Field] = &[one("apiVersion", 1, Str), one("fieldPath", 2, Str)];

const RESOURCE_FIELD_SELECTOR: &[Field] =
    &[one("containerName", 1, Str), one("resource", 2, Str), one("divisor", 3, Quantity)];

// ConfigMapKeySelector and SecretKeySelector share a layout.
const KEY_SELECTOR: &[Field] = &[inline(1, LOCAL_OBJECT_REFERENCE), one("key", 2, Str), one("optional", 3, Bool)];

const ENV_VAR_SOURCE: &[Field] = &[
    one("fieldRef", 1, Msg(OBJECT_FIELD_SELECTOR)),
    one("resourceFieldRef", 2, Msg(RESOURCE_FIELD_SELECTOR)),
    one("configMapKeyRef", 3, Msg(KEY_SELECTOR)),
    one("secretKeyRef", 4, Msg(KEY_SELECTOR)),
];

const ENV_VAR: &[Field] = &[one("name", 1, Str), one("value", 2, Str), one("valueFrom", 3, Msg(ENV_VAR_SOURCE))];

const ENV_SOURCE_REF: &[Field] = &[inline(1, LOCAL_OBJECT_REFERENCE), one("optional", 2, Bool)];

const ENV_FROM_SOURCE: &[Field] = &[
    one("prefix", 1, Str),
    one("configMapRef", 2, Msg(ENV_SOURCE_REF)),
    one("secretRef", 3, Msg(ENV_SOURCE_REF)),
];

const CONTAINER_PORT: &[Field] = &[
    one("name", 1, Str),
    one("hostPort", 2, I32),
    one("containerPort", 3, I32),
    one("protocol", 4, Str),
    one("hostIP", 5, Str),
];

const RESOURCE_REQUIREMENTS: &[Field] = &[one("limits", 1, QuantityMap), one("requests", 2, QuantityMap)];

const VOLUME_MOUNT: &[Field] = &[
    one("name", 1, Str),
    one("readOnly", 2, Bool),
    one("mountPath", 3, Str),
    one("subPath", 4, Str),
    one("mountPropagation", 5, Str),
    one("subPathExpr", 6, Str),
];

const EXEC_ACTION: &[Field] = &[many("command", 1, Str)];

const HTTP_HEADER: &[Field] = &[one("name", 1, Str), one("value", 2, Str)];

const HTTP_GET_ACTION: &[Field] = &[
    one("path", 1, Str),
    one("port", 2, IntOrString),
    one("host", 3, Str),
    one("scheme", 4, Str),
    many("httpHeaders", 5, Msg(HTTP_HEADER)),
];

const TCP_SOCKET_ACTION: &[Field] = &[one("port", 1, IntOrString), one("host", 2, Str)];

const GRPC_ACTION: &[Field] = &[one("port", 1, I32), one("service", 2, Str)];

const CHECK_HANDLER: &[Field] = &[
    one("exec", 1, Msg(EXEC_ACTION)),
    one("httpGet", 2, Msg(HTTP_GET_ACTION)),
    one("tcpSocket", 3, Msg(TCP_SOCKET_ACTION)),
    one("grpc", 4, Msg(GRPC_ACTION)),
];

const HEALTH_CHECK: &[Field] = &[
    inline(1, CHECK_HANDLER),
    one("initialDelaySeconds", 2, I32),
    one("timeoutSeconds", 3, I32),
    one("periodSeconds", 4, I32),
    one("successThreshold", 5, I32),
    one("failureThreshold", 6, I32),
    one("terminationGracePeriodSeconds", 7, I64),
];

const LIFECYCLE_HANDLER: &[Field] = &[
    one("exec", 1, Msg(EXEC_ACTION)),
    one("httpGet", 2, Msg(HTTP_GET_ACTION)),
    one("tcpSocket", 3, Msg(TCP_SOCKET_ACTION)),
];

const LIFECYCLE: &[Field] = &[one("postStart", 1, Msg(LIFECYCLE_HANDLER)), one("preStop", 2, Msg(LIFECYCLE_HANDLER))];

const CAPABILITIES: &[Field] = &[many("add", 1, Str), many("drop", 2, Str)];

const SE_LINUX_OPTIONS: &[Field] = &[one("user", 1, Str), one("role", 2, Str), one("type", 3, Str), one("level", 4, Str)];

const SECCOMP_PROFILE: &[Field] = &[one("type", 1, Str), one("localhostProfile", 2, Str)];

const SECURITY_CONTEXT: &[Field] = &[
    one("capabilities", 1, Msg(CAPABILITIES)),
    one("privileged", 2, Bool),
    one("seLinuxOptions", 3, Msg(SE_LINUX_OPTIONS)),
    one("runAsUser", 4, I64),
    one("runAsNonRoot", 5, Bool),
    one("readOnlyRootFilesystem", 6, Bool),
    one("allowPrivilegeEscalation", 7, Bool),
    one("runAsGroup", 8, I64),
    one("procMount", 9, Str),
    one("seccompProfile", 11, Msg(SECCOMP_PROFILE)),
];

const CONTAINER: &[Field] = &[
    one("name", 1, Str),
    one("image", 2, Str),
    many("command", 3, Str),
    many("args", 4, Str),
    one("workingDir", 5, Str),
    many("ports", 6, Msg(CONTAINER_PORT)),
    many("env", 7, Msg(ENV_VAR)),
    one("resources", 8, Msg(RESOURCE_REQUIREMENTS)),
    many("volumeMounts", 9, Msg(VOLUME_MOUNT)),
    one("livenessProbe", 10, Msg(HEALTH_CHECK)),
    one("readinessProbe", 11, Msg(HEALTH_CHECK)),
    one("lifecycle", 12, Msg(LIFECYCLE)),
    one("terminationMessagePath", 13, Str),
    one("imagePullPolicy", 14, Str),
    one("securityContext", 15, Msg(SECURITY_CONTEXT)),
    one("stdin", 16, Bool),
    one("stdinOnce", 17, Bool),
    one("tty", 18, Bool),
    many("envFrom", 19, Msg(ENV_FROM_SOURCE)),
    one("terminationMessagePolicy", 20, Str),
    one("startupProbe", 22, Msg(HEALTH_CHECK)),
    one("restartPolicy", 24, Str),
];

const SYSCTL: &[Field] = &[one("name", 1, Str), one("value", 2, Str)];

const POD_SECURITY_CONTEXT: &[Field] = &[
    one("seLinuxOptions", 1, Msg(SE_LINUX_OPTIONS)),
    one("runAsUser", 2, I64),
    one("runAsNonRoot", 3, Bool),
    many("supplementalGroups", 4, I64),
    one("fsGroup", 5, I64),
    one("runAsGroup", 6, I64),
    many("sysctls", 7, Msg(SYSCTL)),
    one("fsGroupChangePolicy", 9, Str),
    one("seccompProfile", 10, Msg(SECCOMP_PROFILE)),
];

const TOLERATION: &[Field] = &[
    one("key", 1, Str),
    one("operator", 2, Str),
    one("value", 3, Str),
    one("effect", 4, Str),
    one("tolerationSeconds", 5, I64),
];

const NODE_SELECTOR_REQUIREMENT: &[Field] = &[one("key", 1, Str), one("operator", 2, Str), many("values", 3, Str)];

const NODE_SELECTOR_TERM: &[Field] = &[
    many("matchExpressions", 1, Msg(NODE_SELECTOR_REQUIREMENT)),
    many("matchFields", 2, Msg(NODE_SELECTOR_REQUIREMENT)),
];

const NODE_SELECTOR: &[Field] = &[many("nodeSelectorTerms", 1, Msg(NODE_SELECTOR_TERM))];

const PREFERRED_SCHEDULING_TERM: &[Field] = &[one("weight", 1, I32), one("preference", 2, Msg(NODE_SELECTOR_TERM))];

const NODE_AFFINITY: &[Field] = &[
    one("requiredDuringSchedulingIgnoredDuringExecution", 1, Msg(NODE_SELECTOR)),
    many("preferredDuringSchedulingIgnoredDuringExecution", 2, Msg(PREFERRED_SCHEDULING_TERM)),
];

const POD_AFFINITY_TERM: &[Field] = &[
    one("labelSelector", 1, Msg(LABEL_SELECTOR)),
    many("namespaces", 2, Str),
    one("topologyKey", 3, Str),
    one("namespaceSelector", 4, Msg(LABEL_SELECTOR)),
];

const WEIGHTED_POD_AFFINITY_TERM: &[Field] = &[one("weight", 1, I32), one("podAffinityTerm", 2, Msg(POD_AFFINITY_TERM))];

// PodAntiAffinity has the same layout.
const POD_AFFINITY: &[Field] = &[
    many("requiredDuringSchedulingIgnoredDuringExecution", 1, Msg(POD_AFFINITY_TERM)),
    many("preferredDuringSchedulingIgnoredDuringExecution", 2, Msg(WEIGHTED_POD_AFFINITY_TERM)),
];

const AFFINITY: &[Field] = &[
    one("nodeAffinity", 1, Msg(NODE_AFFINITY)),
    one("podAffinity", 2, Msg(POD_AFFINITY)),
    one("podAntiAffinity", 3, Msg(POD_AFFINITY)),
];

const HOST_PATH: &[Field] = &[one("path", 1, Str), one("type", 2, Str)];

const EMPTY_DIR: &[Field] = &[one("medium", 1, Str), one("sizeLimit", 2, Quantity)];

const KEY_TO_PATH: &[Field] = &[one("key", 1, Str), one("path", 2, Str), one("mode", 3, I32)];

const SECRET_VOLUME: &[Field] = &[
    one("secretName", 1, Str),
    many("items", 2, Msg(KEY_TO_PATH)),
    one("defaultMode", 3, I32),
    one("optional", 4, Bool),
];

const NFS_VOLUME: &[Field] = &[one("server", 1, Str), one("path", 2, Str), one("readOnly", 3, Bool)];

const PVC_VOLUME: &[Field] = &[one("claimName", 1, Str), one("readOnly", 2, Bool)];

const DOWNWARD_API_FILE: &[Field] = &[
    one("path", 1, Str),
    one("fieldRef", 2, Msg(OBJECT_FIELD_SELECTOR)),
    one("resourceFieldRef", 3, Msg(RESOURCE_FIELD_SELECTOR)),
    one("mode", 4, I32),
];

const DOWNWARD_API_VOLUME: &[Field] = &[many("items", 1, Msg(DOWNWARD_API_FILE)), one("defaultMode", 2, I32)];

const CONFIG_MAP_VOLUME: &[Field] = &[
    inline(1, LOCAL_OBJECT_REFERENCE),
    many("items", 2, Msg(KEY_TO_PATH)),
    one("defaultMode", 3, I32),
    one("optional", 4, Bool),
];

// SecretProjection and ConfigMapProjection share a layout.
const KEY_PROJECTION: &[Field] =
    &[inline(1, LOCAL_OBJECT_REFERENCE), many("items", 2, Msg(KEY_TO_PATH)), one("optional", 4, Bool)];

const DOWNWARD_API_PROJECTION: &[Field] = &[many("items", 1, Msg(DOWNWARD_API_FILE))];

const SERVICE_ACCOUNT_TOKEN_PROJECTION: &[Field] =
    &[one("audience", 1, Str), one("expirationSeconds", 2, I64), one("path", 3, Str)];

const VOLUME_PROJECTION: &[Field] = &[
    one("secret", 1, Msg(KEY_PROJECTION)),
    one("downwardAPI", 2, Msg(DOWNWARD_API_PROJECTION)),
    one("configMap", 3, Msg(KEY_PROJECTION)),
    one("serviceAccountToken", 4, Msg(SERVICE_ACCOUNT_TOKEN_PROJECTION)),
];

const PROJECTED_VOLUME: &[Field] = &[many("sources", 1, Msg(VOLUME_PROJECTION)), one("defaultMode", 2, I32)];

const CSI_VOLUME: &[Field] = &[
    one("driver", 1, Str),
    one("readOnly", 2, Bool),
    one("fsType", 3, Str),
    one("volumeAttributes", 4, StrMap),
    one("nodePublishSecretRef", 5, Msg(LOCAL_OBJECT_REFERENCE)),
];

const VOLUME_SOURCE: &[Field] = &[
    one("hostPath", 1, Msg(HOST_PATH)),
    one("emptyDir", 2, Msg(EMPTY_DIR)),
    one("secret", 6, Msg(SECRET_VOLUME)),
    one("nfs", 7, Msg(NFS_VOLUME)),
    one("persistentVolumeClaim", 10, Msg(PVC_VOLUME)),
    one("downwardAPI", 16, Msg(DOWNWARD_API_VOLUME)),
    one("configMap", 19, Msg(CONFIG_MAP_VOLUME)),
    one("projected", 24, Msg(PROJECTED_VOLUME)),
    one("csi", 28, Msg(CSI_VOLUME)),
];

const VOLUME: &[Field] = &[one("name", 1, Str), inline(2, VOLUME_SOURCE)];

const POD_SPEC: &[Field] = &[
    many("volumes", 1, Msg(VOLUME)),
    many("containers", 2, Msg(CONTAINER)),
    one("restartPolicy", 3, Str),
    one("terminationGracePeriodSeconds", 4, I64),
    one("activeDeadlineSeconds", 5, I64),
    one("dnsPolicy", 6, Str),
    one("nodeSelector", 7, StrMap),
    one("serviceAccountName", 8, Str),
    one("serviceAccount", 9, Str),
    one("nodeName", 10, Str),
    one("hostNetwork", 11, Bool),
    one("hostPID", 12, Bool),
    one("hostIPC", 13, Bool),
    one("securityContext", 14, Msg(POD_SECURITY_CONTEXT)),
    many("imagePullSecrets", 15, Msg(LOCAL_OBJECT_REFERENCE)),
    one("hostname", 16, Str),
    one("subdomain", 17, Str),
    one("affinity", 18, Msg(AFFINITY)),
    one("schedulerName", 19, Str),
    many("initContainers", 20, Msg(CONTAINER)),
    one("automountServiceAccountToken", 21, Bool),
    many("tolerations", 22, Msg(TOLERATION)),
    one("priorityClassName", 24, Str),
    one("priority", 25, I32),
    one("shareProcessNamespace", 27, Bool),
    one("runtimeClassName", 29, Str),
    one("enableServiceLinks", 30, Bool),
    one("preemptionPolicy", 31, Str),
    one("setHostnameAsFQDN", 35, Bool),
];

const POD_CONDITION: &[Field] = &[
    one("type", 1, Str),
    one("status", 2, Str),
    one("lastProbeTime", 3, Time),
    one("lastTransitionTime", 4, Time),
    one("reason", 5, Str),
    one("message", 6, Str),
];

const CONTAINER_STATE_WAITING: &[Field] = &[one("reason", 1, Str), one("message", 2, Str)];

const CONTAINER_STATE_RUNNING: &[Field] = &[one("startedAt", 1, Time)];

const CONTAINER_STATE_TERMINATED: &[Field] = &[
    one("exitCode", 1, I32),
    one("signal", 2, I32),
    one("reason", 3, Str),
    one("message", 4, Str),
    one("startedAt", 5, Time),
    one("finishedAt", 6, Time),
    one("containerID", 7, Str),
];

const CONTAINER_STATE: &[Field] = &[
    one("waiting", 1, Msg(CONTAINER_STATE_WAITING)),
    one("running", 2, Msg(CONTAINER_STATE_RUNNING)),
    one("terminated", 3, Msg(CONTAINER_STATE_TERMINATED)),
];

const CONTAINER_STATUS: &[Field] = &[
    one("name", 1, Str),
    one("state", 2, Msg(CONTAINER_STATE)),
    one("lastState", 3, Msg(CONTAINER_STATE)),
    one("ready", 4, Bool),
    one("restartCount", 5, I32),
    one("image", 6, Str),
    one("imageID", 7, Str),
    one("containerID", 8, Str),
    one("started", 9, Bool),
];

const POD_IP: &[Field] = &[one("ip", 1, Str)];

const POD_STATUS: &[Field] = &[
    one("phase", 1, Str),
    many("conditions", 2, Msg(POD_CONDITION)),
    one("message", 3, Str),
    one("reason", 4, Str),
    one("hostIP", 5, Str),
    one("podIP", 6, Str),
    one("startTime", 7, Time),
    many("containerStatuses", 8, Msg(CONTAINER_STATUS)),
    one("qosClass", 9, Str),
    many("initContainerStatuses", 10, Msg(CONTAINER_STATUS)),
    one("nominatedNodeName", 11, Str),
    many("podIPs", 12, Msg(POD_IP)),
];

pub(crate) const POD: &[Field] = &[
    one("metadata", 1, Msg(OBJECT_META)),
    one("spec", 2, Msg(POD_SPEC)),
    one("status", 3, Msg(POD_STATUS)),
];

pub(crate) const POD_TEMPLATE_SPEC: &[Field] = &[one("metadata", 1, Msg(OBJECT_META)), one("spec", 2, Msg(POD_SPEC))];
