//! kectl put: write manifests straight into etcd under the keys the API
//! server would use.
//!
//! Objects come from [`read_documents`], are filtered against a
//! [`PutTarget`], stamped with the fields the API server would set on create,
//! converted to the resource's storage encoding and written one by one.

#![forbid(unsafe_code)]

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kectl_core::{media_type_for, wellknown, MediaType, ResourceIdentity};
use kectl_encoding::Codec;
use kectl_store::{Client, Op, Record};
use kube::core::DynamicObject;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

mod decode;

pub use decode::{open_input, read_documents, Documents};

/// Filters applied to every decoded object. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutTarget {
    pub resource: Option<ResourceIdentity>,
    pub name: String,
    pub namespace: String,
}

impl PutTarget {
    /// Build filters from the command line.
    ///
    /// A well-known resource is corrected to its canonical identity; for it
    /// a cluster scope (or `all_namespaces`) clears the namespace filter and
    /// an empty namespace means `default`.
    pub fn resolve(
        resource_arg: Option<&str>,
        name_arg: Option<&str>,
        namespace: &str,
        all_namespaces: bool,
    ) -> Result<Self> {
        let mut target = PutTarget {
            namespace: if all_namespaces { String::new() } else { namespace.to_string() },
            ..Default::default()
        };
        let Some(arg) = resource_arg else {
            if name_arg.is_some() {
                bail!("a name filter needs a resource");
            }
            return Ok(target);
        };

        let mut id = ResourceIdentity::parse(arg);
        if id.is_empty() {
            bail!("invalid resource {arg:?}");
        }
        if let Some((canonical, namespaced)) = wellknown::correct(&id) {
            id = canonical;
            if !namespaced || all_namespaces {
                target.namespace.clear();
            } else if target.namespace.is_empty() {
                target.namespace = "default".to_string();
            }
        }
        target.resource = Some(id);
        target.name = name_arg.unwrap_or_default().to_string();
        Ok(target)
    }

    fn conflict(&self, id: &ResourceIdentity, name: &str, namespace: &str) -> Option<&'static str> {
        if !namespace.is_empty() && !self.namespace.is_empty() && namespace != self.namespace {
            return Some("namespace");
        }
        if self.resource.as_ref().is_some_and(|want| want != id) {
            return Some("resource");
        }
        if !self.name.is_empty() && name != self.name {
            return Some("name");
        }
        None
    }
}

/// How to write the objects.
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Storage prefix, usually `/registry`.
    pub prefix: String,
    pub target: PutTarget,
    /// Hand only keys to the sink.
    pub keys_only: bool,
    /// Write namespaced built-ins that carry no namespace into the filter
    /// namespace instead of the namespace-less key.
    pub default_namespace: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Storage identity for an object, derived from its apiVersion and kind.
pub fn identity_of(obj: &DynamicObject) -> Result<ResourceIdentity> {
    let types = obj.types.as_ref().filter(|t| !t.kind.is_empty()).ok_or_else(|| anyhow!("object has no kind"))?;
    let group = types.api_version.split_once('/').map(|(g, _)| g).unwrap_or("");
    Ok(wellknown::identity_for_kind(group, &types.kind))
}

/// Fill the fields the API server sets on create and drop the ones it owns.
fn prepare(obj: &mut DynamicObject, created: DateTime<Utc>) {
    let meta = &mut obj.metadata;
    if meta.creation_timestamp.is_none() {
        meta.creation_timestamp = Some(Time(created));
    }
    if meta.uid.as_deref().map_or(true, str::is_empty) {
        meta.uid = Some(Uuid::new_v4().to_string());
    }
    meta.resource_version = None;
    meta.self_link = None;
}

fn effective_namespace(obj: &DynamicObject, id: &ResourceIdentity, request: &PutRequest) -> String {
    match obj.metadata.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => ns.to_string(),
        _ if request.default_namespace && wellknown::lookup(id).is_some_and(|w| w.namespaced) => {
            request.target.namespace.clone()
        }
        _ => String::new(),
    }
}

/// Write every accepted object, forwarding each stored record to `sink`.
///
/// The first decode, encode or store error aborts the run.
pub async fn put_objects<I, F>(
    client: &Client,
    codec: &dyn Codec,
    objects: I,
    request: &PutRequest,
    mut sink: F,
    cancel: &CancellationToken,
) -> Result<PutSummary>
where
    I: IntoIterator<Item = Result<DynamicObject>>,
    F: FnMut(&Record) -> Result<()> + Send,
{
    let created = Utc::now();
    let mut summary = PutSummary::default();

    for obj in objects {
        let mut obj = obj?;
        let Some(name) = obj.metadata.name.clone().filter(|n| !n.is_empty()) else {
            debug!("skipping object without a name");
            summary.skipped += 1;
            continue;
        };
        let id = identity_of(&obj).with_context(|| format!("object {name}"))?;
        let namespace = effective_namespace(&obj, &id, request);
        if let Some(field) = request.target.conflict(&id, &name, &namespace) {
            debug!(%id, %name, %namespace, field, "skipping filtered object");
            counter!("kectl_put_skipped_total", 1u64);
            summary.skipped += 1;
            continue;
        }

        if !namespace.is_empty() {
            obj.metadata.namespace = Some(namespace.clone());
        }
        prepare(&mut obj, created);
        let json = serde_json::to_vec(&obj).with_context(|| format!("encoding {id} {namespace}/{name}"))?;
        let media = media_type_for(&id)?;
        let value = codec
            .convert(MediaType::Json, media, &json)
            .with_context(|| format!("converting {id} {namespace}/{name} to {media}"))?;

        let mut op = Op::new().resource(id.clone()).name(&name, &namespace).response(|r: &Record| {
            summary.written += 1;
            sink(r)
        });
        if request.keys_only {
            op = op.keys_only();
        }
        client
            .put(cancel, &request.prefix, value, op)
            .await
            .with_context(|| format!("putting {id} {namespace}/{name}"))?;
        counter!("kectl_put_written_total", 1u64);
    }

    info!(written = summary.written, skipped = summary.skipped, "put done");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_namespace_for_namespaced_builtins() {
        let t = PutTarget::resolve(Some("po"), None, "", false).unwrap();
        assert_eq!(t.resource, Some(ResourceIdentity::new("", "pods")));
        assert_eq!(t.namespace, "default");

        let t = PutTarget::resolve(Some("deploy"), Some("web"), "prod", false).unwrap();
        assert_eq!(t.resource, Some(ResourceIdentity::new("apps", "deployments")));
        assert_eq!(t.namespace, "prod");
        assert_eq!(t.name, "web");
    }

    #[test]
    fn resolve_clears_namespace_for_cluster_scope_and_all_namespaces() {
        let t = PutTarget::resolve(Some("nodes"), None, "prod", false).unwrap();
        assert_eq!(t.namespace, "");
        let t = PutTarget::resolve(Some("pods"), None, "prod", true).unwrap();
        assert_eq!(t.namespace, "");
    }

    #[test]
    fn resolve_keeps_custom_resources_verbatim() {
        let t = PutTarget::resolve(Some("crontabs.stable.example.com"), None, "", false).unwrap();
        assert_eq!(t.resource, Some(ResourceIdentity::new("stable.example.com", "crontabs")));
        assert_eq!(t.namespace, "");
    }

    #[test]
    fn resolve_rejects_empty_resource() {
        assert!(PutTarget::resolve(Some(""), None, "", false).is_err());
        assert!(PutTarget::resolve(Some(".apps"), None, "", false).is_err());
        assert!(PutTarget::resolve(None, Some("x"), "", false).is_err());
    }

    #[test]
    fn conflicts() {
        let t = PutTarget::resolve(Some("pods"), Some("a"), "ns", false).unwrap();
        let pods = ResourceIdentity::new("", "pods");
        assert_eq!(t.conflict(&pods, "a", "ns"), None);
        assert_eq!(t.conflict(&pods, "a", ""), None);
        assert_eq!(t.conflict(&pods, "a", "other"), Some("namespace"));
        assert_eq!(t.conflict(&ResourceIdentity::new("", "secrets"), "a", "ns"), Some("resource"));
        assert_eq!(t.conflict(&pods, "b", "ns"), Some("name"));
    }

    #[test]
    fn identity_from_kind() {
        let obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "d"}
        }))
        .unwrap();
        assert_eq!(identity_of(&obj).unwrap(), ResourceIdentity::new("apps", "deployments"));

        let obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "stable.example.com/v1", "kind": "CronTab", "metadata": {"name": "c"}
        }))
        .unwrap();
        assert_eq!(identity_of(&obj).unwrap(), ResourceIdentity::new("stable.example.com", "crontabs"));

        let obj: DynamicObject = serde_json::from_value(serde_json::json!({"metadata": {"name": "x"}})).unwrap();
        assert!(identity_of(&obj).is_err());
    }

    #[test]
    fn prepare_stamps_and_clears_server_fields() {
        let mut obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {"name": "p", "resourceVersion": "42", "selfLink": "/api/v1/pods/p"}
        }))
        .unwrap();
        let now = Utc::now();
        prepare(&mut obj, now);
        assert_eq!(obj.metadata.creation_timestamp, Some(Time(now)));
        assert!(Uuid::parse_str(obj.metadata.uid.as_deref().unwrap()).is_ok());
        assert!(obj.metadata.resource_version.is_none());
        assert!(obj.metadata.self_link.is_none());

        let mut kept: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {"name": "p", "uid": "fixed", "creationTimestamp": "2020-01-01T00:00:00Z"}
        }))
        .unwrap();
        prepare(&mut kept, now);
        assert_eq!(kept.metadata.uid.as_deref(), Some("fixed"));
        assert_ne!(kept.metadata.creation_timestamp, Some(Time(now)));
    }
}
