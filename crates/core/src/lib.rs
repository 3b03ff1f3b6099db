//! kectl core types: resource identities, the storage registry and the
//! address resolver that turns an identity into an etcd key prefix and a
//! storage media type.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

pub mod registry;
pub mod resolve;
pub mod wellknown;

pub use resolve::{media_type_for, prefix_for, ResolveError};

/// Group/resource pair identifying a resource type for storage addressing.
///
/// Unlike a full API kind there is no version: every served version of a
/// resource lives under the same storage prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity {
    pub group: String,
    pub resource: String,
}

impl ResourceIdentity {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self { group: group.into(), resource: resource.into() }
    }

    /// An identity without a resource is not addressable.
    pub fn is_empty(&self) -> bool {
        self.resource.is_empty()
    }

    /// Parse `resource[.group]`, e.g. `pods` or `deployments.apps`.
    ///
    /// Never fails; callers check [`ResourceIdentity::is_empty`] on the result.
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((resource, group)) => Self::new(group, resource),
            None => Self::new("", s),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// Encoding of a stored object value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Json,
    Yaml,
    /// The API server's protobuf storage envelope (`k8s\0` + `runtime.Unknown`).
    StorageBinary,
}

impl MediaType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MediaType::Json => "application/json",
            MediaType::Yaml => "application/yaml",
            MediaType::StorageBinary => "application/vnd.kubernetes.protobuf",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type {0:?}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application/json" => Ok(MediaType::Json),
            "application/yaml" => Ok(MediaType::Yaml),
            "application/vnd.kubernetes.protobuf" => Ok(MediaType::StorageBinary),
            other => Err(UnknownMediaType(other.to_string())),
        }
    }
}

pub mod prelude {
    pub use super::{media_type_for, prefix_for, MediaType, ResolveError, ResourceIdentity};
}
