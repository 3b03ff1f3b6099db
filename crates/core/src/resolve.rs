//! Address resolution: identity → storage key prefix and media type.
//!
//! Both functions mirror the API server's storage factory defaults.

use crate::{registry, MediaType, ResourceIdentity};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("empty resource identity")]
    EmptyResource,
}

/// Storage key prefix (relative to the registry root) for `id`.
///
/// Built-in groups store objects directly under the resource name
/// (`pods`, `deployments`); custom and aggregated groups keep a group
/// segment (`example.com/widgets`).
pub fn prefix_for(id: &ResourceIdentity) -> Result<String, ResolveError> {
    if id.is_empty() {
        return Err(ResolveError::EmptyResource);
    }
    if let Some(prefix) = registry::prefix_override(id) {
        return Ok(prefix.to_string());
    }

    let group_prefix = if registry::is_exception_group(&id.group) {
        true
    } else {
        id.group.contains('.') && !id.group.ends_with(".k8s.io")
    };

    if group_prefix {
        Ok(format!("{}/{}", id.group, id.resource))
    } else {
        // built-in groups have no group segment
        Ok(id.resource.clone())
    }
}

/// Media type the API server uses when storing objects of `id`.
pub fn media_type_for(id: &ResourceIdentity) -> Result<MediaType, ResolveError> {
    if id.is_empty() {
        return Err(ResolveError::EmptyResource);
    }
    if registry::is_exception_group(&id.group) {
        return Ok(MediaType::Json);
    }
    if !id.group.contains('.') || id.group.ends_with(".k8s.io") {
        return Ok(MediaType::StorageBinary);
    }
    Ok(MediaType::Json)
}
