//! kectl encoding: converts stored values between media types.
//!
//! The API server's binary storage format is a `k8s\0` magic followed by a
//! protobuf `runtime.Unknown` carrying type metadata and the object body as
//! a typed protobuf message. [`StorageCodec`] writes and reads those bodies
//! for the built-in kinds it has field tables for; anything else is
//! reported as [`EncodingError::UnsupportedKind`] rather than written in a
//! form the API server could not read back.

#![forbid(unsafe_code)]

use kectl_core::MediaType;
use serde_json::Value as Json;
use tracing::trace;

mod envelope;
mod typed;

pub use envelope::{Envelope, STORAGE_MAGIC};

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("value does not start with the storage magic prefix")]
    MissingMagic,
    #[error("storage body has content type {content_type:?}, expected protobuf")]
    ContentType { content_type: String },
    #[error("no protobuf schema for {api_version} {kind}")]
    UnsupportedKind { api_version: String, kind: String },
    #[error("{path} has no protobuf field")]
    UnsupportedField { path: String },
    #[error("{path}: {reason}")]
    InvalidValue { path: String, reason: String },
    #[error("{path}: truncated protobuf field")]
    Truncated { path: String },
}

impl EncodingError {
    /// Well-formed input this codec has no schema for.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::ContentType { .. } | Self::UnsupportedKind { .. } | Self::UnsupportedField { .. })
    }
}

/// Converts a value from one media type to another.
pub trait Codec: Send + Sync {
    fn convert(&self, from: MediaType, to: MediaType, data: &[u8]) -> Result<Vec<u8>, EncodingError>;
}

/// Content type of a typed body; the API server leaves the field empty.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/vnd.kubernetes.protobuf";

/// Default codec for JSON, YAML and typed storage envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageCodec;

impl StorageCodec {
    fn decode(&self, from: MediaType, data: &[u8]) -> Result<Json, EncodingError> {
        match from {
            MediaType::Json => Ok(serde_json::from_slice(data)?),
            MediaType::Yaml => Ok(serde_yaml::from_slice(data)?),
            MediaType::StorageBinary => {
                let env = Envelope::decode(data)?;
                if !env.content_type.is_empty() && env.content_type != PROTOBUF_CONTENT_TYPE {
                    return Err(EncodingError::ContentType { content_type: env.content_type });
                }
                typed::decode_body(&env.api_version, &env.kind, &env.raw)
            }
        }
    }

    fn encode(&self, to: MediaType, value: &Json) -> Result<Vec<u8>, EncodingError> {
        match to {
            MediaType::Json => Ok(serde_json::to_vec(value)?),
            MediaType::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
            MediaType::StorageBinary => {
                let field = |k: &str| value.get(k).and_then(|v| v.as_str()).unwrap_or("").to_string();
                let (api_version, kind) = (field("apiVersion"), field("kind"));
                let raw = typed::encode_body(&api_version, &kind, value)?;
                Ok(Envelope { api_version, kind, raw, content_type: String::new() }.encode())
            }
        }
    }
}

impl Codec for StorageCodec {
    fn convert(&self, from: MediaType, to: MediaType, data: &[u8]) -> Result<Vec<u8>, EncodingError> {
        if from == to {
            return Ok(data.to_vec());
        }
        trace!(%from, %to, len = data.len(), "convert");
        let value = self.decode(from, data)?;
        self.encode(to, &value)
    }
}

/// Best-effort media type of a stored value.
pub fn detect(data: &[u8]) -> MediaType {
    if data.starts_with(STORAGE_MAGIC) {
        MediaType::StorageBinary
    } else {
        MediaType::Json
    }
}
