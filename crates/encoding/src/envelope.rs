//! `k8s\0` + `runtime.Unknown` framing.

use prost::Message;

use crate::EncodingError;

pub const STORAGE_MAGIC: &[u8; 4] = b"k8s\x00";

#[derive(Clone, PartialEq, Message)]
struct TypeMetaPb {
    #[prost(string, tag = "1")]
    api_version: String,
    #[prost(string, tag = "2")]
    kind: String,
}

#[derive(Clone, PartialEq, Message)]
struct UnknownPb {
    #[prost(message, optional, tag = "1")]
    type_meta: Option<TypeMetaPb>,
    #[prost(bytes = "vec", tag = "2")]
    raw: Vec<u8>,
    #[prost(string, tag = "3")]
    content_encoding: String,
    #[prost(string, tag = "4")]
    content_type: String,
}

/// Decoded storage envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub api_version: String,
    pub kind: String,
    pub raw: Vec<u8>,
    /// Empty for typed protobuf bodies.
    pub content_type: String,
}

impl Envelope {
    pub fn encode(&self) -> Vec<u8> {
        let msg = UnknownPb {
            type_meta: Some(TypeMetaPb { api_version: self.api_version.clone(), kind: self.kind.clone() }),
            raw: self.raw.clone(),
            content_encoding: String::new(),
            content_type: self.content_type.clone(),
        };
        let body = msg.encode_to_vec();
        let mut out = Vec::with_capacity(STORAGE_MAGIC.len() + body.len());
        out.extend_from_slice(STORAGE_MAGIC);
        out.extend_from_slice(&body);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let body = data.strip_prefix(STORAGE_MAGIC.as_slice()).ok_or(EncodingError::MissingMagic)?;
        let msg = UnknownPb::decode(body)?;
        let type_meta = msg.type_meta.unwrap_or_default();
        Ok(Self {
            api_version: type_meta.api_version,
            kind: type_meta.kind,
            raw: msg.raw,
            content_type: msg.content_type,
        })
    }
}
