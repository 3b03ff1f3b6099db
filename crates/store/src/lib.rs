//! kectl store: logical get/watch/delete/put over an etcd-style key-value
//! transport, addressed by Kubernetes resource identity.

#![forbid(unsafe_code)]

use bytes::Bytes;
use kectl_core::ResolveError;

mod client;
pub mod key;
pub mod memory;
mod op;
pub mod transport;

#[cfg(feature = "etcd")]
pub mod etcd;

pub use client::Client;
pub use key::{assemble_key, AssembledKey};
pub use memory::MemoryTransport;
pub use op::{Op, Response};
pub use transport::{Transport, TransportError};

/// One key-value observation.
///
/// `prev_value` is only populated for watch events and put responses that
/// replaced an existing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
    pub prev_value: Option<Bytes>,
}

impl Record {
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("namespace {namespace:?} given without a resource")]
    NamespaceWithoutResource { namespace: String },
    #[error("put needs a single key, got range {key:?}")]
    NotSingle { key: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("response for {key}: {source}")]
    Response {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("watch stream closed by transport")]
    WatchClosed,
}

pub mod prelude {
    pub use super::{assemble_key, Client, Op, Record, StoreError, Transport};
    pub use kectl_core::ResourceIdentity;
}
