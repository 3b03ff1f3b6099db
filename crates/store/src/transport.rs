//! The key-value transport seam.
//!
//! Implementations speak to a concrete store (etcd, or the in-memory
//! [`crate::MemoryTransport`]). They perform exactly the request they are
//! given: no retries, no pagination, no key derivation.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::Record;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("required revision {requested} is a future revision (current {current})")]
    FutureRevision { requested: i64, current: i64 },
    #[error("watcher fell behind by {0} events")]
    Lagged(u64),
    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Range read. `range_end == None` reads the single key `key`.
#[derive(Debug, Clone, Default)]
pub struct RangeRequest {
    pub key: Bytes,
    pub range_end: Option<Bytes>,
    /// 0 = no limit.
    pub limit: i64,
    /// 0 = latest.
    pub revision: i64,
    pub keys_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RangeResponse {
    /// In key order.
    pub records: Vec<Record>,
    /// More records exist beyond `limit`.
    pub more: bool,
    /// Store revision at the time of the read.
    pub revision: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PutResponse {
    pub revision: i64,
    pub prev_value: Option<Bytes>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteResponse {
    pub revision: i64,
    /// Deleted keys with the value they held.
    pub deleted: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub revision: i64,
    /// For deletes `value` is empty and `prev_value` holds the removed value.
    pub record: Record,
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent, TransportError>>;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn range(&self, req: RangeRequest) -> Result<RangeResponse, TransportError>;

    async fn put(&self, key: Bytes, value: Bytes) -> Result<PutResponse, TransportError>;

    /// Delete `key`, or `[key, range_end)` when a range end is given.
    async fn delete(&self, key: Bytes, range_end: Option<Bytes>) -> Result<DeleteResponse, TransportError>;

    /// Stream changes to `key` (or the range) from `start_revision`; 0 = from now.
    async fn watch(&self, key: Bytes, range_end: Option<Bytes>, start_revision: i64) -> Result<WatchStream, TransportError>;
}
