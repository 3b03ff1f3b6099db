use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::key::{self, assemble_key, AssembledKey};
use crate::transport::{RangeRequest, Transport, TransportError};
use crate::{Op, Record, StoreError};

/// Logical store client: resolves keys from an [`Op`] and drives the
/// transport, feeding every resulting record to the op's response callback.
///
/// Every method races its transport calls against `cancel`; records already
/// handed to the callback stay delivered.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        res = fut => res.map_err(StoreError::from),
    }
}

fn range_of(target: AssembledKey) -> (Bytes, Option<Bytes>) {
    if target.single {
        (Bytes::from(target.key), None)
    } else {
        let (start, end) = key::prefix_range(&target.key);
        (start, Some(end))
    }
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_transport<T: Transport + 'static>(transport: T) -> Self {
        Self::new(Arc::new(transport))
    }

    /// Read one object or every object under the resolved prefix.
    ///
    /// Returns the store revision observed by the first request, suitable as
    /// the starting point of a follow-up watch.
    pub async fn get(&self, cancel: &CancellationToken, prefix: &str, mut op: Op<'_>) -> Result<i64, StoreError> {
        let target = assemble_key(prefix, &op)?;
        counter!("kectl_store_ops_total", 1u64, "op" => "get");
        debug!(key = %target.key, single = target.single, revision = op.get_revision(), "get");

        if target.single {
            let req = RangeRequest {
                key: Bytes::from(target.key),
                revision: op.get_revision(),
                keys_only: op.is_keys_only(),
                ..Default::default()
            };
            let resp = cancellable(cancel, self.transport.range(req)).await?;
            for record in &resp.records {
                op.respond(record)?;
            }
            return Ok(resp.revision);
        }

        let (mut start, end) = key::prefix_range(&target.key);
        let mut observed = 0;
        let mut pages = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            // later pages are pinned to the first page's revision
            let revision = if op.get_revision() > 0 { op.get_revision() } else { observed };
            let req = RangeRequest {
                key: start.clone(),
                range_end: Some(end.clone()),
                limit: op.get_page_limit(),
                revision,
                keys_only: op.is_keys_only(),
            };
            let resp = cancellable(cancel, self.transport.range(req)).await?;
            pages += 1;
            if observed == 0 {
                observed = resp.revision;
            }
            for record in &resp.records {
                op.respond(record)?;
            }
            match resp.records.last() {
                Some(last) if resp.more => start = key::key_after(&last.key),
                _ => break,
            }
        }
        debug!(pages, revision = observed, "get done");
        Ok(observed)
    }

    /// Stream changes until `cancel` fires, then return [`StoreError::Cancelled`].
    pub async fn watch(&self, cancel: &CancellationToken, prefix: &str, mut op: Op<'_>) -> Result<(), StoreError> {
        let target = assemble_key(prefix, &op)?;
        counter!("kectl_store_ops_total", 1u64, "op" => "watch");
        info!(key = %target.key, revision = op.get_revision(), "watch");

        let (key, end) = range_of(target);
        let mut stream = cancellable(cancel, self.transport.watch(key, end, op.get_revision())).await?;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StoreError::Cancelled),
                next = stream.next() => match next {
                    Some(Ok(ev)) => {
                        debug!(kind = ?ev.kind, revision = ev.revision, key = %ev.record.key_str(), "watch event");
                        let mut record = ev.record;
                        if op.is_keys_only() {
                            record.value = Bytes::new();
                            record.prev_value = None;
                        }
                        op.respond(&record)?;
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => return Err(StoreError::WatchClosed),
                },
            }
        }
    }

    /// Delete one object or every object under the resolved prefix. The
    /// callback sees each deleted record with the value it held.
    pub async fn delete(&self, cancel: &CancellationToken, prefix: &str, mut op: Op<'_>) -> Result<u64, StoreError> {
        let target = assemble_key(prefix, &op)?;
        counter!("kectl_store_ops_total", 1u64, "op" => "delete");
        info!(key = %target.key, single = target.single, "delete");

        let (key, end) = range_of(target);
        let resp = cancellable(cancel, self.transport.delete(key, end)).await?;
        for record in &resp.deleted {
            if op.is_keys_only() {
                op.respond(&Record { key: record.key.clone(), ..Default::default() })?;
            } else {
                op.respond(record)?;
            }
        }
        Ok(resp.deleted.len() as u64)
    }

    /// Write `value` under the single key the op addresses.
    pub async fn put(
        &self,
        cancel: &CancellationToken,
        prefix: &str,
        value: impl Into<Bytes>,
        mut op: Op<'_>,
    ) -> Result<i64, StoreError> {
        let target = assemble_key(prefix, &op)?;
        if !target.single {
            return Err(StoreError::NotSingle { key: target.key });
        }
        counter!("kectl_store_ops_total", 1u64, "op" => "put");
        debug!(key = %target.key, "put");

        let key = Bytes::from(target.key);
        let value = value.into();
        let resp = cancellable(cancel, self.transport.put(key.clone(), value.clone())).await?;
        let record = if op.is_keys_only() {
            Record { key, ..Default::default() }
        } else {
            Record { key, value, prev_value: resp.prev_value }
        };
        op.respond(&record)?;
        Ok(resp.revision)
    }
}
