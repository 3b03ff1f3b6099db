//! In-memory MVCC transport with etcd range and watch semantics.
//!
//! Every write bumps a global revision; old versions are kept so reads at a
//! past revision and watches from a past revision behave like etcd before
//! compaction.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::trace;

use crate::transport::{
    DeleteResponse, EventKind, PutResponse, RangeRequest, RangeResponse, Transport, TransportError, WatchEvent,
    WatchStream,
};
use crate::Record;

const WATCH_BUFFER: usize = 1024;

#[derive(Debug, Clone)]
struct Version {
    revision: i64,
    /// `None` marks a deletion.
    value: Option<Bytes>,
}

#[derive(Debug, Default)]
struct State {
    revision: i64,
    keys: BTreeMap<Bytes, Vec<Version>>,
    log: Vec<WatchEvent>,
}

impl State {
    fn live(&self, key: &Bytes) -> Option<Bytes> {
        self.keys.get(key).and_then(|v| v.last()).and_then(|v| v.value.clone())
    }
}

pub struct MemoryTransport {
    state: Mutex<State>,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_BUFFER);
        Self { state: Mutex::new(State::default()), events }
    }

    pub fn revision(&self) -> i64 {
        self.lock().revision
    }

    /// Current value of `key`, if any.
    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.lock().live(&Bytes::copy_from_slice(key.as_bytes()))
    }

    /// Live keys in order.
    pub fn keys(&self) -> Vec<String> {
        let state = self.lock();
        state
            .keys
            .iter()
            .filter(|(_, versions)| versions.last().is_some_and(|v| v.value.is_some()))
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a poisoned map is still consistent: every mutation is a single push
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, state: &mut State, ev: WatchEvent) {
        state.log.push(ev.clone());
        let _ = self.events.send(ev);
    }
}

fn in_range(key: &[u8], start: &[u8], end: Option<&[u8]>) -> bool {
    match end {
        None => key == start,
        Some([0]) => key >= start,
        Some(end) => key >= start && key < end,
    }
}

fn bounds(start: &Bytes, end: Option<&Bytes>) -> Option<(Bound<Bytes>, Bound<Bytes>)> {
    match end {
        None => Some((Bound::Included(start.clone()), Bound::Included(start.clone()))),
        Some(end) if end.as_ref() == [0] => Some((Bound::Included(start.clone()), Bound::Unbounded)),
        Some(end) if end > start => Some((Bound::Included(start.clone()), Bound::Excluded(end.clone()))),
        Some(_) => None,
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn range(&self, req: RangeRequest) -> Result<RangeResponse, TransportError> {
        let state = self.lock();
        let current = state.revision;
        if req.revision > current {
            return Err(TransportError::FutureRevision { requested: req.revision, current });
        }
        let at = if req.revision > 0 { req.revision } else { current };

        let mut out = RangeResponse { revision: current, ..Default::default() };
        let Some(range) = bounds(&req.key, req.range_end.as_ref()) else {
            return Ok(out);
        };
        for (key, versions) in state.keys.range(range) {
            let visible = versions.iter().rev().find(|v| v.revision <= at).and_then(|v| v.value.as_ref());
            let Some(value) = visible else { continue };
            if req.limit > 0 && out.records.len() as i64 == req.limit {
                out.more = true;
                break;
            }
            out.records.push(Record {
                key: key.clone(),
                value: if req.keys_only { Bytes::new() } else { value.clone() },
                prev_value: None,
            });
        }
        trace!(count = out.records.len(), more = out.more, at, "memory range");
        Ok(out)
    }

    async fn put(&self, key: Bytes, value: Bytes) -> Result<PutResponse, TransportError> {
        let mut state = self.lock();
        state.revision += 1;
        let revision = state.revision;
        let prev_value = state.live(&key);
        state
            .keys
            .entry(key.clone())
            .or_default()
            .push(Version { revision, value: Some(value.clone()) });
        let ev = WatchEvent {
            kind: EventKind::Put,
            revision,
            record: Record { key, value, prev_value: prev_value.clone() },
        };
        self.record(&mut state, ev);
        Ok(PutResponse { revision, prev_value })
    }

    async fn delete(&self, key: Bytes, range_end: Option<Bytes>) -> Result<DeleteResponse, TransportError> {
        let mut state = self.lock();
        let doomed: Vec<(Bytes, Bytes)> = match bounds(&key, range_end.as_ref()) {
            Some(range) => state
                .keys
                .range(range)
                .filter_map(|(k, versions)| {
                    let value = versions.last().and_then(|v| v.value.clone())?;
                    Some((k.clone(), value))
                })
                .collect(),
            None => Vec::new(),
        };
        if doomed.is_empty() {
            return Ok(DeleteResponse { revision: state.revision, deleted: Vec::new() });
        }

        state.revision += 1;
        let revision = state.revision;
        let mut deleted = Vec::with_capacity(doomed.len());
        for (k, value) in doomed {
            state
                .keys
                .entry(k.clone())
                .or_default()
                .push(Version { revision, value: None });
            let ev = WatchEvent {
                kind: EventKind::Delete,
                revision,
                record: Record { key: k.clone(), value: Bytes::new(), prev_value: Some(value.clone()) },
            };
            self.record(&mut state, ev);
            deleted.push(Record { key: k, value, prev_value: None });
        }
        Ok(DeleteResponse { revision, deleted })
    }

    async fn watch(&self, key: Bytes, range_end: Option<Bytes>, start_revision: i64) -> Result<WatchStream, TransportError> {
        // subscribe under the lock so no event falls between replay and live
        let state = self.lock();
        let rx = self.events.subscribe();
        let replay: Vec<Result<WatchEvent, TransportError>> = if start_revision > 0 {
            state
                .log
                .iter()
                .filter(|ev| ev.revision >= start_revision)
                .filter(|ev| in_range(&ev.record.key, &key, range_end.as_deref()))
                .cloned()
                .map(Ok)
                .collect()
        } else {
            Vec::new()
        };
        let seen = state.revision;
        drop(state);

        let live = futures::stream::unfold((rx, key, range_end), move |(mut rx, key, end)| async move {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.revision > seen && in_range(&ev.record.key, &key, end.as_deref()) => {
                        return Some((Ok(ev), (rx, key, end)));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        return Some((Err(TransportError::Lagged(n)), (rx, key, end)));
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(futures::stream::iter(replay).chain(live).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[tokio::test]
    async fn range_reads_past_revisions() {
        let t = MemoryTransport::new();
        t.put(b("/a"), b("1")).await.unwrap();
        let rev1 = t.revision();
        t.put(b("/a"), b("2")).await.unwrap();

        let now = t.range(RangeRequest { key: b("/a"), ..Default::default() }).await.unwrap();
        assert_eq!(now.records[0].value, b("2"));

        let then = t.range(RangeRequest { key: b("/a"), revision: rev1, ..Default::default() }).await.unwrap();
        assert_eq!(then.records[0].value, b("1"));

        let future = t.range(RangeRequest { key: b("/a"), revision: 99, ..Default::default() }).await;
        assert!(matches!(future, Err(TransportError::FutureRevision { .. })));
    }

    #[tokio::test]
    async fn range_limit_sets_more() {
        let t = MemoryTransport::new();
        for k in ["/p/a", "/p/b", "/p/c"] {
            t.put(b(k), b("v")).await.unwrap();
        }
        let req = RangeRequest { key: b("/p/"), range_end: Some(b("/p0")), limit: 2, ..Default::default() };
        let resp = t.range(req).await.unwrap();
        assert_eq!(resp.records.len(), 2);
        assert!(resp.more);
    }

    #[tokio::test]
    async fn delete_range_hides_keys_and_reports_values() {
        let t = MemoryTransport::new();
        t.put(b("/p/a"), b("1")).await.unwrap();
        t.put(b("/p/b"), b("2")).await.unwrap();
        t.put(b("/q/a"), b("3")).await.unwrap();
        let resp = t.delete(b("/p/"), Some(b("/p0"))).await.unwrap();
        assert_eq!(resp.deleted.len(), 2);
        assert_eq!(resp.deleted[0].value, b("1"));
        assert_eq!(t.keys(), vec!["/q/a".to_string()]);

        let none = t.delete(b("/p/"), Some(b("/p0"))).await.unwrap();
        assert!(none.deleted.is_empty());
    }

    #[tokio::test]
    async fn watch_replays_from_revision() {
        let t = MemoryTransport::new();
        t.put(b("/p/a"), b("1")).await.unwrap();
        t.put(b("/q/a"), b("x")).await.unwrap();
        t.put(b("/p/a"), b("2")).await.unwrap();

        let mut stream = t.watch(b("/p/"), Some(b("/p0")), 1).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.record.value, b("1"));
        assert_eq!(second.record.value, b("2"));
        assert_eq!(second.record.prev_value, Some(b("1")));
    }
}
