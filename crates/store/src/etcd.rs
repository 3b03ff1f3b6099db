//! etcd v3 transport.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use etcd_client::{
    Client as EtcdClient, ConnectOptions, DeleteOptions, EventType, GetOptions, KeyValue, PutOptions, WatchOptions,
};
use futures::StreamExt;
use tracing::{info, warn};

use crate::transport::{
    DeleteResponse, EventKind, PutResponse, RangeRequest, RangeResponse, Transport, TransportError, WatchEvent,
    WatchStream,
};
use crate::Record;

fn backend(err: etcd_client::Error) -> TransportError {
    TransportError::Backend(Box::new(err))
}

fn record(kv: &KeyValue) -> Record {
    Record {
        key: Bytes::copy_from_slice(kv.key()),
        value: Bytes::copy_from_slice(kv.value()),
        prev_value: None,
    }
}

fn get_options(req: &RangeRequest) -> GetOptions {
    let mut opts = GetOptions::new();
    if let Some(end) = &req.range_end {
        opts = opts.with_range(end.to_vec());
    }
    if req.limit > 0 {
        opts = opts.with_limit(req.limit);
    }
    if req.revision > 0 {
        opts = opts.with_revision(req.revision);
    }
    if req.keys_only {
        opts = opts.with_keys_only();
    }
    opts
}

fn delete_options(range_end: Option<&Bytes>) -> DeleteOptions {
    let opts = DeleteOptions::new().with_prev_key();
    match range_end {
        Some(end) => opts.with_range(end.to_vec()),
        None => opts,
    }
}

fn watch_options(range_end: Option<&Bytes>, start_revision: i64) -> WatchOptions {
    let mut opts = WatchOptions::new().with_prev_key();
    if let Some(end) = range_end {
        opts = opts.with_range(end.to_vec());
    }
    if start_revision > 0 {
        opts = opts.with_start_revision(start_revision);
    }
    opts
}

/// Connection settings for [`EtcdTransport::connect`].
#[derive(Debug, Clone, Default)]
pub struct EtcdConfig {
    pub endpoints: Vec<String>,
    pub user: Option<(String, String)>,
    pub dial_timeout: Option<Duration>,
}

pub struct EtcdTransport {
    client: EtcdClient,
}

impl EtcdTransport {
    pub async fn connect(config: &EtcdConfig) -> Result<Self, TransportError> {
        let mut opts = ConnectOptions::new();
        if let Some((user, password)) = &config.user {
            opts = opts.with_user(user.clone(), password.clone());
        }
        if let Some(timeout) = config.dial_timeout {
            opts = opts.with_connect_timeout(timeout);
        }
        let client = EtcdClient::connect(&config.endpoints, Some(opts)).await.map_err(backend)?;
        info!(endpoints = ?config.endpoints, "connected to etcd");
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for EtcdTransport {
    async fn range(&self, req: RangeRequest) -> Result<RangeResponse, TransportError> {
        let opts = get_options(&req);
        let resp = self.client.kv_client().get(req.key.to_vec(), Some(opts)).await.map_err(backend)?;
        Ok(RangeResponse {
            records: resp.kvs().iter().map(record).collect(),
            more: resp.more(),
            revision: resp.header().map(|h| h.revision()).unwrap_or_default(),
        })
    }

    async fn put(&self, key: Bytes, value: Bytes) -> Result<PutResponse, TransportError> {
        let opts = PutOptions::new().with_prev_key();
        let resp = self
            .client
            .kv_client()
            .put(key.to_vec(), value.to_vec(), Some(opts))
            .await
            .map_err(backend)?;
        Ok(PutResponse {
            revision: resp.header().map(|h| h.revision()).unwrap_or_default(),
            prev_value: resp.prev_key().map(|kv| Bytes::copy_from_slice(kv.value())),
        })
    }

    async fn delete(&self, key: Bytes, range_end: Option<Bytes>) -> Result<DeleteResponse, TransportError> {
        let opts = delete_options(range_end.as_ref());
        let resp = self.client.kv_client().delete(key.to_vec(), Some(opts)).await.map_err(backend)?;
        Ok(DeleteResponse {
            revision: resp.header().map(|h| h.revision()).unwrap_or_default(),
            deleted: resp.prev_kvs().iter().map(record).collect(),
        })
    }

    async fn watch(&self, key: Bytes, range_end: Option<Bytes>, start_revision: i64) -> Result<WatchStream, TransportError> {
        let opts = watch_options(range_end.as_ref(), start_revision);
        let (watcher, stream) = self.client.watch_client().watch(key.to_vec(), Some(opts)).await.map_err(backend)?;

        // the watcher handle must outlive the stream or etcd cancels the watch
        let state = (watcher, stream, VecDeque::<WatchEvent>::new());
        let events = futures::stream::unfold(state, |(watcher, mut stream, mut pending)| async move {
            loop {
                if let Some(ev) = pending.pop_front() {
                    return Some((Ok(ev), (watcher, stream, pending)));
                }
                match stream.message().await {
                    Ok(Some(resp)) => {
                        if resp.canceled() {
                            warn!(reason = resp.cancel_reason(), "etcd cancelled the watch");
                            return None;
                        }
                        let revision = resp.header().map(|h| h.revision()).unwrap_or_default();
                        for ev in resp.events() {
                            let Some(kv) = ev.kv() else { continue };
                            let prev_value = ev.prev_kv().map(|p| Bytes::copy_from_slice(p.value()));
                            let kind = match ev.event_type() {
                                EventType::Put => EventKind::Put,
                                EventType::Delete => EventKind::Delete,
                            };
                            pending.push_back(WatchEvent {
                                kind,
                                revision: if kv.mod_revision() > 0 { kv.mod_revision() } else { revision },
                                record: Record { prev_value, ..record(kv) },
                            });
                        }
                    }
                    Ok(None) => return None,
                    Err(err) => return Some((Err(backend(err)), (watcher, stream, pending))),
                }
            }
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_request_maps_to_get_options() {
        let req = RangeRequest {
            key: Bytes::from_static(b"/registry/pods/"),
            range_end: Some(Bytes::from_static(b"/registry/pods0")),
            limit: 2,
            revision: 7,
            keys_only: true,
        };
        let dbg = format!("{:?}", get_options(&req));
        assert!(dbg.contains("limit: 2"), "{dbg}");
        assert!(dbg.contains("revision: 7"), "{dbg}");
        assert!(dbg.contains("keys_only: true"), "{dbg}");
        assert!(dbg.contains(&format!("range_end: {:?}", b"/registry/pods0".to_vec())), "{dbg}");
    }

    #[test]
    fn unset_fields_stay_at_etcd_defaults() {
        let dbg = format!("{:?}", get_options(&RangeRequest::default()));
        assert!(dbg.contains("limit: 0"), "{dbg}");
        assert!(dbg.contains("revision: 0"), "{dbg}");
        assert!(dbg.contains("keys_only: false"), "{dbg}");
        assert!(dbg.contains("range_end: []"), "{dbg}");
    }

    #[test]
    fn deletes_and_watches_ask_for_previous_values() {
        let end = Bytes::from_static(b"/registry/pods0");
        let dbg = format!("{:?}", delete_options(Some(&end)));
        assert!(dbg.contains("prev_kv: true"), "{dbg}");
        assert!(dbg.contains(&format!("range_end: {:?}", end.to_vec())), "{dbg}");

        let dbg = format!("{:?}", watch_options(None, 5));
        assert!(dbg.contains("prev_kv: true"), "{dbg}");
        assert!(dbg.contains("start_revision: 5"), "{dbg}");
        assert!(dbg.contains("range_end: []"), "{dbg}");
    }
}
