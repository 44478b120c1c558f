// src/relay.rs

//! Relay of new chain heads from the node's client to the host.
//!
//! `subscribe` hands the client a bounded sink and spawns a forwarder task
//! that drains it. The client never waits on the host: it only ever pushes
//! into the sink, and the forwarder turns each header into a `"NewHead"`
//! event. The forwarder waits on slow listeners, so a stalled host leaves
//! headers in the sink for the client's overflow policy to handle.
//! Headers that cannot be decoded are logged, counted and dropped; the
//! subscription keeps running.

use crate::errors::{BridgeError, Result};
use crate::events::{BridgeEvent, EventChannel, HeaderRecord};
use crate::node::NodeHandle;
use lightlink_client::ChainHeader;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Pending notifications buffered between client and forwarder
pub const NEW_HEAD_BUFFER: usize = 16;

/// Relay counters
#[derive(Debug, Default)]
pub struct RelayStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
    active_subscriptions: AtomicUsize,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    /// Events published
    pub delivered: u64,

    /// Notifications dropped as undecodable
    pub dropped: u64,

    /// Forwarder tasks still running
    pub active_subscriptions: usize,
}

impl RelayStats {
    /// Current counter values
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
        }
    }
}

/// Turns headers into events
#[derive(Clone, Debug)]
struct HeadPublisher {
    events: EventChannel,
    stats: Arc<RelayStats>,
}

impl HeadPublisher {
    async fn on_new_head(&self, header: &dyn ChainHeader) -> bool {
        let record = match HeaderRecord::from_header(header) {
            Ok(record) => record,
            Err(e) => {
                warn!("Dropping new-head notification: {}", e);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        debug!(
            "Relaying head {}",
            record.get("number").unwrap_or("<unnumbered>")
        );
        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        self.events.publish(BridgeEvent::new_head(record)).await;
        true
    }
}

/// Header notification relay
pub struct HeaderRelay {
    /// Node whose client is subscribed to
    handle: Arc<NodeHandle>,

    /// Publishes decoded headers
    publisher: HeadPublisher,
}

impl HeaderRelay {
    /// Creates a relay for `handle` publishing on `events`
    pub fn new(handle: Arc<NodeHandle>, events: EventChannel) -> Self {
        Self {
            handle,
            publisher: HeadPublisher {
                events,
                stats: Arc::new(RelayStats::default()),
            },
        }
    }

    /// Subscribes to new heads of the current node.
    ///
    /// Returns `true` without subscribing when nothing is configured.
    /// Calling it again adds another subscription; events are then
    /// published once per subscription.
    pub async fn subscribe(&self) -> Result<bool> {
        let client = match self.handle.client().await.map_err(BridgeError::Subscription)? {
            Some(client) => client,
            None => {
                warn!("Subscribe requested before configure, not subscribing");
                return Ok(true);
            }
        };

        let (sink, receiver) = mpsc::channel(NEW_HEAD_BUFFER);
        client
            .subscribe_new_head(sink)
            .map_err(BridgeError::Subscription)?;

        self.spawn_forwarder(receiver);
        info!("Subscribed to new heads");
        Ok(true)
    }

    /// Decodes and publishes one header, as the forwarder does
    pub async fn on_new_head(&self, header: &dyn ChainHeader) -> bool {
        self.publisher.on_new_head(header).await
    }

    /// Channel events are published on
    pub fn events(&self) -> &EventChannel {
        &self.publisher.events
    }

    /// Counter values
    pub fn stats(&self) -> RelayStatsSnapshot {
        self.publisher.stats.snapshot()
    }

    fn spawn_forwarder(&self, mut receiver: mpsc::Receiver<Arc<dyn ChainHeader>>) {
        let publisher = self.publisher.clone();
        publisher
            .stats
            .active_subscriptions
            .fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            while let Some(header) = receiver.recv().await {
                publisher.on_new_head(header.as_ref()).await;
            }

            publisher
                .stats
                .active_subscriptions
                .fetch_sub(1, Ordering::Relaxed);
            debug!("New-head subscription ended");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NEW_HEAD_EVENT;
    use lightlink_client::{
        ClientError, DevNodeFactory, Genesis, Header, NodeConfiguration,
    };
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout, Duration};

    struct Garbled;

    impl ChainHeader for Garbled {
        fn encode_json(&self) -> lightlink_client::Result<String> {
            Ok("\u{0}garbage".to_string())
        }
    }

    struct Unencodable;

    impl ChainHeader for Unencodable {
        fn encode_json(&self) -> lightlink_client::Result<String> {
            Err(ClientError::EncodingError("missing difficulty".to_string()))
        }
    }

    async fn running_relay(temp_dir: &TempDir) -> (HeaderRelay, Arc<DevNodeFactory>) {
        let factory = Arc::new(DevNodeFactory::new());
        let handle = Arc::new(NodeHandle::new(factory.clone()));
        handle
            .configure(NodeConfiguration {
                data_dir: temp_dir.path().join("node"),
                keystore_dir: temp_dir.path().join("keystore"),
                ..Default::default()
            })
            .await
            .unwrap();
        handle.start().await.unwrap();

        (HeaderRelay::new(handle, EventChannel::new(32)), factory)
    }

    #[tokio::test]
    async fn test_subscribe_unconfigured() {
        let handle = Arc::new(NodeHandle::new(Arc::new(DevNodeFactory::new())));
        let relay = HeaderRelay::new(handle, EventChannel::new(8));

        assert!(relay.subscribe().await.unwrap());
        assert_eq!(relay.stats().active_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_subscribe_stopped_node_rejects() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, _factory) = running_relay(&temp_dir).await;
        relay.handle.stop().await.unwrap();

        let err = relay.subscribe().await.unwrap_err();
        assert_eq!(err.code(), "E_SUBSCRIPTION");
    }

    #[tokio::test]
    async fn test_header_becomes_event() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, factory) = running_relay(&temp_dir).await;
        let mut events = relay.events().subscribe();

        relay.subscribe().await.unwrap();
        let header = Header::genesis(&Genesis::default_for(1)).child(10);
        factory.latest().unwrap().dev_client().inject_head(Arc::new(header.clone()));

        let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
        assert_eq!(event.name, NEW_HEAD_EVENT);
        assert_eq!(event.payload, HeaderRecord::from_header(&header).unwrap());
        assert_eq!(relay.stats().delivered, 1);
    }

    #[tokio::test]
    async fn test_bad_headers_do_not_end_subscription() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, factory) = running_relay(&temp_dir).await;
        let mut events = relay.events().subscribe();
        relay.subscribe().await.unwrap();

        let client = factory.latest().unwrap().dev_client();
        client.inject_head(Arc::new(Unencodable));
        client.inject_head(Arc::new(Garbled));
        let header = Header::genesis(&Genesis::default_for(1)).child(10);
        client.inject_head(Arc::new(header.clone()));

        let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
        assert_eq!(event.payload.get("number"), Some("0x1"));

        let stats = relay.stats();
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.active_subscriptions, 1);
    }

    #[tokio::test]
    async fn test_direct_callback() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, _factory) = running_relay(&temp_dir).await;
        let mut events = relay.events().subscribe();

        assert!(!relay.on_new_head(&Unencodable).await);
        assert!(relay.on_new_head(&Header::genesis(&Genesis::default_for(1))).await);

        let event = events.recv().await.unwrap();
        assert_eq!(event.payload.get("number"), Some("0x0"));
    }

    #[tokio::test]
    async fn test_stop_ends_forwarder() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, _factory) = running_relay(&temp_dir).await;
        relay.subscribe().await.unwrap();
        assert_eq!(relay.stats().active_subscriptions, 1);

        relay.handle.stop().await.unwrap();

        timeout(Duration::from_secs(1), async {
            while relay.stats().active_subscriptions > 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_resubscribe_is_not_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, factory) = running_relay(&temp_dir).await;
        let mut events = relay.events().subscribe();

        relay.subscribe().await.unwrap();
        relay.subscribe().await.unwrap();

        let header = Header::genesis(&Genesis::default_for(1)).child(10);
        let client = factory.latest().unwrap().dev_client();
        assert_eq!(client.inject_head(Arc::new(header)), 2);

        for _ in 0..2 {
            let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
            assert_eq!(event.payload.get("number"), Some("0x1"));
        }
    }

    #[tokio::test]
    async fn test_stalled_listener_loses_nothing_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let (relay, factory) = running_relay(&temp_dir).await;
        let mut events = relay.events().subscribe();
        relay.subscribe().await.unwrap();

        let client = factory.latest().unwrap().dev_client();
        let mut head = Header::genesis(&Genesis::default_for(1));
        let mut accepted = 0;
        for _ in 0..80 {
            head = head.child(0);
            accepted += client.inject_head(Arc::new(head.clone()));
            tokio::task::yield_now().await;
        }

        // Listener queue, sink and one header in flight are all that fit
        assert!(accepted >= NEW_HEAD_BUFFER);
        assert!(accepted < 80);
        assert_eq!(client.overflowed(), (80 - accepted) as u64);

        let mut last = 0;
        for _ in 0..accepted {
            let event = timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
            let number = event.payload.get("number").unwrap();
            let number = u64::from_str_radix(number.trim_start_matches("0x"), 16).unwrap();
            assert!(number > last);
            last = number;
        }

        sleep(Duration::from_millis(20)).await;
        assert!(events.try_recv().is_err());

        let stats = relay.stats();
        assert_eq!(stats.delivered, accepted as u64);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reconfigure_during_delivery() {
        let temp_dir = TempDir::new().unwrap();
        let factory = Arc::new(DevNodeFactory::with_head_interval(Duration::from_millis(1)));
        let handle = Arc::new(NodeHandle::new(factory.clone()));
        let relay = HeaderRelay::new(handle.clone(), EventChannel::new(64));
        let done = Arc::new(AtomicBool::new(false));

        let mut events = relay.events().subscribe();
        let drain = {
            let done = done.clone();
            tokio::spawn(async move {
                let mut seen = 0u64;
                while !done.load(Ordering::SeqCst) {
                    if let Ok(Some(_)) = timeout(Duration::from_millis(10), events.recv()).await {
                        seen += 1;
                    }
                }
                seen
            })
        };

        let checker = {
            let done = done.clone();
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut checked = 0u64;
                while !done.load(Ordering::SeqCst) {
                    if let Some(state) = handle.snapshot().await {
                        let config = state.config();
                        assert_eq!(state.keystore().directory(), config.keystore_dir);
                        assert!(config.keystore_dir.starts_with(&config.data_dir));
                        checked += 1;
                    }
                    tokio::task::yield_now().await;
                }
                checked
            })
        };

        for i in 0..20 {
            let data_dir = temp_dir.path().join(format!("node-{}", i));
            handle
                .configure(NodeConfiguration {
                    network_id: i + 1,
                    keystore_dir: data_dir.join("keystore"),
                    data_dir,
                    ..Default::default()
                })
                .await
                .unwrap();
            handle.start().await.unwrap();
            relay.subscribe().await.unwrap();
            sleep(Duration::from_millis(5)).await;
        }
        done.store(true, Ordering::SeqCst);

        assert!(checker.await.unwrap() > 0);
        assert!(drain.await.unwrap() > 0);

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.config().network_id, 20);
        assert_eq!(relay.stats().dropped, 0);
    }
}
