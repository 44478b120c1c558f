// src/events.rs

//! Host-facing event channel.
//!
//! Every event goes to every listener; today the only event is
//! [`NEW_HEAD_EVENT`]. Each listener has its own bounded queue and
//! publishing waits for room in it, so a slow host holds up the relay
//! instead of losing events. Once the relay is held up, the client's
//! delivery buffer fills and its own overflow policy applies.

use crate::errors::RecordError;
use crate::translator::json_type;
use lightlink_client::ChainHeader;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Name of the new chain head event
pub const NEW_HEAD_EVENT: &str = "NewHead";

/// Header fields as strings, keyed by their canonical JSON names
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderRecord(BTreeMap<String, String>);

impl HeaderRecord {
    /// Decodes a header through its canonical encoding
    pub fn from_header(header: &dyn ChainHeader) -> Result<Self, RecordError> {
        let json = header.encode_json()?;
        Self::from_json(&json)
    }

    /// Decodes a canonical header encoding
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(fields) => Ok(Self(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, coerce(value)))
                    .collect(),
            )),
            other => Err(RecordError::NotAnObject(json_type(&other))),
        }
    }

    /// Field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field map
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

fn coerce(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Event published to the host
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BridgeEvent {
    /// Event name
    pub name: &'static str,

    /// Event payload
    pub payload: HeaderRecord,
}

impl BridgeEvent {
    /// New chain head event
    pub fn new_head(record: HeaderRecord) -> Self {
        Self {
            name: NEW_HEAD_EVENT,
            payload: record,
        }
    }
}

/// Fan-out of [`BridgeEvent`]s to host listeners
#[derive(Clone, Debug)]
pub struct EventChannel {
    /// Queue length of each listener
    capacity: usize,

    /// Senders of the live listeners
    listeners: Arc<Mutex<Vec<mpsc::Sender<BridgeEvent>>>>,
}

impl EventChannel {
    /// Creates a channel whose listeners each queue up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Publishes an event to every listener, waiting while a listener's
    /// queue is full. Returns how many listeners received it.
    pub async fn publish(&self, event: BridgeEvent) -> usize {
        let listeners = self.lock().clone();
        let mut delivered = 0;

        for listener in &listeners {
            if listener.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < listeners.len() {
            self.lock().retain(|listener| !listener.is_closed());
        }
        delivered
    }

    /// New listener seeing events published from now on
    pub fn subscribe(&self) -> mpsc::Receiver<BridgeEvent> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.lock().push(sender);
        receiver
    }

    /// Number of live listeners
    pub fn receiver_count(&self) -> usize {
        let mut listeners = self.lock();
        listeners.retain(|listener| !listener.is_closed());
        listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::Sender<BridgeEvent>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
