//! Collector interface and the buffered beacon reference collector
//!
//! The collector accepts a session init call plus `(session, event,
//! payload)` triples; its internal batching/retry policy is its own
//! concern. `BeaconCollector` is a reference implementation that buffers
//! records and flushes them to an HTTP beacon endpoint in the background.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::events::{EventData, EventKind};
use crate::player::HlsEngine;

/// Static and custom metadata handed to the collector at session start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Flat metadata dimensions attached to the whole session.
    pub data: serde_json::Map<String, Value>,
}

/// Analytics collection backend.
pub trait Collector: Send + Sync {
    /// Start a session. Called exactly once per session, before any emit.
    fn init(&self, session_id: &str, config: CollectorConfig);

    /// Forward one canonical event.
    fn emit(&self, session_id: &str, kind: EventKind, data: EventData);

    /// Register an HLS engine with the collector's built-in HLS
    /// instrumentation.
    fn add_hls_instrumentation(&self, session_id: &str, engine: Arc<dyn HlsEngine>);

    /// Remove a previously registered HLS instrumentation.
    fn remove_hls_instrumentation(&self, session_id: &str);
}

/// One buffered collector record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconRecord {
    /// Unique record ID
    pub id: Uuid,
    /// Session ID
    pub session_id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number
    pub sequence: u64,
    /// Canonical event name
    pub event: EventKind,
    /// Event payload
    #[serde(flatten)]
    pub data: EventData,
}

/// Buffered beacon collector.
///
/// Records are buffered in memory and flushed to the beacon endpoint in
/// the background once the buffer fills. Flushes are fire-and-forget:
/// failures are logged and the batch is dropped.
pub struct BeaconCollector {
    beacon_url: Option<String>,
    buffer: Mutex<Vec<BeaconRecord>>,
    max_buffer_size: usize,
    sequence: AtomicU64,
    flush_tx: mpsc::UnboundedSender<Vec<BeaconRecord>>,
    sessions: Mutex<HashMap<String, CollectorConfig>>,
    hls_registrations: Mutex<HashMap<String, Arc<dyn HlsEngine>>>,
}

impl BeaconCollector {
    /// Create a collector without a beacon endpoint. Records are still
    /// buffered and observable through [`BeaconCollector::buffered`].
    pub fn new() -> Self {
        Self::with_endpoint(None)
    }

    /// Create a collector that flushes to a beacon endpoint.
    pub fn with_beacon(beacon_url: impl Into<String>) -> Self {
        Self::with_endpoint(Some(beacon_url.into()))
    }

    fn with_endpoint(beacon_url: Option<String>) -> Self {
        let (flush_tx, mut flush_rx) = mpsc::unbounded_channel::<Vec<BeaconRecord>>();

        // Background flush processor
        let endpoint = beacon_url.clone();
        tokio::spawn(async move {
            let client = reqwest::Client::new();

            while let Some(batch) = flush_rx.recv().await {
                match endpoint.as_deref() {
                    Some(url) => {
                        if let Err(err) = post_batch(&client, url, &batch).await {
                            warn!(error = %err, count = batch.len(), "Beacon flush failed");
                        }
                    }
                    None => {
                        debug!(count = batch.len(), "Beacon flush skipped, no endpoint");
                    }
                }
            }
        });

        Self {
            beacon_url,
            buffer: Mutex::new(Vec::new()),
            max_buffer_size: 50,
            sequence: AtomicU64::new(0),
            flush_tx,
            sessions: Mutex::new(HashMap::new()),
            hls_registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Beacon endpoint, if configured.
    pub fn beacon_url(&self) -> Option<&str> {
        self.beacon_url.as_deref()
    }

    /// Metadata registered for a session.
    pub fn session_config(&self, session_id: &str) -> Option<CollectorConfig> {
        self.sessions.lock().ok()?.get(session_id).cloned()
    }

    /// All records still in the buffer.
    pub fn buffered(&self) -> Vec<BeaconRecord> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// True while an HLS engine is registered for the session.
    pub fn has_hls_instrumentation(&self, session_id: &str) -> bool {
        self.hls_registrations
            .lock()
            .map(|map| map.contains_key(session_id))
            .unwrap_or(false)
    }

    /// Drain the buffer and hand the batch to the background flusher.
    pub fn flush(&self) {
        let batch: Vec<BeaconRecord> = match self.buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(_) => return,
        };

        if !batch.is_empty() {
            info!(count = batch.len(), "Flushing beacon records");
            let _ = self.flush_tx.send(batch);
        }
    }
}

impl Default for BeaconCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for BeaconCollector {
    fn init(&self, session_id: &str, config: CollectorConfig) {
        info!(
            session_id,
            dimensions = config.data.len(),
            "Collector session initialized"
        );

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.to_string(), config);
        }
    }

    fn emit(&self, session_id: &str, kind: EventKind, data: EventData) {
        let record = BeaconRecord {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            event: kind,
            data,
        };

        debug!(session_id, event = %kind, sequence = record.sequence, "Beacon record buffered");

        let full = match self.buffer.lock() {
            Ok(mut buffer) => {
                buffer.push(record);
                buffer.len() >= self.max_buffer_size
            }
            Err(_) => false,
        };

        if full {
            self.flush();
        }
    }

    fn add_hls_instrumentation(&self, session_id: &str, engine: Arc<dyn HlsEngine>) {
        info!(
            session_id,
            library_version = %engine.library_version(),
            "HLS instrumentation registered"
        );

        if let Ok(mut registrations) = self.hls_registrations.lock() {
            registrations.insert(session_id.to_string(), engine);
        }
    }

    fn remove_hls_instrumentation(&self, session_id: &str) {
        info!(session_id, "HLS instrumentation removed");

        if let Ok(mut registrations) = self.hls_registrations.lock() {
            registrations.remove(session_id);
        }
    }
}

async fn post_batch(client: &reqwest::Client, url: &str, batch: &[BeaconRecord]) -> Result<()> {
    let body = serde_json::to_string(batch)?;

    client
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await?
        .error_for_status()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHls;

    impl HlsEngine for FakeHls {
        fn library_version(&self) -> String {
            "1.5.0".into()
        }
    }

    #[tokio::test]
    async fn test_emit_buffers_records_in_sequence() {
        let collector = BeaconCollector::new();

        collector.emit("player-1", EventKind::PlayerReady, EventData::default());
        collector.emit("player-1", EventKind::Play, EventData::default());

        let records = collector.buffered();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, EventKind::PlayerReady);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[1].event, EventKind::Play);
        assert_eq!(records[1].sequence, 2);
    }

    #[tokio::test]
    async fn test_flush_drains_buffer() {
        let collector = BeaconCollector::new();

        collector.emit("player-1", EventKind::Play, EventData::default());
        collector.flush();

        assert!(collector.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_init_stores_session_config() {
        let collector = BeaconCollector::new();

        let mut data = serde_json::Map::new();
        data.insert("env_key".into(), Value::String("abc123".into()));
        collector.init("player-1", CollectorConfig { data });

        let config = collector.session_config("player-1").unwrap();
        assert_eq!(config.data["env_key"], "abc123");
        assert!(collector.session_config("player-2").is_none());
    }

    #[tokio::test]
    async fn test_with_beacon_stores_endpoint() {
        let collector = BeaconCollector::with_beacon("https://beacon.example.com/ingest");
        assert_eq!(
            collector.beacon_url(),
            Some("https://beacon.example.com/ingest")
        );
        assert_eq!(BeaconCollector::new().beacon_url(), None);
    }

    #[tokio::test]
    async fn test_hls_instrumentation_roundtrip() {
        let collector = BeaconCollector::new();

        collector.add_hls_instrumentation("player-1", Arc::new(FakeHls));
        assert!(collector.has_hls_instrumentation("player-1"));

        collector.remove_hls_instrumentation("player-1");
        assert!(!collector.has_hls_instrumentation("player-1"));
    }
}
