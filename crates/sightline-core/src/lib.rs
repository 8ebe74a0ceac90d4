//! Sightline Core - Player Analytics Bridge
//!
//! This crate observes a host media player's lifecycle and playback
//! events and re-emits them, translated into a canonical Quality-of-
//! Experience event vocabulary, to an analytics collector:
//! - Canonical event vocabulary and payload shapes
//! - Lazy point-in-time player state snapshots
//! - Readiness gating across the ready/first-play race
//! - Playback and ad event translation
//! - Adaptive engine (DASH/HLS) observer rebinding across source changes
//! - Buffered HTTP beacon reference collector
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Sightline Core                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   host events      ┌──────────────┐      ┌──────────────┐   │
//! │  ───────────────▶  │  Readiness   │      │   Playback   │   │
//! │                    │    Gate      │─────▶│  + Ad Event  │   │
//! │   ready signal     └──────────────┘      │  Translators │   │
//! │  ───────────────▶         │              └──────┬───────┘   │
//! │                           │                     │           │
//! │                    ┌──────┴──────┐       ┌──────┴───────┐   │
//! │   engine events    │   Engine    │       │   Session    │   │
//! │  ───────────────▶  │  Rebinder   │──────▶│  emit + ─────┼───┼──▶ Collector
//! │                    └─────────────┘       │  Snapshot    │   │
//! │                                          └──────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod ads;
pub mod binding;
pub mod collector;
pub mod error;
pub mod events;
pub mod playback;
pub mod player;
pub mod readiness;
pub mod session;
pub mod snapshot;

pub use collector::{BeaconCollector, BeaconRecord, Collector, CollectorConfig};
pub use error::{Error, Result};
pub use events::{EventData, EventKind};
pub use playback::PLAYBACK_EVENT_MAP;
pub use player::{
    ActiveEngine, AdEvent, DashEngine, DashErrorSeverity, DashEvent, DashRequestType,
    EngineError, EngineStats, HlsEngine, MediaSource, NetworkResponse, PlayerAdapter,
    PlayerEvent, PlayerTrigger, VariantTrack,
};
pub use readiness::{Readiness, ReadinessGate};
pub use session::{Monitor, MonitorOptions};
pub use snapshot::{snapshot, StateData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the bridge library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Sightline Core initialized");
}
