//! Narrow capability interface onto the host media player
//!
//! The bridge never reaches into the host's internal object layout. A
//! thin adapter owned by the integration implements these traits and
//! isolates the core from whatever the host calls its engines this
//! release. Every state accessor returns `Option`: a property the player
//! does not expose at this moment resolves to absent instead of failing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Currently selected media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
    pub mime_type: Option<String>,
}

/// Core playback and ad lifecycle events published by the host player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Play,
    Playing,
    Pause,
    Seeking,
    Seeked,
    TimeUpdate { seconds: f64 },
    Ended,
    /// A source change started. Engines are swapped around this signal.
    SourceChangeStarted,
    Error {
        code: Option<i64>,
        message: Option<String>,
    },
    Ad(AdEvent),
}

/// Trigger descriptors for the core playback events, used by the
/// translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerTrigger {
    Play,
    Playing,
    Pause,
    Seeking,
    Seeked,
    TimeUpdate,
    Ended,
    SourceChangeStarted,
    Error,
}

impl PlayerEvent {
    /// Trigger descriptor for this event; `None` for ad events, which
    /// translate through their own path.
    pub fn trigger(&self) -> Option<PlayerTrigger> {
        Some(match self {
            PlayerEvent::Play => PlayerTrigger::Play,
            PlayerEvent::Playing => PlayerTrigger::Playing,
            PlayerEvent::Pause => PlayerTrigger::Pause,
            PlayerEvent::Seeking => PlayerTrigger::Seeking,
            PlayerEvent::Seeked => PlayerTrigger::Seeked,
            PlayerEvent::TimeUpdate { .. } => PlayerTrigger::TimeUpdate,
            PlayerEvent::Ended => PlayerTrigger::Ended,
            PlayerEvent::SourceChangeStarted => PlayerTrigger::SourceChangeStarted,
            PlayerEvent::Error { .. } => PlayerTrigger::Error,
            PlayerEvent::Ad(_) => return None,
        })
    }
}

/// Ad-break and per-ad lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    /// Ad request resolved.
    Loaded,
    BreakStart,
    BreakEnd,
    Started,
    Paused,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Completed,
    Skipped,
    Error {
        code: Option<i64>,
        message: Option<String>,
    },
}

/// The adaptive engine currently backing playback, if any.
#[derive(Clone)]
pub enum ActiveEngine {
    /// The playback engine has not been constructed yet. The binding
    /// stays stale and is re-derived on the next emission.
    Pending,
    /// Progressive source; no adaptive backend.
    None,
    Dash(Arc<dyn DashEngine>),
    Hls(Arc<dyn HlsEngine>),
}

impl std::fmt::Debug for ActiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveEngine::Pending => write!(f, "Pending"),
            ActiveEngine::None => write!(f, "None"),
            ActiveEngine::Dash(_) => write!(f, "Dash"),
            ActiveEngine::Hls(_) => write!(f, "Hls"),
        }
    }
}

/// Host media player capability interface.
#[async_trait]
pub trait PlayerAdapter: Send + Sync {
    /// Opaque target id; identifies the analytics session.
    fn target_id(&self) -> String;

    /// Resolves once when the player reaches its ready point. Some
    /// player versions never resolve this before playback begins.
    async fn ready(&self);

    /// Subscribe to core playback and ad events.
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;

    /// The adaptive engine currently backing playback.
    fn active_engine(&self) -> ActiveEngine {
        ActiveEngine::None
    }

    fn software_name(&self) -> Option<String> {
        None
    }

    fn software_version(&self) -> Option<String> {
        None
    }

    /// Current playhead time in seconds.
    fn current_time(&self) -> Option<f64> {
        None
    }

    fn is_paused(&self) -> Option<bool> {
        None
    }

    fn has_ended(&self) -> Option<bool> {
        None
    }

    /// Rendered element width in pixels.
    fn rendered_width(&self) -> Option<u32> {
        None
    }

    /// Rendered element height in pixels.
    fn rendered_height(&self) -> Option<u32> {
        None
    }

    /// Intrinsic video width, once media metadata is loaded.
    fn video_width(&self) -> Option<u32> {
        None
    }

    /// Intrinsic video height, once media metadata is loaded.
    fn video_height(&self) -> Option<u32> {
        None
    }

    fn is_fullscreen(&self) -> Option<bool> {
        None
    }

    fn autoplay_on(&self) -> Option<bool> {
        None
    }

    fn preload_on(&self) -> Option<bool> {
        None
    }

    fn selected_source(&self) -> Option<MediaSource> {
        None
    }

    /// Source duration in seconds.
    fn duration(&self) -> Option<f64> {
        None
    }

    fn poster_url(&self) -> Option<String> {
        None
    }

    /// Ad tag URL from the ad-serving configuration.
    fn ad_tag_url(&self) -> Option<String> {
        None
    }

    /// Asset URL of the ad currently rendering.
    fn current_ad_asset_url(&self) -> Option<String> {
        None
    }
}

/// A variant track in the DASH engine's ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTrack {
    pub active: bool,
    /// Bandwidth in bits per second.
    pub bandwidth: u64,
}

/// Aggregate stats reported by the DASH engine for the active rendition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Request classes in the DASH engine's network taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashRequestType {
    Manifest,
    Segment,
    License,
    Timing,
    Application,
    Unknown,
}

/// Severity classes in the DASH engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashErrorSeverity {
    Recoverable,
    Critical,
}

/// A completed fetch observed by the DASH engine's network layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResponse {
    pub uri: String,
    pub request_type: DashRequestType,
    pub from_cache: bool,
    pub bytes_loaded: u64,
    pub headers: HashMap<String, String>,
    /// Time the request spent in flight, when the engine reports it.
    pub duration_ms: Option<f64>,
    /// Wall-clock milliseconds when the response finished.
    pub finished_at_ms: i64,
}

/// A fault raised by the DASH engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineError {
    pub severity: DashErrorSeverity,
    pub category: u32,
    pub code: u32,
    pub message: Option<String>,
}

/// Events published by a DASH engine instance.
#[derive(Debug, Clone, PartialEq)]
pub enum DashEvent {
    /// The engine made an adaptation decision.
    Adaptation,
    /// The active variant was switched.
    VariantChanged,
    ResponseCompleted(NetworkResponse),
    Error(EngineError),
}

/// DASH-capable adaptive engine handle.
pub trait DashEngine: Send + Sync {
    /// Current variant track ladder.
    fn variant_tracks(&self) -> Vec<VariantTrack>;

    /// Aggregate stats for the active rendition.
    fn stats(&self) -> EngineStats;

    /// Subscribe to engine events. Each call yields an independent
    /// receiver that only sees events published after it was created.
    fn subscribe(&self) -> broadcast::Receiver<DashEvent>;

    /// Label for a code from the engine's error enumeration, when known.
    fn error_code_label(&self, code: u32) -> Option<String>;

    /// Label for a category from the engine's error enumeration.
    fn error_category_label(&self, category: u32) -> Option<String>;
}

/// HLS-capable adaptive engine handle.
///
/// HLS monitoring is delegated wholesale to the collector's built-in
/// instrumentation; the bridge only carries the handle across.
pub trait HlsEngine: Send + Sync {
    /// Version of the HLS library backing the engine.
    fn library_version(&self) -> String;
}
