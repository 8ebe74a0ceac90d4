//! Canonical analytics event vocabulary
//!
//! The closed set of outbound event names understood by the collector,
//! plus the flat payload shape shared by all of them. This module is the
//! contract between the translators and the collector; it has no runtime
//! behavior of its own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::snapshot::StateData;

/// Canonical outbound event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The player reached its ready point (or playback started first).
    PlayerReady,
    /// Play intent.
    Play,
    /// Playback actually progressing.
    Playing,
    /// Playback paused.
    Pause,
    /// Seek started.
    Seeking,
    /// Seek finished.
    Seeked,
    /// Playhead progress.
    TimeUpdate,
    /// Playback reached its natural end.
    Ended,
    /// A source change started.
    VideoChange,
    /// Fatal playback error.
    Error,
    /// Session end.
    Destroy,
    /// Entered an ad slot (pre/mid/post-roll).
    AdBreakStart,
    /// Left an ad slot.
    AdBreakEnd,
    /// Ad request resolved.
    AdResponse,
    /// An ad is about to play.
    AdPlay,
    /// An ad started rendering.
    AdPlaying,
    /// An ad paused.
    AdPause,
    /// Ad progress checkpoint: 25%.
    AdFirstQuartile,
    /// Ad progress checkpoint: 50%.
    AdMidpoint,
    /// Ad progress checkpoint: 75%.
    AdThirdQuartile,
    /// An ad completed.
    AdEnded,
    /// The viewer skipped an ad.
    AdSkipped,
    /// Ad playback or load error.
    AdError,
    /// The adaptive engine switched renditions.
    RenditionChange,
    /// A network fetch completed.
    RequestCompleted,
    /// A network-level engine fault.
    RequestFailed,
}

impl EventKind {
    /// Wire name understood by the collector.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PlayerReady => "playerready",
            EventKind::Play => "play",
            EventKind::Playing => "playing",
            EventKind::Pause => "pause",
            EventKind::Seeking => "seeking",
            EventKind::Seeked => "seeked",
            EventKind::TimeUpdate => "timeupdate",
            EventKind::Ended => "ended",
            EventKind::VideoChange => "videochange",
            EventKind::Error => "error",
            EventKind::Destroy => "destroy",
            EventKind::AdBreakStart => "adbreakstart",
            EventKind::AdBreakEnd => "adbreakend",
            EventKind::AdResponse => "adresponse",
            EventKind::AdPlay => "adplay",
            EventKind::AdPlaying => "adplaying",
            EventKind::AdPause => "adpause",
            EventKind::AdFirstQuartile => "adfirstquartile",
            EventKind::AdMidpoint => "admidpoint",
            EventKind::AdThirdQuartile => "adthirdquartile",
            EventKind::AdEnded => "adended",
            EventKind::AdSkipped => "adskipped",
            EventKind::AdError => "aderror",
            EventKind::RenditionChange => "renditionchange",
            EventKind::RequestCompleted => "requestcompleted",
            EventKind::RequestFailed => "requestfailed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flat event payload. Absent optional fields are skipped on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    // State snapshot fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_is_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_is_fullscreen: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_autoplay_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_preload_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_mime_type: Option<String>,
    /// Source duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_poster_url: Option<String>,

    // Playback fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_playhead_time_ms: Option<u64>,
    /// Wall-clock milliseconds; backdated for the derived `playing`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_error_message: Option<String>,

    // Ad fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_tag_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_asset_url: Option<String>,

    // Rendition fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_bitrate: Option<u64>,

    // Network request fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_bytes_loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_response_headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    /// Wall-clock milliseconds when the request started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_start: Option<i64>,
    /// Wall-clock milliseconds when the response finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_response_end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_error_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_error_text: Option<String>,
}

impl EventData {
    /// Merge a state snapshot under this payload. Fields already set by
    /// the translator win over snapshot fields.
    pub fn apply_state(&mut self, state: StateData) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.player_is_paused, state.player_is_paused);
        fill(&mut self.player_width, state.player_width);
        fill(&mut self.player_height, state.player_height);
        fill(&mut self.video_source_width, state.video_source_width);
        fill(&mut self.video_source_height, state.video_source_height);
        fill(&mut self.player_is_fullscreen, state.player_is_fullscreen);
        fill(&mut self.player_autoplay_on, state.player_autoplay_on);
        fill(&mut self.player_preload_on, state.player_preload_on);
        fill(&mut self.video_source_url, state.video_source_url);
        fill(&mut self.video_source_mime_type, state.video_source_mime_type);
        fill(&mut self.video_source_duration, state.video_source_duration);
        fill(&mut self.video_poster_url, state.video_poster_url);
    }
}
