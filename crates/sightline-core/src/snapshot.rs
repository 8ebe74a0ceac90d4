//! Point-in-time player state snapshots
//!
//! A snapshot is attached to every outbound event. Each field is read
//! individually at call time and resolves to absent when the player does
//! not expose the property at that moment; a missing property never
//! aborts the remaining fields.

use serde::{Deserialize, Serialize};

use crate::player::PlayerAdapter;

/// Convert a player-reported time in seconds to whole milliseconds.
pub(crate) fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round().max(0.0) as u64
}

/// Derived player state captured at emission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
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
    /// Duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_source_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_poster_url: Option<String>,
}

/// Read the player's current state.
///
/// Called once per outbound event, synchronously. Never cached across
/// events and never polled on a timer.
pub fn snapshot(player: &dyn PlayerAdapter) -> StateData {
    let paused = player.is_paused();
    let ended = player.has_ended();
    // an ended player counts as paused
    let player_is_paused = match (paused, ended) {
        (None, None) => None,
        (paused, ended) => Some(paused.unwrap_or(false) || ended.unwrap_or(false)),
    };

    let source = player.selected_source();

    StateData {
        player_is_paused,
        player_width: player.rendered_width(),
        player_height: player.rendered_height(),
        video_source_width: player.video_width(),
        video_source_height: player.video_height(),
        player_is_fullscreen: player.is_fullscreen(),
        player_autoplay_on: player.autoplay_on(),
        player_preload_on: player.preload_on(),
        video_source_url: source.as_ref().map(|s| s.url.clone()),
        video_source_mime_type: source.and_then(|s| s.mime_type),
        video_source_duration: player.duration().map(seconds_to_ms),
        video_poster_url: player.poster_url(),
    }
}
