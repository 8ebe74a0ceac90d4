//! Playback event translation
//!
//! Core playback signals map through an immutable ordered table onto
//! their canonical names; payload-bearing events are transformed
//! alongside. The table is built once and never mutated, so the
//! trigger set and its iteration order are explicit and testable.

use chrono::Utc;

use crate::events::{EventData, EventKind};
use crate::player::{PlayerEvent, PlayerTrigger};
use crate::session::SessionState;
use crate::snapshot::seconds_to_ms;

/// Trigger -> canonical name mapping for the core playback events, in
/// subscription order.
pub static PLAYBACK_EVENT_MAP: &[(PlayerTrigger, EventKind)] = &[
    (PlayerTrigger::Play, EventKind::Play),
    (PlayerTrigger::SourceChangeStarted, EventKind::VideoChange),
    (PlayerTrigger::Playing, EventKind::Playing),
    (PlayerTrigger::Pause, EventKind::Pause),
    (PlayerTrigger::TimeUpdate, EventKind::TimeUpdate),
    (PlayerTrigger::Seeking, EventKind::Seeking),
    (PlayerTrigger::Seeked, EventKind::Seeked),
    (PlayerTrigger::Ended, EventKind::Ended),
    (PlayerTrigger::Error, EventKind::Error),
];

/// Payload transform for a core playback event. `None` suppresses the
/// emission: an error without a message body duplicates an engine-level
/// report that already carried the fault.
pub(crate) fn playback_payload(event: &PlayerEvent) -> Option<EventData> {
    match event {
        PlayerEvent::TimeUpdate { seconds } => Some(EventData {
            player_playhead_time_ms: Some(seconds_to_ms(*seconds)),
            ..Default::default()
        }),
        PlayerEvent::Error { code, message } => {
            let message = message.as_deref().filter(|message| !message.is_empty())?;
            Some(EventData {
                player_error_code: *code,
                player_error_message: Some(message.to_string()),
                ..Default::default()
            })
        }
        _ => Some(EventData::default()),
    }
}

/// One-shot derived-`playing` monitor.
///
/// Armed on `play`; the first playhead tick that progressed past the
/// play point emits `playing` and disarms. Any of the disqualifying
/// events (pause, seek, error, ended) arriving first disarms without
/// emitting. Disarming is the session's only cancellation primitive.
pub(crate) struct PlayingMonitor {
    /// Playhead position at the play intent, in milliseconds.
    play_time_ms: u64,
}

impl SessionState {
    pub(crate) fn on_player_event(&mut self, event: PlayerEvent) {
        let event = match event {
            PlayerEvent::Ad(ad) => {
                self.on_ad_event(ad);
                return;
            }
            event => event,
        };

        // `play` doubles as the readiness trigger: some player versions
        // go straight to playback without ever resolving `ready`.
        if matches!(event, PlayerEvent::Play) {
            self.emit_player_ready();
        }

        if !self.gate.is_ready() {
            return;
        }

        let Some(trigger) = event.trigger() else {
            return;
        };
        let Some((_, kind)) = PLAYBACK_EVENT_MAP
            .iter()
            .find(|(candidate, _)| *candidate == trigger)
        else {
            return;
        };

        // engines are swapped around this signal; the binding must be
        // stale before this event's own emission re-derives it
        if matches!(event, PlayerEvent::SourceChangeStarted) {
            self.invalidate_binding();
        }

        if let Some(data) = playback_payload(&event) {
            let deferred_playing =
                self.derive_playing && matches!(event, PlayerEvent::Playing);
            if !deferred_playing {
                self.emit(*kind, data);
            }
        }

        self.update_playing_monitor(&event);
    }

    fn update_playing_monitor(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Play => {
                if self.derive_playing {
                    let play_time_ms = self
                        .player
                        .current_time()
                        .map(seconds_to_ms)
                        .unwrap_or(0);
                    self.playing_monitor = Some(PlayingMonitor { play_time_ms });
                }
            }
            PlayerEvent::TimeUpdate { seconds } => {
                let Some(monitor) = &self.playing_monitor else {
                    return;
                };
                let current_ms = seconds_to_ms(*seconds);
                if current_ms > monitor.play_time_ms {
                    let progressed = current_ms - monitor.play_time_ms;
                    self.playing_monitor = None;
                    self.emit(
                        EventKind::Playing,
                        EventData {
                            viewer_time: Some(
                                Utc::now().timestamp_millis() - progressed as i64,
                            ),
                            ..Default::default()
                        },
                    );
                }
            }
            PlayerEvent::Pause
            | PlayerEvent::Seeking
            | PlayerEvent::Ended
            | PlayerEvent::Error { .. } => {
                self.playing_monitor = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_covers_every_core_trigger_once() {
        let triggers: Vec<_> = PLAYBACK_EVENT_MAP.iter().map(|(t, _)| *t).collect();

        for trigger in [
            PlayerTrigger::Play,
            PlayerTrigger::Playing,
            PlayerTrigger::Pause,
            PlayerTrigger::Seeking,
            PlayerTrigger::Seeked,
            PlayerTrigger::TimeUpdate,
            PlayerTrigger::Ended,
            PlayerTrigger::SourceChangeStarted,
            PlayerTrigger::Error,
        ] {
            assert_eq!(
                triggers.iter().filter(|t| **t == trigger).count(),
                1,
                "{trigger:?} must appear exactly once"
            );
        }
    }

    #[test]
    fn test_timeupdate_payload_is_milliseconds() {
        let data = playback_payload(&PlayerEvent::TimeUpdate { seconds: 2.5 }).unwrap();
        assert_eq!(data.player_playhead_time_ms, Some(2500));
    }

    #[test]
    fn test_error_payload_carries_code_and_message() {
        let data = playback_payload(&PlayerEvent::Error {
            code: Some(7002),
            message: Some("media load failed".into()),
        })
        .unwrap();

        assert_eq!(data.player_error_code, Some(7002));
        assert_eq!(data.player_error_message.as_deref(), Some("media load failed"));
    }

    #[test]
    fn test_error_without_message_is_suppressed() {
        assert!(playback_payload(&PlayerEvent::Error {
            code: Some(7002),
            message: None,
        })
        .is_none());
        assert!(playback_payload(&PlayerEvent::Error {
            code: Some(7002),
            message: Some(String::new()),
        })
        .is_none());
    }

    #[test]
    fn test_plain_events_have_empty_payload() {
        assert_eq!(
            playback_payload(&PlayerEvent::Pause),
            Some(EventData::default())
        );
    }
}
