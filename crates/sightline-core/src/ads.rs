//! Ad event translation
//!
//! Ad lifecycle signals translate independently of the readiness gate:
//! pre-roll ads legitimately play before the main content is ready, and
//! suppressing them would lose the whole pre-roll. Callers must preserve
//! this exception.

use crate::events::{EventData, EventKind};
use crate::player::AdEvent;
use crate::session::SessionState;

impl SessionState {
    pub(crate) fn on_ad_event(&mut self, event: AdEvent) {
        match event {
            AdEvent::Loaded => {
                let data = EventData {
                    ad_tag_url: self.player.ad_tag_url(),
                    ..Default::default()
                };
                self.emit(EventKind::AdResponse, data);
            }
            AdEvent::BreakStart => self.emit(EventKind::AdBreakStart, EventData::default()),
            AdEvent::BreakEnd => self.emit(EventKind::AdBreakEnd, EventData::default()),
            AdEvent::Started => {
                self.emit(EventKind::AdPlay, EventData::default());
                // the rendering ad's asset URL rides on `adplaying`
                let data = EventData {
                    ad_asset_url: self.player.current_ad_asset_url(),
                    ..Default::default()
                };
                self.emit(EventKind::AdPlaying, data);
            }
            AdEvent::Paused => self.emit(EventKind::AdPause, EventData::default()),
            AdEvent::FirstQuartile => {
                self.emit(EventKind::AdFirstQuartile, EventData::default())
            }
            AdEvent::Midpoint => self.emit(EventKind::AdMidpoint, EventData::default()),
            AdEvent::ThirdQuartile => {
                self.emit(EventKind::AdThirdQuartile, EventData::default())
            }
            AdEvent::Completed => self.emit(EventKind::AdEnded, EventData::default()),
            AdEvent::Skipped => {
                self.emit(EventKind::AdSkipped, EventData::default());
                self.emit(EventKind::AdEnded, EventData::default());
            }
            AdEvent::Error { code, message } => {
                let mut data = EventData::default();
                let has_detail = code.is_some()
                    || message.as_deref().is_some_and(|message| !message.is_empty());

                if has_detail {
                    data.player_error_code = code;
                    data.player_error_message =
                        message.filter(|message| !message.is_empty());
                } else {
                    // load failure with no playback start: the tag URL is
                    // the only available context
                    data.ad_tag_url = self.player.ad_tag_url();
                }

                self.emit(EventKind::AdError, data);
            }
        }
    }
}
