//! Adaptive engine rebinding
//!
//! The host recreates its engine objects on every source change and
//! playlist advance, and observers attached to a stale handle silently
//! stop firing. The host only announces that *a* source change happened,
//! never that the engine object was replaced, so the binding is
//! re-derived lazily on the next emission instead of push-driven.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use url::Url;

use crate::events::{EventData, EventKind};
use crate::player::{
    ActiveEngine, DashEngine, DashErrorSeverity, DashEvent, DashRequestType, EngineError,
    NetworkResponse, VariantTrack,
};
use crate::session::SessionState;

/// Observers currently attached to the adaptive engine backing playback.
/// At most one binding is active per session.
pub(crate) struct EngineBinding {
    /// False while the binding may reference a replaced engine.
    current: bool,
    /// Bumped whenever the DASH subscription target changes. The session
    /// loop re-syncs its receiver when the epoch moves, before the next
    /// event is polled.
    epoch: u64,
    dash: Option<Arc<dyn DashEngine>>,
    hls_registered: bool,
    /// Last aggregate bitrate emitted for this binding.
    last_bitrate: Option<u64>,
}

impl EngineBinding {
    pub(crate) fn new() -> Self {
        Self {
            current: false,
            epoch: 0,
            dash: None,
            hls_registered: false,
            last_bitrate: None,
        }
    }

    pub(crate) fn is_current(&self) -> bool {
        self.current
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn dash_engine(&self) -> Option<Arc<dyn DashEngine>> {
        self.dash.clone()
    }

    pub(crate) fn hls_registered(&self) -> bool {
        self.hls_registered
    }

    /// Engine present, no adaptive backend: nothing to observe.
    pub(crate) fn set_progressive(&mut self) {
        self.current = true;
    }

    pub(crate) fn install_dash(&mut self, engine: Arc<dyn DashEngine>) {
        self.dash = Some(engine);
        self.epoch += 1;
        self.last_bitrate = None;
        self.current = true;
    }

    pub(crate) fn install_hls(&mut self) {
        self.hls_registered = true;
        self.current = true;
    }

    pub(crate) fn clear_hls(&mut self) {
        self.hls_registered = false;
    }

    /// Drop the DASH side of the binding so the old engine's events can
    /// never be observed again.
    pub(crate) fn clear_dash(&mut self) {
        if self.dash.take().is_some() {
            self.epoch += 1;
        }
        self.last_bitrate = None;
    }

    pub(crate) fn mark_stale(&mut self) {
        self.current = false;
    }

    /// Record a newly computed aggregate bitrate. Returns `Some` only
    /// when a rendition change should surface: the aggregate is non-zero
    /// and differs from the last recorded value for this binding.
    pub(crate) fn observe_bitrate(&mut self, bitrate: u64) -> Option<u64> {
        if bitrate == 0 || Some(bitrate) == self.last_bitrate {
            return None;
        }
        self.last_bitrate = Some(bitrate);
        Some(bitrate)
    }
}

/// Aggregate bitrate: sum of bandwidth over the active variant tracks.
pub(crate) fn aggregate_bitrate(tracks: &[VariantTrack]) -> u64 {
    tracks
        .iter()
        .filter(|track| track.active)
        .map(|track| track.bandwidth)
        .sum()
}

/// Canonical request class for a completed fetch, when the engine's
/// request type maps onto one.
pub(crate) fn classify_request(request_type: DashRequestType) -> Option<&'static str> {
    match request_type {
        DashRequestType::Manifest => Some("manifest"),
        DashRequestType::Segment => Some("media"),
        _ => None,
    }
}

/// Hostname component of a request URI.
pub(crate) fn request_hostname(uri: &str) -> Option<String> {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
}

/// Payload for a completed network fetch. `None` when the response must
/// not surface: served from cache, or an unclassified request type.
pub(crate) fn request_completed_data(response: &NetworkResponse) -> Option<EventData> {
    if response.from_cache {
        return None;
    }
    let request_type = classify_request(response.request_type)?;

    let request_start = response
        .duration_ms
        .map(|duration| response.finished_at_ms - duration.round() as i64);

    Some(EventData {
        request_bytes_loaded: Some(response.bytes_loaded),
        request_hostname: request_hostname(&response.uri),
        request_response_headers: Some(response.headers.clone()),
        request_type: Some(request_type.to_string()),
        request_start,
        request_response_end: Some(response.finished_at_ms),
        ..Default::default()
    })
}

/// Payload for an engine fault. `None` when the fault must be swallowed:
/// recoverable severity, or the generic video-element error already
/// reported through the core error path.
pub(crate) fn request_failed_data(engine: &dyn DashEngine, error: &EngineError) -> Option<EventData> {
    if error.severity == DashErrorSeverity::Recoverable {
        return None;
    }

    let code_label = engine.error_code_label(error.code);
    if code_label.as_deref() == Some("VIDEO_ERROR") {
        return None;
    }

    let category_label = engine
        .error_category_label(error.category)
        .unwrap_or_else(|| error.category.to_string());
    let request_error = code_label.unwrap_or_else(|| category_label.clone());
    let request_error_text = error
        .message
        .clone()
        .unwrap_or_else(|| format!("Category: {category_label}"));

    Some(EventData {
        request_start: Some(Utc::now().timestamp_millis()),
        request_error: Some(request_error),
        request_error_code: Some(error.code),
        request_error_text: Some(request_error_text),
        ..Default::default()
    })
}

impl SessionState {
    /// Re-derive the binding against the engine currently backing
    /// playback. Runs on every emission; a no-op while the binding is
    /// current.
    pub(crate) fn refresh_binding(&mut self) {
        if self.binding.is_current() {
            return;
        }

        match self.player.active_engine() {
            // engine not constructed yet; retry on the next emission
            ActiveEngine::Pending => {}
            ActiveEngine::None => self.binding.set_progressive(),
            ActiveEngine::Dash(engine) => {
                debug!(session_id = %self.session_id, "Binding DASH engine observers");
                self.binding.install_dash(engine);
            }
            ActiveEngine::Hls(engine) => {
                debug!(session_id = %self.session_id, "Registering HLS engine with collector");
                self.collector
                    .add_hls_instrumentation(&self.session_id, engine);
                self.binding.install_hls();
            }
        }
    }

    /// Tear down the binding ahead of an engine swap. The HLS side must
    /// be deregistered from the collector; the DASH subscription is
    /// dropped so a disposed engine can never deliver again.
    pub(crate) fn invalidate_binding(&mut self) {
        if self.binding.hls_registered() {
            self.collector.remove_hls_instrumentation(&self.session_id);
            self.binding.clear_hls();
        }
        self.binding.clear_dash();
        self.binding.mark_stale();
    }

    pub(crate) fn on_dash_event(&mut self, event: DashEvent) {
        match event {
            DashEvent::Adaptation | DashEvent::VariantChanged => self.fire_rendition_change(),
            DashEvent::ResponseCompleted(response) => self.on_engine_response(response),
            DashEvent::Error(error) => self.on_engine_error(error),
        }
    }

    fn fire_rendition_change(&mut self) {
        if !self.gate.is_ready() {
            return;
        }
        let Some(engine) = self.binding.dash_engine() else {
            return;
        };

        let bitrate = aggregate_bitrate(&engine.variant_tracks());
        let Some(bitrate) = self.binding.observe_bitrate(bitrate) else {
            return;
        };

        let stats = engine.stats();
        self.emit(
            EventKind::RenditionChange,
            EventData {
                video_source_bitrate: Some(bitrate),
                video_source_width: stats.width,
                video_source_height: stats.height,
                ..Default::default()
            },
        );
    }

    fn on_engine_response(&mut self, response: NetworkResponse) {
        if !self.gate.is_ready() {
            return;
        }
        if let Some(data) = request_completed_data(&response) {
            self.emit(EventKind::RequestCompleted, data);
        }
    }

    fn on_engine_error(&mut self, error: EngineError) {
        if !self.gate.is_ready() {
            return;
        }
        let Some(engine) = self.binding.dash_engine() else {
            return;
        };
        if let Some(data) = request_failed_data(engine.as_ref(), &error) {
            self.emit(EventKind::RequestFailed, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::EngineStats;
    use std::collections::HashMap;
    use tokio::sync::broadcast;

    struct StubDash {
        events: broadcast::Sender<DashEvent>,
    }

    impl StubDash {
        fn new() -> Self {
            let (events, _) = broadcast::channel(16);
            Self { events }
        }
    }

    impl DashEngine for StubDash {
        fn variant_tracks(&self) -> Vec<VariantTrack> {
            Vec::new()
        }

        fn stats(&self) -> EngineStats {
            EngineStats::default()
        }

        fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
            self.events.subscribe()
        }

        fn error_code_label(&self, code: u32) -> Option<String> {
            match code {
                3016 => Some("VIDEO_ERROR".into()),
                1002 => Some("HTTP_ERROR".into()),
                _ => None,
            }
        }

        fn error_category_label(&self, category: u32) -> Option<String> {
            match category {
                1 => Some("NETWORK".into()),
                _ => None,
            }
        }
    }

    fn response(request_type: DashRequestType, from_cache: bool) -> NetworkResponse {
        NetworkResponse {
            uri: "https://cdn.example.com/video/seg-42.m4s".into(),
            request_type,
            from_cache,
            bytes_loaded: 65536,
            headers: HashMap::from([("content-type".to_string(), "video/mp4".to_string())]),
            duration_ms: Some(120.0),
            finished_at_ms: 1_700_000_120,
        }
    }

    #[test]
    fn test_aggregate_bitrate_sums_active_tracks() {
        let tracks = [
            VariantTrack {
                active: true,
                bandwidth: 300_000,
            },
            VariantTrack {
                active: false,
                bandwidth: 900_000,
            },
            VariantTrack {
                active: true,
                bandwidth: 200_000,
            },
        ];
        assert_eq!(aggregate_bitrate(&tracks), 500_000);
        assert_eq!(aggregate_bitrate(&[]), 0);
    }

    #[test]
    fn test_observe_bitrate_suppresses_zero_and_repeats() {
        let mut binding = EngineBinding::new();

        let observed: Vec<_> = [0, 500_000, 500_000, 480_000]
            .into_iter()
            .filter_map(|bitrate| binding.observe_bitrate(bitrate))
            .collect();

        assert_eq!(observed, vec![500_000, 480_000]);
    }

    #[test]
    fn test_observe_bitrate_resets_with_binding() {
        let mut binding = EngineBinding::new();
        assert_eq!(binding.observe_bitrate(500_000), Some(500_000));

        binding.clear_dash();
        binding.install_dash(Arc::new(StubDash::new()));

        // same aggregate fires again for a fresh binding
        assert_eq!(binding.observe_bitrate(500_000), Some(500_000));
    }

    #[test]
    fn test_classify_request() {
        assert_eq!(classify_request(DashRequestType::Manifest), Some("manifest"));
        assert_eq!(classify_request(DashRequestType::Segment), Some("media"));
        assert_eq!(classify_request(DashRequestType::License), None);
        assert_eq!(classify_request(DashRequestType::Unknown), None);
    }

    #[test]
    fn test_request_hostname() {
        assert_eq!(
            request_hostname("https://cdn.example.com/video/seg.m4s").as_deref(),
            Some("cdn.example.com")
        );
        assert_eq!(request_hostname("not a uri"), None);
    }

    #[test]
    fn test_request_completed_data() {
        let data = request_completed_data(&response(DashRequestType::Segment, false)).unwrap();

        assert_eq!(data.request_type.as_deref(), Some("media"));
        assert_eq!(data.request_hostname.as_deref(), Some("cdn.example.com"));
        assert_eq!(data.request_bytes_loaded, Some(65536));
        assert_eq!(data.request_response_end, Some(1_700_000_120));
        assert_eq!(data.request_start, Some(1_700_000_000));
    }

    #[test]
    fn test_request_completed_skips_cache_hits() {
        assert!(request_completed_data(&response(DashRequestType::Segment, true)).is_none());
    }

    #[test]
    fn test_request_completed_skips_unclassified_types() {
        assert!(request_completed_data(&response(DashRequestType::License, false)).is_none());
        assert!(request_completed_data(&response(DashRequestType::Unknown, false)).is_none());
    }

    #[test]
    fn test_request_failed_swallows_recoverable() {
        let engine = StubDash::new();
        let error = EngineError {
            severity: DashErrorSeverity::Recoverable,
            category: 1,
            code: 1002,
            message: None,
        };
        assert!(request_failed_data(&engine, &error).is_none());
    }

    #[test]
    fn test_request_failed_swallows_video_error() {
        let engine = StubDash::new();
        let error = EngineError {
            severity: DashErrorSeverity::Critical,
            category: 3,
            code: 3016,
            message: Some("video element failed".into()),
        };
        assert!(request_failed_data(&engine, &error).is_none());
    }

    #[test]
    fn test_request_failed_classifies_fatal_errors() {
        let engine = StubDash::new();
        let error = EngineError {
            severity: DashErrorSeverity::Critical,
            category: 1,
            code: 1002,
            message: None,
        };

        let data = request_failed_data(&engine, &error).unwrap();
        assert_eq!(data.request_error.as_deref(), Some("HTTP_ERROR"));
        assert_eq!(data.request_error_code, Some(1002));
        assert_eq!(data.request_error_text.as_deref(), Some("Category: NETWORK"));
        assert!(data.request_start.is_some());
    }

    #[test]
    fn test_request_failed_keeps_engine_message() {
        let engine = StubDash::new();
        let error = EngineError {
            severity: DashErrorSeverity::Critical,
            category: 9,
            code: 77,
            message: Some("segment fetch refused".into()),
        };

        let data = request_failed_data(&engine, &error).unwrap();
        // unknown enumeration entries fall back to the raw category
        assert_eq!(data.request_error.as_deref(), Some("9"));
        assert_eq!(
            data.request_error_text.as_deref(),
            Some("segment fetch refused")
        );
    }
}
