//! Analytics session lifecycle
//!
//! `Monitor::attach` brackets a session: one collector init up front, one
//! `destroy` at the end, and a single event-processing task in between.
//! Everything the translators share (gate, binding, player and collector
//! handles) lives on the per-session state owned by that task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binding::EngineBinding;
use crate::collector::{Collector, CollectorConfig};
use crate::events::{EventData, EventKind};
use crate::playback::PlayingMonitor;
use crate::player::{DashEvent, PlayerAdapter, PlayerEvent};
use crate::readiness::ReadinessGate;
use crate::snapshot::snapshot;
use crate::VERSION;

/// Session tuning options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorOptions {
    /// Custom metadata dimensions forwarded with the collector init call.
    /// Entries here win over the bridge's own metadata.
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,

    /// Derive `playing` from playhead progress instead of trusting the
    /// host's playing event, for hosts that fire it unreliably.
    #[serde(default)]
    pub derive_playing: bool,
}

/// Handle for one attached analytics session.
pub struct Monitor {
    destroy_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Monitor {
    /// Attach the bridge to a player and start the session.
    ///
    /// Returns `None` when the player handle cannot identify a session:
    /// a warning is logged, nothing is initialized, and nothing is ever
    /// emitted.
    pub fn attach(
        player: Arc<dyn PlayerAdapter>,
        collector: Arc<dyn Collector>,
        options: MonitorOptions,
    ) -> Option<Self> {
        let session_id = player.target_id();
        if session_id.is_empty() {
            warn!("You must provide a valid player handle to Monitor::attach");
            return None;
        }

        collector.init(&session_id, session_config(player.as_ref(), &options));
        info!(session_id = %session_id, "Analytics session attached");

        let events = player.subscribe();
        let (destroy_tx, destroy_rx) = mpsc::channel(1);

        let state = SessionState {
            session_id,
            player,
            collector,
            gate: ReadinessGate::new(),
            binding: EngineBinding::new(),
            derive_playing: options.derive_playing,
            playing_monitor: None,
        };
        let task = tokio::spawn(state.run(events, destroy_rx));

        Some(Self { destroy_tx, task })
    }

    /// End the session. Emits exactly one `destroy` event; no events are
    /// forwarded afterward.
    pub async fn destroy(self) {
        let _ = self.destroy_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Static bridge metadata merged under the caller's custom dimensions.
fn session_config(player: &dyn PlayerAdapter, options: &MonitorOptions) -> CollectorConfig {
    let mut data = options.data.clone();

    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            data.entry(key.to_string())
                .or_insert_with(|| Value::String(value));
        }
    };

    put("player_software_name", player.software_name());
    put("player_software_version", player.software_version());
    put("player_bridge_name", Some("sightline".to_string()));
    put("player_bridge_version", Some(VERSION.to_string()));

    CollectorConfig { data }
}

/// Per-session mutable state, owned by the event-processing task.
pub(crate) struct SessionState {
    pub(crate) session_id: String,
    pub(crate) player: Arc<dyn PlayerAdapter>,
    pub(crate) collector: Arc<dyn Collector>,
    pub(crate) gate: ReadinessGate,
    pub(crate) binding: EngineBinding,
    pub(crate) derive_playing: bool,
    pub(crate) playing_monitor: Option<PlayingMonitor>,
}

impl SessionState {
    /// The single event-processing loop. All translation is synchronous
    /// inside the handlers; the only awaits are the event sources
    /// themselves.
    pub(crate) async fn run(
        mut self,
        mut events: broadcast::Receiver<PlayerEvent>,
        mut destroy_rx: mpsc::Receiver<()>,
    ) {
        let ready_player = Arc::clone(&self.player);
        let mut ready_fut = Box::pin(async move { ready_player.ready().await });
        let mut ready_pending = true;

        let mut dash_rx: Option<broadcast::Receiver<DashEvent>> = None;
        let mut dash_epoch = self.binding.epoch();

        loop {
            tokio::select! {
                _ = &mut ready_fut, if ready_pending => {
                    ready_pending = false;
                    self.emit_player_ready();
                }
                event = events.recv() => match event {
                    Ok(event) => self.on_player_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            session_id = %self.session_id,
                            skipped,
                            "Player event subscription lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(session_id = %self.session_id, "Player event channel closed");
                        break;
                    }
                },
                event = recv_engine_event(&mut dash_rx) => match event {
                    Some(event) => self.on_dash_event(event),
                    None => dash_rx = None,
                },
                _ = destroy_rx.recv() => {
                    self.on_destroy();
                    break;
                }
            }

            // Re-sync the engine subscription before the next event is
            // polled: a receiver for a replaced engine must never
            // deliver.
            if dash_epoch != self.binding.epoch() {
                dash_epoch = self.binding.epoch();
                dash_rx = self.binding.dash_engine().map(|engine| engine.subscribe());
            }
        }
    }

    /// Forward one canonical event and lazily re-derive the engine
    /// binding afterwards. Engine swaps can precede the ready point, so
    /// rebinding rides on every emission rather than on readiness.
    pub(crate) fn emit(&mut self, kind: EventKind, data: EventData) {
        let mut data = data;
        data.apply_state(snapshot(self.player.as_ref()));

        debug!(session_id = %self.session_id, event = %kind, "Forwarding canonical event");
        self.collector.emit(&self.session_id, kind, data);

        self.refresh_binding();
    }

    /// Fire the readiness transition; emits `playerready` exactly once
    /// per session.
    pub(crate) fn emit_player_ready(&mut self) {
        if self.gate.mark_ready() {
            self.emit(EventKind::PlayerReady, EventData::default());
        }
    }

    fn on_destroy(&mut self) {
        self.emit(EventKind::Destroy, EventData::default());
        info!(session_id = %self.session_id, "Analytics session destroyed");
    }
}

/// Receive from the bound engine, or park forever while no engine is
/// bound. Returns `None` once the engine's channel is gone.
async fn recv_engine_event(
    rx: &mut Option<broadcast::Receiver<DashEvent>>,
) -> Option<DashEvent> {
    match rx {
        Some(rx) => loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}
