//! External collaborator interfaces — wire envelopes and the
//! `Transport`/`ReevaluationSink` traits the core consumes. Concrete
//! transports (WebSocket/HTTP servers) are out of scope.

use serde_json::Value as Json;

use crate::ids::EventTarget;

/// Inbound action, as received off the wire: a type identifier the runtime
/// maps to a registered payload type, plus its JSON-encoded payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActionEnvelope {
    pub type_identifier: String,
    pub payload: Json,
}

/// Inbound client event; same shape as `ActionEnvelope`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientEventEnvelope {
    pub type_identifier: String,
    pub payload: Json,
}

/// A server-originated event delivered to the transport.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerEvent {
    pub type_identifier: String,
    pub payload: Json,
    pub target: EventTarget,
    pub sequence: u64,
    pub tick_id: i64,
}

/// Fire-and-forget sink for patches and server events, plus the two
/// sync-request notifications and the final destruction signal. The
/// core never awaits acknowledgement.
pub trait Transport: Send + Sync + 'static {
    fn send_event(&self, event: ServerEvent);

    fn send_patches(&self, player: crate::ids::PlayerID, patches: Vec<crate::snapshot::StatePatch>);

    /// Called once per tick, in live mode, when a handler called
    /// `ctx.syncNow()` during that tick.
    fn sync_now_from_transport(&self) {}

    /// Called once per tick, in live mode, when a handler called
    /// `ctx.syncBroadcastOnly()` during that tick.
    fn sync_broadcast_only_from_transport(&self) {}

    fn on_land_destroyed(&self) {}
}

/// Consumed by `ReevaluationEngine::run` to receive server events emitted
/// during replay.
pub trait ReevaluationSink: Send + Sync + 'static {
    fn on_emitted_server_events(&self, tick_id: i64, events: Vec<ServerEvent>);
}

/// Controls whether replayed server events also reach the live transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReevaluationOutputMode {
    #[default]
    SinkOnly,
    TransportAndSink,
}

/// A `Transport` that discards everything; useful for tests and for
/// reevaluation runs configured with `SinkOnly`.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send_event(&self, _event: ServerEvent) {}
    fn send_patches(&self, _player: crate::ids::PlayerID, _patches: Vec<crate::snapshot::StatePatch>) {}
}
