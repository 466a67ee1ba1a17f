//! FIFO queue entries for actions and client events.

use serde_json::Value as Json;
use tokio::sync::oneshot;

use crate::ids::{ClientID, PlayerID, SessionID};
use crate::land::keeper::ActionError;
use crate::resolver::ResolverOutputs;

/// An action waiting for the next tick boundary. Resolver outputs were
/// already collected before enqueue.
pub struct QueuedAction {
    pub seq: u64,
    pub type_identifier: String,
    pub payload: Json,
    pub resolver_outputs: ResolverOutputs,
    pub player: PlayerID,
    pub client: ClientID,
    pub session: SessionID,
    pub response_tx: Option<oneshot::Sender<Result<Json, ActionError>>>,
}

pub struct QueuedClientEvent {
    pub type_identifier: String,
    pub payload: Json,
    pub player: Option<PlayerID>,
    pub client: Option<ClientID>,
    pub session: Option<SessionID>,
}
