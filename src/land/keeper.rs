//! `LandKeeper` — the single writer of one land's state.
//!
//! All mutation flows through [`LandKeeper::step_tick_once`]: actions and
//! client events enqueued between tick boundaries are drained strictly in
//! insertion order, the tick handler runs once, sync is computed per
//! observer, and (if recording is enabled) a `TickFrame` is appended.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use serde_json::Value as Json;
use tokio::sync::oneshot;

use crate::error::{DecodingError, LandKeeperError, ResolverExecutionError};
use crate::hash::state_hash;
use crate::ids::{ClientID, PlayerID, SessionID};
use crate::land::context::{LandContext, ServiceRegistry, SyncRequest, TickOutbox};
use crate::land::queue::{QueuedAction, QueuedClientEvent};
use crate::land::{AdmissionHook, AllowAll, LandDefinition};
use crate::reevaluation::recorder::{
    LifecycleEvent, RecordedAction, RecordedClientEvent, RecordedServerEvent, ReevaluationRecorder,
    TickFrame,
};
use crate::resolver::{resolve_all, ResolverOutputs};
use crate::sync::engine::SyncEngine;
use crate::sync::StateNode;
use crate::transport::{ActionEnvelope, ClientEventEnvelope, ServerEvent, Transport};

/// Live vs reevaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Reevaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Idle,
    Running,
    Stopped,
}

/// Failure surfaced to the caller of `handleAction`/`handleActionEnvelope`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    Decoding(DecodingError),
    ResolverFailed(ResolverExecutionError),
    /// The handler itself returned an error. Any state mutation performed
    /// before the throw is not rolled back.
    Handler(String),
    LandStopped,
    /// An installed `AdmissionHook` rejected the action before it reached
    /// the resolver phase.
    AdmissionRejected,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Decoding(e) => write!(f, "{e}"),
            ActionError::ResolverFailed(e) => write!(f, "{e}"),
            ActionError::Handler(reason) => write!(f, "handler error: {reason}"),
            ActionError::LandStopped => write!(f, "land keeper has stopped"),
            ActionError::AdmissionRejected => write!(f, "action rejected by admission hook"),
        }
    }
}

impl std::error::Error for ActionError {}

/// The single-writer runtime instance for one land.
pub struct LandKeeper<S: StateNode + 'static> {
    land_id: String,
    definition: Arc<LandDefinition<S>>,
    mode: Mode,
    status: Status,
    state: S,
    sync_engine: SyncEngine,
    recorder: Option<ReevaluationRecorder>,
    transport: Option<Arc<dyn Transport>>,
    sinks: Vec<Arc<dyn crate::transport::ReevaluationSink>>,
    admission_hook: Arc<dyn AdmissionHook>,
    services: ServiceRegistry,
    metadata: HashMap<String, Json>,
    observers: BTreeMap<PlayerID, (ClientID, SessionID)>,
    action_queue: VecDeque<QueuedAction>,
    client_event_queue: VecDeque<QueuedClientEvent>,
    pending_lifecycle: Vec<LifecycleEvent>,
    next_seq: u64,
    next_tick_id: i64,
    next_event_seq: u64,
}

impl<S: StateNode + 'static> LandKeeper<S> {
    pub fn new(definition: Arc<LandDefinition<S>>, initial_state: S, mode: Mode) -> Self {
        let next_tick_id = if definition.tick_interval.is_some() { 1 } else { 0 };
        Self {
            land_id: definition.land_definition_id.clone(),
            definition,
            mode,
            status: Status::Idle,
            state: initial_state,
            sync_engine: SyncEngine::new(),
            recorder: None,
            transport: None,
            sinks: Vec::new(),
            admission_hook: Arc::new(AllowAll),
            services: ServiceRegistry::default(),
            metadata: HashMap::new(),
            observers: BTreeMap::new(),
            action_queue: VecDeque::new(),
            client_event_queue: VecDeque::new(),
            pending_lifecycle: Vec::new(),
            next_seq: 0,
            next_tick_id,
            next_event_seq: 0,
        }
    }

    pub fn land_id(&self) -> &str {
        &self.land_id
    }

    pub fn set_land_id(&mut self, id: impl Into<String>) {
        self.land_id = id.into();
    }

    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    pub fn add_reevaluation_sink(&mut self, sink: Arc<dyn crate::transport::ReevaluationSink>) {
        self.sinks.push(sink);
    }

    pub fn set_admission_hook(&mut self, hook: Arc<dyn AdmissionHook>) {
        self.admission_hook = hook;
    }

    pub fn enable_recording(&mut self, metadata: crate::reevaluation::recorder::ReevaluationRecordMetadata) {
        self.recorder = Some(ReevaluationRecorder::new(metadata));
    }

    pub fn recorder(&self) -> Option<&ReevaluationRecorder> {
        self.recorder.as_ref()
    }

    pub fn services_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.services
    }

    pub fn metadata_mut(&mut self) -> &mut HashMap<String, Json> {
        &mut self.metadata
    }

    pub fn current_state(&self) -> &S {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tick_interval(&self) -> Option<std::time::Duration> {
        self.definition.tick_interval
    }

    pub fn start(&mut self) {
        if self.status == Status::Idle {
            self.status = Status::Running;
        }
    }

    /// Stops the keeper: no further actions are drained, in-flight response
    /// futures are failed with `LandStopped`, and the transport is notified.
    pub fn stop(&mut self) {
        self.status = Status::Stopped;
        while let Some(mut queued) = self.action_queue.pop_front() {
            if let Some(tx) = queued.response_tx.take() {
                let _ = tx.send(Err(ActionError::LandStopped));
            }
        }
        self.client_event_queue.clear();
        if let Some(transport) = &self.transport {
            transport.on_land_destroyed();
        }
    }

    /// Registers an observer and enqueues an `OnJoin` lifecycle event applied
    /// at the next tick boundary. Membership itself is
    /// updated immediately so mid-tick code sees the new observer.
    pub fn join(&mut self, player: PlayerID, client: ClientID, session: SessionID) -> Result<(), LandKeeperError> {
        if self.observers.contains_key(&player) {
            return Err(LandKeeperError::AlreadyJoined {
                player: player.to_string(),
                client: client.to_string(),
                session: session.to_string(),
            });
        }
        self.observers.insert(player.clone(), (client.clone(), session.clone()));
        self.pending_lifecycle.push(LifecycleEvent::Join { player, client, session });
        Ok(())
    }

    pub fn leave(&mut self, player: PlayerID) -> Result<(), LandKeeperError> {
        if self.observers.remove(&player).is_none() {
            return Err(LandKeeperError::NotJoined { player: player.to_string() });
        }
        self.sync_engine.remove_observer(&player);
        self.pending_lifecycle.push(LifecycleEvent::Leave { player });
        Ok(())
    }

    /// Runs the resolver phase (live mode only) and enqueues the action,
    /// returning a receiver that resolves when the next tick processes it.
    /// Deliberately does not await the receiver itself:
    /// this method only needs `&mut self` for the resolver phase and the
    /// enqueue, so the tick that eventually fulfills the returned receiver
    /// can be driven by a concurrent `step_tick_once` call without the two
    /// borrows overlapping.
    pub async fn handle_action(
        &mut self,
        type_identifier: impl Into<String>,
        payload: Json,
        player: PlayerID,
        client: ClientID,
        session: SessionID,
    ) -> Result<oneshot::Receiver<Result<Json, ActionError>>, ActionError> {
        if self.status == Status::Stopped {
            return Err(ActionError::LandStopped);
        }
        let type_identifier = type_identifier.into();
        if !self.admission_hook.admit(&type_identifier, &payload) {
            return Err(ActionError::AdmissionRejected);
        }
        let resolvers = self
            .definition
            .actions
            .get(&type_identifier)
            .map(|registration| registration.resolvers.clone())
            .ok_or_else(|| ActionError::Decoding(DecodingError::UnknownTypeIdentifier(type_identifier.clone())))?;

        let resolver_outputs = match self.mode {
            Mode::Live => resolve_all(&resolvers, &player, &client, &session, &payload, &self.state)
                .await
                .map_err(ActionError::ResolverFailed)?,
            Mode::Reevaluation => ResolverOutputs::default(),
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let (tx, rx) = oneshot::channel();
        self.action_queue.push_back(QueuedAction {
            seq,
            type_identifier,
            payload,
            resolver_outputs,
            player,
            client,
            session,
            response_tx: Some(tx),
        });

        Ok(rx)
    }

    pub async fn handle_action_envelope(
        &mut self,
        envelope: ActionEnvelope,
        player: PlayerID,
        client: ClientID,
        session: SessionID,
    ) -> Result<oneshot::Receiver<Result<Json, ActionError>>, ActionError> {
        self.handle_action(envelope.type_identifier, envelope.payload, player, client, session).await
    }

    /// Used only by `ReevaluationEngine`: enqueues an action with resolver
    /// outputs read verbatim from the record, bypassing the resolver phase
    /// entirely.
    pub(crate) fn enqueue_recorded_action(
        &mut self,
        seq: u64,
        type_identifier: String,
        payload: Json,
        resolver_outputs: ResolverOutputs,
        player: PlayerID,
        client: ClientID,
        session: SessionID,
    ) {
        self.action_queue.push_back(QueuedAction {
            seq,
            type_identifier,
            payload,
            resolver_outputs,
            player,
            client,
            session,
            response_tx: None,
        });
    }

    pub fn handle_client_event_envelope(
        &mut self,
        envelope: ClientEventEnvelope,
        player: Option<PlayerID>,
        client: Option<ClientID>,
        session: Option<SessionID>,
    ) -> Result<(), DecodingError> {
        if !self.definition.client_events.contains_key(&envelope.type_identifier) {
            return Err(DecodingError::UnknownTypeIdentifier(envelope.type_identifier));
        }
        self.client_event_queue.push_back(QueuedClientEvent {
            type_identifier: envelope.type_identifier,
            payload: envelope.payload,
            player,
            client,
            session,
        });
        Ok(())
    }

    pub(crate) fn enqueue_recorded_client_event(
        &mut self,
        type_identifier: String,
        payload: Json,
        player: Option<PlayerID>,
        client: Option<ClientID>,
        session: Option<SessionID>,
    ) {
        self.client_event_queue.push_back(QueuedClientEvent { type_identifier, payload, player, client, session });
    }

    pub(crate) fn apply_lifecycle_event(&mut self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::Join { player, client, session } => {
                self.observers.insert(player.clone(), (client.clone(), session.clone()));
            }
            LifecycleEvent::Leave { player } => {
                self.observers.remove(player);
                self.sync_engine.remove_observer(player);
            }
        }
        self.pending_lifecycle.push(event);
    }

    /// Synchronously executes one tick frame: drains both queues in
    /// insertion order, runs the tick handler, computes the state hash,
    /// emits per-observer sync, clears dirty bits, and appends a
    /// `TickFrame` to the recorder if one is installed.
    pub fn step_tick_once(&mut self) -> TickFrame {
        let tick_id = self.next_tick_id;
        self.next_tick_id += 1;

        let lifecycle_events = std::mem::take(&mut self.pending_lifecycle);
        let mut outbox = TickOutbox::default();
        let mut recorded_actions = Vec::new();
        let mut recorded_client_events = Vec::new();

        while let Some(mut queued) = self.action_queue.pop_front() {
            let outcome = match self.definition.actions.get(&queued.type_identifier) {
                None => Err(ActionError::Decoding(DecodingError::UnknownTypeIdentifier(queued.type_identifier.clone()))),
                Some(registration) => {
                    let handler = Arc::clone(&registration.handler);
                    let mut ctx = LandContext::new(
                        &self.land_id,
                        Some(&queued.player),
                        Some(&queued.client),
                        Some(&queued.session),
                        &self.services,
                        &self.metadata,
                        &queued.resolver_outputs,
                        &mut outbox,
                    );
                    handler(&mut ctx, &mut self.state, queued.payload.clone()).map_err(ActionError::Handler)
                }
            };

            recorded_actions.push(RecordedAction {
                seq: queued.seq,
                type_identifier: queued.type_identifier.clone(),
                payload: queued.payload.clone(),
                resolver_outputs: queued.resolver_outputs.0.clone(),
                player: Some(queued.player.clone()),
                client: Some(queued.client.clone()),
                session: Some(queued.session.clone()),
                recorded_response: outcome.as_ref().ok().cloned(),
            });

            if let Some(tx) = queued.response_tx.take() {
                let _ = tx.send(outcome);
            }
        }

        while let Some(queued) = self.client_event_queue.pop_front() {
            if let Some(registration) = self.definition.client_events.get(&queued.type_identifier) {
                let empty_outputs = ResolverOutputs::default();
                let mut ctx = LandContext::new(
                    &self.land_id,
                    queued.player.as_ref(),
                    queued.client.as_ref(),
                    queued.session.as_ref(),
                    &self.services,
                    &self.metadata,
                    &empty_outputs,
                    &mut outbox,
                );
                (registration.handler)(&mut ctx, &mut self.state, queued.payload.clone());
            }
            recorded_client_events.push(RecordedClientEvent {
                type_identifier: queued.type_identifier,
                payload: queued.payload,
                player: queued.player,
                client: queued.client,
                session: queued.session,
            });
        }

        if let Some(tick_handler) = self.definition.tick_handler.clone() {
            let empty_outputs = ResolverOutputs::default();
            let mut ctx = LandContext::new(
                &self.land_id,
                None,
                None,
                None,
                &self.services,
                &self.metadata,
                &empty_outputs,
                &mut outbox,
            );
            tick_handler(&mut ctx, &mut self.state);
        }

        let computed_hash = SyncEngine::extract_broadcast_snapshot(&self.state)
            .map(|snapshot| state_hash(&snapshot))
            .inspect_err(|err| {
                log::warn!("land {} tick {tick_id} state hash failed: {err}", self.land_id);
            })
            .ok();

        let mut server_events = Vec::new();
        for (type_identifier, payload, target) in outbox.events.drain(..) {
            let sequence = self.next_event_seq;
            self.next_event_seq += 1;
            let event = ServerEvent { type_identifier, payload, target, sequence, tick_id };

            if self.mode == Mode::Live {
                if let Some(transport) = &self.transport {
                    transport.send_event(event.clone());
                }
            }
            server_events.push(RecordedServerEvent {
                seq: event.sequence,
                tick_id,
                type_identifier: event.type_identifier,
                payload: event.payload,
                target: event.target,
            });
        }

        // Detached tasks run outside the writer context; their only path
        // back to state is through the action/event queues — never a direct mutable borrow.
        for task in outbox.spawned.drain(..) {
            tokio::task::spawn(task);
        }

        let broadcast_only = matches!(outbox.sync_request, Some(SyncRequest::BroadcastOnly));
        if self.mode == Mode::Live {
            if let Some(transport) = &self.transport {
                match outbox.sync_request {
                    Some(SyncRequest::Full) => transport.sync_now_from_transport(),
                    Some(SyncRequest::BroadcastOnly) => transport.sync_broadcast_only_from_transport(),
                    None => {}
                }
            }
        }
        for player in self.observers.keys().cloned().collect::<Vec<_>>() {
            let update = if broadcast_only {
                self.sync_engine.generate_diff_broadcast_only(&player, &self.state, true)
            } else {
                self.sync_engine.generate_diff(&player, &self.state, true)
            };
            match update {
                Ok(update) if !update.is_no_change() => {
                    if self.mode == Mode::Live {
                        if let Some(transport) = &self.transport {
                            transport.send_patches(player, update.patches().to_vec());
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("land {} tick {tick_id} sync encoding failed for {player}: {err}", self.land_id);
                }
            }
        }

        self.state.clear_dirty();

        let frame = TickFrame {
            tick_id,
            actions: recorded_actions,
            client_events: recorded_client_events,
            lifecycle_events,
            state_hash: computed_hash,
            server_events: if server_events.is_empty() { None } else { Some(server_events) },
        };

        if let Some(recorder) = &mut self.recorder {
            recorder.append(frame.clone());
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LandKeeperError;
    use crate::sync::{FieldMeta, FieldValue, SyncPolicy};
    use std::sync::OnceLock;

    #[derive(Clone, Default)]
    struct ScoreState {
        score: i64,
        dirty: bool,
    }

    fn score_fields() -> &'static [FieldMeta] {
        static FIELDS: OnceLock<Vec<FieldMeta>> = OnceLock::new();
        FIELDS.get_or_init(|| vec![FieldMeta { name: "score", policy: SyncPolicy::Broadcast }])
    }

    impl StateNode for ScoreState {
        fn type_name(&self) -> &'static str {
            "Score"
        }
        fn fields(&self) -> &[FieldMeta] {
            score_fields()
        }
        fn field_value(&self, _name: &str) -> FieldValue<'_> {
            FieldValue::Leaf(crate::snapshot::SnapshotValue::Int(self.score))
        }
        fn is_field_dirty(&self, _name: &str) -> bool {
            self.dirty
        }
        fn clear_dirty(&mut self) {
            self.dirty = false;
        }
    }

    fn score_definition() -> Arc<LandDefinition<ScoreState>> {
        Arc::new(
            LandDefinition::builder("arena", "arena-v1")
                .register_action(
                    "AddScore",
                    |_ctx, state: &mut ScoreState, payload: Json| {
                        let amount = payload.get("amount").and_then(Json::as_i64).unwrap_or(0);
                        state.score += amount;
                        state.dirty = true;
                        Ok(serde_json::json!({ "score": state.score }))
                    },
                    vec![],
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn join_then_leave_round_trips_observer_set() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        let player = PlayerID::new("alice");
        keeper.join(player.clone(), ClientID::new("c1"), SessionID::new("s1")).unwrap();
        assert_eq!(keeper.join(player.clone(), ClientID::new("c1"), SessionID::new("s1")), Err(LandKeeperError::AlreadyJoined {
            player: "alice".into(),
            client: "c1".into(),
            session: "s1".into(),
        }));
        keeper.leave(player.clone()).unwrap();
        assert_eq!(keeper.leave(player), Err(LandKeeperError::NotJoined { player: "alice".into() }));
    }

    #[tokio::test]
    async fn handle_action_receiver_resolves_once_tick_processes_it() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        let player = PlayerID::new("alice");
        keeper.join(player.clone(), ClientID::new("c1"), SessionID::new("s1")).unwrap();

        // The resolver phase for an action with no declared resolvers
        // completes immediately; handle_action returns the receiver without
        // ever needing to hold `&mut self` across the tick that fulfills it.
        let rx = keeper
            .handle_action("AddScore", serde_json::json!({ "amount": 3 }), player, ClientID::new("c1"), SessionID::new("s1"))
            .await
            .unwrap();

        let frame = keeper.step_tick_once();
        assert_eq!(frame.actions.len(), 1);

        let response = rx.await.unwrap();
        assert_eq!(response, Ok(serde_json::json!({ "score": 3 })));
    }

    #[test]
    fn step_tick_once_drains_queue_and_hashes_state() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        keeper.enqueue_recorded_action(
            0,
            "AddScore".into(),
            serde_json::json!({ "amount": 7 }),
            ResolverOutputs::default(),
            PlayerID::new("alice"),
            ClientID::new("c1"),
            SessionID::new("s1"),
        );
        let frame = keeper.step_tick_once();
        assert_eq!(frame.actions.len(), 1);
        assert_eq!(frame.actions[0].recorded_response, Some(serde_json::json!({ "score": 7 })));
        assert!(frame.state_hash.is_some());
        assert_eq!(keeper.current_state().score, 7);
    }

    #[tokio::test]
    async fn stop_fails_pending_actions_with_land_stopped() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        let (tx, rx) = oneshot::channel();
        keeper.action_queue.push_back(QueuedAction {
            seq: 0,
            type_identifier: "AddScore".into(),
            payload: Json::Null,
            resolver_outputs: ResolverOutputs::default(),
            player: PlayerID::new("alice"),
            client: ClientID::new("c1"),
            session: SessionID::new("s1"),
            response_tx: Some(tx),
        });
        keeper.stop();
        assert_eq!(rx.await.unwrap(), Err(ActionError::LandStopped));
    }

    struct RejectAll;
    impl crate::land::AdmissionHook for RejectAll {
        fn admit(&self, _type_identifier: &str, _payload: &Json) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn admission_hook_rejects_before_resolver_phase() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        keeper.set_admission_hook(Arc::new(RejectAll));
        let result = keeper
            .handle_action("AddScore", serde_json::json!({ "amount": 3 }), PlayerID::new("alice"), ClientID::new("c1"), SessionID::new("s1"))
            .await;
        assert_eq!(result.err(), Some(ActionError::AdmissionRejected));
        assert!(keeper.action_queue.is_empty());
    }

    fn dice_definition() -> Arc<LandDefinition<ScoreState>> {
        Arc::new(
            LandDefinition::builder("arena", "dice-v1")
                .register_action(
                    "RollDice",
                    |ctx, state: &mut ScoreState, _payload: Json| {
                        let rng = ctx.services.get::<crate::rng::DeterministicRng>().expect("rng service installed");
                        let roll = rng.gen_range(1i64..7);
                        state.score = roll;
                        state.dirty = true;
                        Ok(serde_json::json!({ "roll": roll }))
                    },
                    vec![],
                )
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn deterministic_rng_installed_as_a_service_is_reachable_from_a_handler() {
        let mut keeper = LandKeeper::new(dice_definition(), ScoreState::default(), Mode::Live);
        keeper.services_mut().insert(crate::rng::DeterministicRng::from_seed(42));
        let player = PlayerID::new("alice");

        let rx = keeper
            .handle_action("RollDice", serde_json::json!({}), player, ClientID::new("c1"), SessionID::new("s1"))
            .await
            .unwrap();
        keeper.step_tick_once();
        let response = rx.await.unwrap().unwrap();
        let roll = response.get("roll").and_then(Json::as_i64).unwrap();
        assert!((1..7).contains(&roll));
    }

    #[derive(Default)]
    struct RecordingTransport {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl crate::transport::Transport for RecordingTransport {
        fn send_event(&self, _event: crate::transport::ServerEvent) {}
        fn send_patches(&self, _player: PlayerID, _patches: Vec<crate::snapshot::StatePatch>) {}
        fn sync_now_from_transport(&self) {
            self.calls.lock().unwrap().push("sync_now");
        }
        fn sync_broadcast_only_from_transport(&self) {
            self.calls.lock().unwrap().push("sync_broadcast_only");
        }
    }

    fn sync_now_definition() -> Arc<LandDefinition<ScoreState>> {
        Arc::new(
            LandDefinition::builder("arena", "sync-now-v1")
                .register_action(
                    "RequestSync",
                    |ctx, _state: &mut ScoreState, _payload: Json| {
                        ctx.sync_now();
                        Ok(Json::Null)
                    },
                    vec![],
                )
                .register_action(
                    "RequestBroadcastOnlySync",
                    |ctx, _state: &mut ScoreState, _payload: Json| {
                        ctx.sync_broadcast_only();
                        Ok(Json::Null)
                    },
                    vec![],
                )
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn handler_requested_sync_now_notifies_the_transport() {
        let mut keeper = LandKeeper::new(sync_now_definition(), ScoreState::default(), Mode::Live);
        let transport = Arc::new(RecordingTransport::default());
        keeper.set_transport(transport.clone());

        keeper
            .handle_action("RequestSync", Json::Null, PlayerID::new("alice"), ClientID::new("c1"), SessionID::new("s1"))
            .await
            .unwrap();
        keeper.step_tick_once();

        assert_eq!(*transport.calls.lock().unwrap(), vec!["sync_now"]);
    }

    #[tokio::test]
    async fn handler_requested_broadcast_only_sync_notifies_the_transport() {
        let mut keeper = LandKeeper::new(sync_now_definition(), ScoreState::default(), Mode::Live);
        let transport = Arc::new(RecordingTransport::default());
        keeper.set_transport(transport.clone());

        keeper
            .handle_action(
                "RequestBroadcastOnlySync",
                Json::Null,
                PlayerID::new("alice"),
                ClientID::new("c1"),
                SessionID::new("s1"),
            )
            .await
            .unwrap();
        keeper.step_tick_once();

        assert_eq!(*transport.calls.lock().unwrap(), vec!["sync_broadcast_only"]);
    }

    #[tokio::test]
    async fn no_sync_request_means_no_transport_notification() {
        let mut keeper = LandKeeper::new(score_definition(), ScoreState::default(), Mode::Live);
        let transport = Arc::new(RecordingTransport::default());
        keeper.set_transport(transport.clone());

        keeper
            .handle_action("AddScore", serde_json::json!({ "amount": 1 }), PlayerID::new("alice"), ClientID::new("c1"), SessionID::new("s1"))
            .await
            .unwrap();
        keeper.step_tick_once();

        assert!(transport.calls.lock().unwrap().is_empty());
    }
}
