//! End-to-end scenarios driven entirely through the crate's public API:
//! action submission through tick processing and sync diffing, per-player
//! and masked visibility policies, and live-vs-replay hash parity.
//! Deterministic: every test drives `step_tick_once()` directly rather than
//! relying on wall-clock tick timers.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use landkeeper::ids::{ClientID, PlayerID, SessionID};
use landkeeper::land::{LandDefinition, LandKeeper, Mode};
use landkeeper::reevaluation::recorder::ReevaluationRecordMetadata;
use landkeeper::reevaluation::{ReevaluationEngine, RunOptions, RunStatus};
use landkeeper::snapshot::{PatchOp, SnapshotValue, StatePatch, SyncUpdate};
use landkeeper::sync::{FieldMeta, FieldValue, StateNode, SyncPolicy};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn triple(name: &str) -> (PlayerID, ClientID, SessionID) {
    (PlayerID::new(name), ClientID::new(format!("{name}-client")), SessionID::new(format!("{name}-session")))
}

// ---------------------------------------------------------------------
// S1: Action -> tick -> sync
// ---------------------------------------------------------------------

#[derive(Clone, Default)]
struct CounterState {
    count: i64,
    dirty: bool,
}

fn counter_fields() -> &'static [FieldMeta] {
    static FIELDS: OnceLock<Vec<FieldMeta>> = OnceLock::new();
    FIELDS.get_or_init(|| vec![FieldMeta { name: "count", policy: SyncPolicy::Broadcast }])
}

impl StateNode for CounterState {
    fn type_name(&self) -> &'static str {
        "Counter"
    }
    fn fields(&self) -> &[FieldMeta] {
        counter_fields()
    }
    fn field_value(&self, _name: &str) -> FieldValue<'_> {
        FieldValue::Leaf(SnapshotValue::Int(self.count))
    }
    fn is_field_dirty(&self, _name: &str) -> bool {
        self.dirty
    }
    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

fn counter_definition() -> Arc<LandDefinition<CounterState>> {
    Arc::new(
        LandDefinition::builder("arena", "arena-v1")
            .register_action(
                "Increment",
                |_ctx, state: &mut CounterState, payload| {
                    let amount = payload.get("amount").and_then(serde_json::Value::as_i64).unwrap_or(0);
                    state.count += amount;
                    state.dirty = true;
                    Ok(serde_json::json!({ "count": state.count }))
                },
                vec![],
            )
            .register_client_event("Add", |_ctx, state: &mut CounterState, payload| {
                let amount = payload.get("amount").and_then(serde_json::Value::as_i64).unwrap_or(0);
                state.count += amount;
                state.dirty = true;
            })
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn s1_action_tick_sync() {
    init_logging();
    let mut keeper = LandKeeper::new(counter_definition(), CounterState::default(), Mode::Live);
    let (player, client, session) = triple("alice");
    keeper.join(player.clone(), client.clone(), session.clone()).unwrap();

    let rx = keeper
        .handle_action("Increment", serde_json::json!({ "amount": 5 }), player.clone(), client, session)
        .await
        .unwrap();

    // Before tick: state unchanged.
    assert_eq!(keeper.current_state().count, 0);

    let frame = keeper.step_tick_once();
    assert_eq!(keeper.current_state().count, 5);
    assert_eq!(frame.state_hash, Some(landkeeper::hash::state_hash(&BTreeMap::from([(
        "count".to_string(),
        SnapshotValue::Int(5),
    )]))));

    let response = rx.await.unwrap().unwrap();
    assert_eq!(response, serde_json::json!({ "count": 5 }));
}

// ---------------------------------------------------------------------
// S2: Per-player visibility
// ---------------------------------------------------------------------

#[derive(Clone, Default)]
struct PerPlayerState {
    values: BTreeMap<String, String>,
    dirty: bool,
}

fn per_player_fields() -> &'static [FieldMeta] {
    static FIELDS: OnceLock<Vec<FieldMeta>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        vec![FieldMeta {
            name: "perPlayerField",
            policy: SyncPolicy::per_player(|raw, observer| {
                raw.as_object()?.get(observer.as_str()).cloned().map(|v| {
                    SnapshotValue::object([(observer.as_str().to_string(), v)])
                })
            }),
        }]
    })
}

impl StateNode for PerPlayerState {
    fn type_name(&self) -> &'static str {
        "PerPlayer"
    }
    fn fields(&self) -> &[FieldMeta] {
        per_player_fields()
    }
    fn field_value(&self, _name: &str) -> FieldValue<'_> {
        FieldValue::Leaf(SnapshotValue::object(
            self.values.iter().map(|(k, v)| (k.clone(), SnapshotValue::String(v.clone()))),
        ))
    }
    fn is_field_dirty(&self, _name: &str) -> bool {
        self.dirty
    }
    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[test]
fn s2_per_player_visibility() {
    init_logging();
    let mut engine = landkeeper::sync::engine::SyncEngine::new();
    let state =
        PerPlayerState { values: BTreeMap::from([("alice".into(), "X".into()), ("bob".into(), "Y".into())]), dirty: true };

    let alice = PlayerID::new("alice");
    let bob = PlayerID::new("bob");
    let carol = PlayerID::new("carol");

    let alice_first = engine.generate_diff(&alice, &state, true).unwrap();
    assert_eq!(
        alice_first,
        SyncUpdate::FirstSync(vec![StatePatch::set(
            "/perPlayerField",
            SnapshotValue::object([("alice".to_string(), SnapshotValue::String("X".into()))])
        )])
    );

    let bob_first = engine.generate_diff(&bob, &state, true).unwrap();
    assert_eq!(
        bob_first,
        SyncUpdate::FirstSync(vec![StatePatch::set(
            "/perPlayerField",
            SnapshotValue::object([("bob".to_string(), SnapshotValue::String("Y".into()))])
        )])
    );

    let carol_first = engine.generate_diff(&carol, &state, true).unwrap();
    assert_eq!(carol_first, SyncUpdate::FirstSync(vec![]));
}

// ---------------------------------------------------------------------
// S3: Masked policy
// ---------------------------------------------------------------------

#[derive(Clone)]
struct MaskedState {
    secret: String,
    dirty: bool,
}

fn masked_fields() -> &'static [FieldMeta] {
    static FIELDS: OnceLock<Vec<FieldMeta>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        vec![FieldMeta {
            name: "maskedField",
            policy: SyncPolicy::masked(|raw| {
                let s = match raw {
                    SnapshotValue::String(s) => s.as_str(),
                    _ => "",
                };
                let prefix: String = s.chars().take(3).collect();
                SnapshotValue::String(format!("{prefix}..."))
            }),
        }]
    })
}

impl StateNode for MaskedState {
    fn type_name(&self) -> &'static str {
        "Masked"
    }
    fn fields(&self) -> &[FieldMeta] {
        masked_fields()
    }
    fn field_value(&self, _name: &str) -> FieldValue<'_> {
        FieldValue::Leaf(SnapshotValue::String(self.secret.clone()))
    }
    fn is_field_dirty(&self, _name: &str) -> bool {
        self.dirty
    }
    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[test]
fn s3_masked_policy_is_identical_for_every_observer() {
    init_logging();
    let mut engine = landkeeper::sync::engine::SyncEngine::new();
    let state = MaskedState { secret: "very_secret".into(), dirty: true };

    let alice = engine.generate_diff(&PlayerID::new("alice"), &state, true).unwrap();
    assert_eq!(alice, SyncUpdate::FirstSync(vec![StatePatch::set("/maskedField", SnapshotValue::String("ver...".into()))]));

    let mut engine2 = landkeeper::sync::engine::SyncEngine::new();
    let empty = MaskedState { secret: String::new(), dirty: true };
    let bob = engine2.generate_diff(&PlayerID::new("bob"), &empty, true).unwrap();
    assert_eq!(bob, SyncUpdate::FirstSync(vec![StatePatch::set("/maskedField", SnapshotValue::String("...".into()))]));
}

// ---------------------------------------------------------------------
// S5: Live -> replay parity
// ---------------------------------------------------------------------

fn seeded_metadata(seed: u64) -> ReevaluationRecordMetadata {
    ReevaluationRecordMetadata {
        land_id: "land-1".into(),
        land_type: "arena".into(),
        created_at_unix_ms: 0,
        land_definition_id: "arena-v1".into(),
        initial_state_hash: None,
        land_config: serde_json::Value::Null,
        rng_seed: seed,
        rule_variant_id: None,
        record_format_version: landkeeper::reevaluation::recorder::RECORD_FORMAT_VERSION.to_string(),
        extensions: BTreeMap::new(),
    }
}

#[tokio::test]
async fn s5_live_then_replay_parity() {
    init_logging();
    let definition = counter_definition();
    let mut keeper = LandKeeper::new(Arc::clone(&definition), CounterState::default(), Mode::Live);
    keeper.enable_recording(seeded_metadata(42));

    let (player, client, session) = triple("alice");
    keeper.join(player.clone(), client.clone(), session.clone()).unwrap();

    let rx1 = keeper
        .handle_action("Increment", serde_json::json!({ "amount": 1 }), player.clone(), client.clone(), session.clone())
        .await
        .unwrap();
    keeper.step_tick_once();
    rx1.await.unwrap().unwrap();

    keeper
        .handle_client_event_envelope(
            landkeeper::transport::ClientEventEnvelope {
                type_identifier: "Add".into(),
                payload: serde_json::json!({ "amount": 2 }),
            },
            Some(player.clone()),
            Some(client.clone()),
            Some(session.clone()),
        )
        .unwrap();
    keeper.step_tick_once();

    let rx3 = keeper
        .handle_action("Increment", serde_json::json!({ "amount": 3 }), player, client, session)
        .await
        .unwrap();
    keeper.step_tick_once();
    rx3.await.unwrap().unwrap();

    assert_eq!(keeper.current_state().count, 6);

    let record = keeper.recorder().unwrap().to_record();
    assert_eq!(record.max_tick_id(), 3);

    let result = ReevaluationEngine::run_record(definition, CounterState::default(), &record, RunOptions::default()).unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.all_matched(), "divergences: {:?}", result.divergences());
    assert_eq!(result.max_tick_id, 3);
}

// ---------------------------------------------------------------------
// S6: Schema mismatch
// ---------------------------------------------------------------------

#[test]
fn s6_schema_mismatch_carries_offending_pair() {
    init_logging();
    let definition = counter_definition();
    let mut wrong_metadata = seeded_metadata(1);
    wrong_metadata.land_definition_id = "other-id".into();

    let record = landkeeper::reevaluation::recorder::ReevaluationRecord { metadata: wrong_metadata, frames: vec![] };

    let err = ReevaluationEngine::run_record(definition, CounterState::default(), &record, RunOptions::default()).unwrap_err();

    assert_eq!(err.code(), 2002);
    match err {
        landkeeper::error::ReplayCompatibilityError::SchemaMismatch { recorded, expected } => {
            assert_eq!(recorded.as_deref(), Some("other-id"));
            assert_eq!(expected, "arena-v1");
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

// ---------------------------------------------------------------------
// Boundary: action submitted while stopping rejects without mutation.
// ---------------------------------------------------------------------

#[tokio::test]
async fn stopped_land_rejects_actions_without_mutating_state() {
    init_logging();
    let mut keeper = LandKeeper::new(counter_definition(), CounterState::default(), Mode::Live);
    keeper.stop();

    let (player, client, session) = triple("alice");
    let err = keeper.handle_action("Increment", serde_json::json!({ "amount": 9 }), player, client, session).await;
    assert!(matches!(err, Err(landkeeper::land::ActionError::LandStopped)));
    assert_eq!(keeper.current_state().count, 0);
}

#[test]
fn zero_tick_interval_with_tick_handler_is_rejected_at_build_time() {
    let result = LandDefinition::<CounterState>::builder("arena", "arena-v1")
        .tick_interval(std::time::Duration::ZERO)
        .tick_handler(|_ctx, _state| {})
        .build();
    assert!(result.is_err());
}

#[test]
fn mapping_key_with_slash_and_tilde_is_escaped_in_patch_paths() {
    assert_eq!(landkeeper::snapshot::escape_pointer_segment("a/b~c"), "a~1b~0c");
}

#[test]
fn patch_op_variants_are_distinguishable() {
    let set = StatePatch::set("/x", SnapshotValue::Int(1));
    let delete = StatePatch::delete("/x");
    assert!(matches!(set.op, PatchOp::Set(_)));
    assert!(matches!(delete.op, PatchOp::Delete));
}
