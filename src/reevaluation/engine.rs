//! `ReevaluationEngine` — replays a recorded log against a fresh initial
//! state and checks that every recorded tick hash reproduces byte-for-byte.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::{ReplayCompatibilityError, ReplayDivergence};
use crate::ids::{ClientID, PlayerID, SessionID};
use crate::land::keeper::{LandKeeper, Mode};
use crate::land::LandDefinition;
use crate::reevaluation::recorder::{ReevaluationRecord, ReevaluationRecorder};
use crate::resolver::ResolverOutputs;
use crate::snapshot::StateSnapshot;
use crate::sync::engine::SyncEngine;
use crate::sync::StateNode;
use crate::transport::{ReevaluationOutputMode, ReevaluationSink, ServerEvent};

/// Per-land-type hook converting a step's broadcast snapshot into a
/// domain-friendly JSON shape for tooling.
/// Optional — `NoopProjector` is the default when no domain shape is needed.
pub trait Projector<S>: Send + Sync {
    fn project(&self, state: &S, snapshot: &StateSnapshot) -> Result<Json, String>;
}

/// Passes the broadcast snapshot through unchanged. The default when a land
/// type registers no domain projector.
pub struct NoopProjector;

impl<S> Projector<S> for NoopProjector {
    fn project(&self, _state: &S, snapshot: &StateSnapshot) -> Result<Json, String> {
        Ok(Json::from(crate::snapshot::SnapshotValue::Object(snapshot.clone())))
    }
}

/// Result of replaying one recorded tick.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub tick_id: i64,
    pub computed_hash: Option<u32>,
    pub recorded_hash: Option<u32>,
    pub is_match: bool,
    pub projected_state: Json,
}

/// Outcome of a full `ReevaluationEngine::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Permanent: a later `Completed` signal must never overwrite this.
    Failed,
}

pub struct RunResult {
    pub status: RunStatus,
    pub max_tick_id: i64,
    pub steps: Vec<StepResult>,
}

impl RunResult {
    pub fn tick_hashes(&self) -> Vec<(i64, Option<u32>)> {
        self.steps.iter().map(|s| (s.tick_id, s.computed_hash)).collect()
    }

    pub fn recorded_state_hashes(&self) -> Vec<(i64, Option<u32>)> {
        self.steps.iter().map(|s| (s.tick_id, s.recorded_hash)).collect()
    }

    pub fn all_matched(&self) -> bool {
        self.steps.iter().all(|s| s.is_match)
    }

    /// Every step where both hashes were computable but disagreed.
    pub fn divergences(&self) -> Vec<ReplayDivergence> {
        self.steps
            .iter()
            .filter_map(|s| match (s.computed_hash, s.recorded_hash) {
                (Some(computed), Some(recorded)) if computed != recorded => {
                    Some(ReplayDivergence { tick_id: s.tick_id, computed_hash: computed, recorded_hash: recorded })
                }
                _ => None,
            })
            .collect()
    }
}

pub struct RunOptions<S> {
    pub output_mode: ReevaluationOutputMode,
    pub stop_on_first_divergence: bool,
    pub projector: Arc<dyn Projector<S>>,
    pub sink: Option<Arc<dyn ReevaluationSink>>,
    pub transport: Option<Arc<dyn crate::transport::Transport>>,
}

impl<S> Default for RunOptions<S> {
    fn default() -> Self {
        Self {
            output_mode: ReevaluationOutputMode::default(),
            stop_on_first_divergence: false,
            projector: Arc::new(NoopProjector),
            sink: None,
            transport: None,
        }
    }
}

impl<S> RunOptions<S> {
    /// Seeds `output_mode`/`stop_on_first_divergence` from a deserialized
    /// [`crate::config::ReevaluationSettings`]; collaborators (`projector`,
    /// `sink`, `transport`) still default and can be overridden afterward.
    pub fn from_settings(settings: crate::config::ReevaluationSettings) -> Self {
        Self { output_mode: settings.output_mode, stop_on_first_divergence: settings.stop_on_first_divergence, ..Self::default() }
    }
}

pub struct ReevaluationEngine;

impl ReevaluationEngine {
    /// Opens the record at `record_path`, verifies it is compatible with
    /// `definition`, then replays every frame against `initial_state`.
    pub fn run<S: StateNode + Clone + 'static>(
        definition: Arc<LandDefinition<S>>,
        initial_state: S,
        record_path: impl AsRef<Path>,
        options: RunOptions<S>,
    ) -> Result<RunResult, ReplayCompatibilityError> {
        let record = ReevaluationRecorder::load(record_path)
            .map_err(|_| ReplayCompatibilityError::SchemaMismatch {
                recorded: None,
                expected: definition.land_definition_id.clone(),
            })?;
        Self::run_record(definition, initial_state, &record, options)
    }

    pub fn run_record<S: StateNode + Clone + 'static>(
        definition: Arc<LandDefinition<S>>,
        initial_state: S,
        record: &ReevaluationRecord,
        options: RunOptions<S>,
    ) -> Result<RunResult, ReplayCompatibilityError> {
        verify_compatibility(definition.land_type, &definition.land_definition_id, record)?;

        let mut keeper = LandKeeper::new(Arc::clone(&definition), initial_state, Mode::Reevaluation);
        let mut steps = Vec::new();
        let mut status = RunStatus::Completed;

        for frame in &record.frames {
            for lifecycle in &frame.lifecycle_events {
                keeper.apply_lifecycle_event(lifecycle.clone());
            }

            for action in &frame.actions {
                let resolver_outputs = ResolverOutputs(action.resolver_outputs.clone());
                keeper.enqueue_recorded_action(
                    action.seq,
                    action.type_identifier.clone(),
                    action.payload.clone(),
                    resolver_outputs,
                    action.player.clone().unwrap_or_else(|| PlayerID::new("")),
                    action.client.clone().unwrap_or_else(|| ClientID::new("")),
                    action.session.clone().unwrap_or_else(|| SessionID::new("")),
                );
            }

            for event in &frame.client_events {
                keeper.enqueue_recorded_client_event(
                    event.type_identifier.clone(),
                    event.payload.clone(),
                    event.player.clone(),
                    event.client.clone(),
                    event.session.clone(),
                );
            }

            let produced = keeper.step_tick_once();

            let computed_hash = produced.state_hash;
            let recorded_hash = frame.state_hash;
            let is_match = computed_hash == recorded_hash;

            if let Some(events) = &produced.server_events {
                dispatch_replayed_events(&options, produced.tick_id, events);
            }

            let snapshot = match SyncEngine::extract_broadcast_snapshot(keeper.current_state()) {
                Ok(snapshot) => snapshot,
                Err(_) => StateSnapshot::new(),
            };

            let projected_state = match options.projector.project(keeper.current_state(), &snapshot) {
                Ok(json) => json,
                Err(reason) => {
                    log::error!("reevaluation projector failed at tick {}: {reason}", frame.tick_id);
                    status = RunStatus::Failed;
                    steps.push(StepResult {
                        tick_id: frame.tick_id,
                        computed_hash,
                        recorded_hash,
                        is_match,
                        projected_state: Json::Null,
                    });
                    return Ok(RunResult { status, max_tick_id: record.max_tick_id(), steps });
                }
            };

            steps.push(StepResult { tick_id: frame.tick_id, computed_hash, recorded_hash, is_match, projected_state });

            if !is_match {
                log::warn!(
                    "reevaluation divergence at tick {}: computed {:?} != recorded {:?}",
                    frame.tick_id,
                    computed_hash,
                    recorded_hash
                );
                if options.stop_on_first_divergence {
                    break;
                }
            }
        }

        Ok(RunResult { status, max_tick_id: record.max_tick_id(), steps })
    }
}

fn dispatch_replayed_events<S>(
    options: &RunOptions<S>,
    tick_id: i64,
    recorded: &[crate::reevaluation::recorder::RecordedServerEvent],
) {
    let events: Vec<ServerEvent> = recorded
        .iter()
        .map(|e| ServerEvent {
            type_identifier: e.type_identifier.clone(),
            payload: e.payload.clone(),
            target: e.target.clone(),
            sequence: e.seq,
            tick_id: e.tick_id,
        })
        .collect();

    if let Some(sink) = &options.sink {
        sink.on_emitted_server_events(tick_id, events.clone());
    }
    if options.output_mode == ReevaluationOutputMode::TransportAndSink {
        if let Some(transport) = &options.transport {
            for event in events {
                transport.send_event(event);
            }
        }
    }
}

/// `landType`, `landDefinitionID`, and record `version` must all agree with
/// the requested definition; a missing `landDefinitionID` is itself a
/// `SchemaMismatch` (strict).
fn verify_compatibility(
    land_type: &str,
    land_definition_id: &str,
    record: &ReevaluationRecord,
) -> Result<(), ReplayCompatibilityError> {
    if record.metadata.land_type != land_type {
        return Err(ReplayCompatibilityError::LandTypeMismatch {
            recorded: record.metadata.land_type.clone(),
            expected: land_type.to_string(),
        });
    }
    if record.metadata.land_definition_id != land_definition_id {
        return Err(ReplayCompatibilityError::SchemaMismatch {
            recorded: Some(record.metadata.land_definition_id.clone()),
            expected: land_definition_id.to_string(),
        });
    }
    if record.metadata.record_format_version != crate::reevaluation::recorder::RECORD_FORMAT_VERSION {
        return Err(ReplayCompatibilityError::RecordVersionMismatch {
            recorded: record.metadata.record_format_version.clone(),
            expected: crate::reevaluation::recorder::RECORD_FORMAT_VERSION.to_string(),
        });
    }
    Ok(())
}
