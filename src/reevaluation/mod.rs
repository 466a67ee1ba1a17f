//! Recording and replay of a land's authoritative history.

pub mod engine;
pub mod recorder;

pub use engine::{NoopProjector, Projector, ReevaluationEngine, RunOptions, RunResult, RunStatus, StepResult};
pub use recorder::{
    LifecycleEvent, RecordedAction, RecordedClientEvent, RecordedServerEvent, ReevaluationRecord,
    ReevaluationRecordMetadata, ReevaluationRecorder, TickFrame, RECORD_FORMAT_VERSION,
};
