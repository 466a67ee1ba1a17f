//! An authoritative, single-writer state-tree runtime for multiplayer and
//! session services.
//!
//! Each logical **land** owns a typed state tree, a deterministic tick
//! clock, and a per-client sync stream. The runtime guarantees that:
//!
//! - all mutations to a land's state are serialized through tick processing
//!   ([`land::LandKeeper`]),
//! - each connected player receives a minimal patch stream reflecting only
//!   the fields they are allowed to observe ([`sync::engine::SyncEngine`]),
//! - the entire execution can be recorded and later re-evaluated to
//!   reproduce identical state hashes byte-for-byte
//!   ([`reevaluation::ReevaluationEngine`]).
//!
//! Transport implementations, HTTP helpers, CLI wrappers, and a
//! code-generating field-metadata DSL are external collaborators and out of
//! scope for this crate: it exposes the [`transport::Transport`] and
//! [`transport::ReevaluationSink`] interfaces they implement, never a
//! concrete transport itself.

pub mod config;
pub mod error;
pub mod hash;
pub mod ids;
pub mod land;
pub mod reevaluation;
pub mod registry;
pub mod resolver;
pub mod rng;
pub mod snapshot;
pub mod sync;
pub mod transport;

pub use ids::{ClientID, EventTarget, PlayerID, SessionID};
pub use land::{AdmissionHook, AllowAll, LandDefinition, LandKeeper, Mode};
pub use reevaluation::{ReevaluationEngine, ReevaluationRecorder, RunOptions, RunResult};
pub use registry::LandRegistry;
pub use resolver::{ContextResolver, ResolverContext, ResolverOutputs};
pub use snapshot::{SnapshotValue, StatePatch, StateSnapshot, SyncUpdate};
pub use sync::{FieldMeta, FieldValue, StateNode, SyncPolicy};
