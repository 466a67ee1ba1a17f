//! Crate-wide error domains.
//!
//! Hand-written `Display`/`Error` impls rather than a derive-macro error
//! crate — each variant formats its own message instead of routing through a
//! shared `#[error(...)]` template.

use std::fmt;

/// Envelope payload could not be decoded into the registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    UnknownTypeIdentifier(String),
    MalformedPayload { type_identifier: String, reason: String },
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingError::UnknownTypeIdentifier(id) => {
                write!(f, "no payload type registered for type identifier `{id}`")
            }
            DecodingError::MalformedPayload { type_identifier, reason } => {
                write!(f, "payload for `{type_identifier}` failed to decode: {reason}")
            }
        }
    }
}

impl std::error::Error for DecodingError {}

/// Domain-specific failure raised by a user resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    MissingParameter(String),
    DataLoadFailed(String),
    Custom(String),
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverError::MissingParameter(name) => write!(f, "missing parameter `{name}`"),
            ResolverError::DataLoadFailed(reason) => write!(f, "data load failed: {reason}"),
            ResolverError::Custom(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for ResolverError {}

/// Wraps a resolver failure with the resolver's registered name. Raised by
/// the resolver executor, never by resolvers themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverExecutionError {
    pub resolver_name: &'static str,
    pub underlying: ResolverError,
}

impl ResolverExecutionError {
    pub fn resolver_failed(resolver_name: &'static str, underlying: ResolverError) -> Self {
        Self { resolver_name, underlying }
    }
}

impl fmt::Display for ResolverExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolver `{}` failed: {}", self.resolver_name, self.underlying)
    }
}

impl std::error::Error for ResolverExecutionError {}

/// `SyncEngine` failed to project a field value to `SnapshotValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingError {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}` could not be encoded: {}", self.field, self.reason)
    }
}

impl std::error::Error for EncodingError {}

/// Lifecycle and queue-admission failures surfaced by `LandKeeper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandKeeperError {
    AlreadyJoined { player: String, client: String, session: String },
    NotJoined { player: String },
    LandStopped,
}

impl fmt::Display for LandKeeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandKeeperError::AlreadyJoined { player, client, session } => write!(
                f,
                "player {player} is already joined with client {client} and session {session}"
            ),
            LandKeeperError::NotJoined { player } => write!(f, "player {player} has not joined"),
            LandKeeperError::LandStopped => write!(f, "land keeper has stopped"),
        }
    }
}

impl std::error::Error for LandKeeperError {}

/// A reevaluation record is incompatible with the definition it is replayed
/// against. Each variant carries the offending pair and
/// exposes a stable numeric code so callers can branch without string
/// matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayCompatibilityError {
    LandTypeMismatch { recorded: String, expected: String },
    SchemaMismatch { recorded: Option<String>, expected: String },
    RecordVersionMismatch { recorded: String, expected: String },
}

impl ReplayCompatibilityError {
    pub const CODE_LAND_TYPE_MISMATCH: u32 = 2001;
    pub const CODE_SCHEMA_MISMATCH: u32 = 2002;
    pub const CODE_RECORD_VERSION_MISMATCH: u32 = 2003;

    pub fn code(&self) -> u32 {
        match self {
            ReplayCompatibilityError::LandTypeMismatch { .. } => Self::CODE_LAND_TYPE_MISMATCH,
            ReplayCompatibilityError::SchemaMismatch { .. } => Self::CODE_SCHEMA_MISMATCH,
            ReplayCompatibilityError::RecordVersionMismatch { .. } => {
                Self::CODE_RECORD_VERSION_MISMATCH
            }
        }
    }
}

impl fmt::Display for ReplayCompatibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayCompatibilityError::LandTypeMismatch { recorded, expected } => write!(
                f,
                "[{}] record land type `{recorded}` does not match definition `{expected}`",
                Self::CODE_LAND_TYPE_MISMATCH
            ),
            ReplayCompatibilityError::SchemaMismatch { recorded, expected } => write!(
                f,
                "[{}] record land-definition-id `{:?}` does not match definition `{expected}`",
                Self::CODE_SCHEMA_MISMATCH,
                recorded
            ),
            ReplayCompatibilityError::RecordVersionMismatch { recorded, expected } => write!(
                f,
                "[{}] record format version `{recorded}` is not supported, expected `{expected}`",
                Self::CODE_RECORD_VERSION_MISMATCH
            ),
        }
    }
}

impl std::error::Error for ReplayCompatibilityError {}

/// A replayed tick's computed state hash diverged from the recorded one.
/// Unlike `ReplayCompatibilityError`, this does not stop the engine unless
/// explicitly configured to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayDivergence {
    pub tick_id: i64,
    pub computed_hash: u32,
    pub recorded_hash: u32,
}

impl fmt::Display for ReplayDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {} diverged: computed {:08x} != recorded {:08x}",
            self.tick_id, self.computed_hash, self.recorded_hash
        )
    }
}

impl std::error::Error for ReplayDivergence {}

/// A land definition failed validation at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTickInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickInterval => {
                write!(f, "tick interval must be non-zero when a tick handler is configured")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
