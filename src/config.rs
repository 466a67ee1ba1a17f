//! Plain, `serde`-deserializable configuration structs.
//!
//! No dedicated config-layer crate is introduced — plain structs are
//! constructed programmatically or loaded from JSON via `serde_json`,
//! already a dependency.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::ReevaluationOutputMode;

/// Tick-timer configuration for a `LandKeeper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSettings {
    pub tick_interval_millis: u64,
    /// Soft ceiling on how long a submitted action's response future may
    /// wait before the caller gives up; the tick loop itself is unaffected —
    /// this only bounds how long a caller polls its `oneshot::Receiver`.
    pub max_action_await_millis: u64,
}

impl TickSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_millis)
    }

    pub fn max_action_await(&self) -> Duration {
        Duration::from_millis(self.max_action_await_millis)
    }
}

impl Default for TickSettings {
    fn default() -> Self {
        Self { tick_interval_millis: 50, max_action_await_millis: 5_000 }
    }
}

/// Serializable counterpart of a `LandKeeper`'s replay output routing, so a
/// land's full runtime config can round-trip through JSON alongside
/// `TickSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReevaluationSettings {
    pub output_mode: ReevaluationOutputMode,
    pub stop_on_first_divergence: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_settings_default_round_trips_through_json() {
        let settings = TickSettings::default();
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: TickSettings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(settings, decoded);
        assert_eq!(settings.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn reevaluation_settings_round_trip() {
        let settings = ReevaluationSettings {
            output_mode: ReevaluationOutputMode::TransportAndSink,
            stop_on_first_divergence: true,
        };
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: ReevaluationSettings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(settings, decoded);
    }
}
