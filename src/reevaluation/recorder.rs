//! The recorded log format: `TickFrame`s plus a
//! metadata header, serialized as stable-key-order JSON.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::ids::{ClientID, EventTarget, PlayerID, SessionID};

pub const RECORD_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReevaluationRecordMetadata {
    pub land_id: String,
    pub land_type: String,
    pub created_at_unix_ms: i64,
    pub land_definition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state_hash: Option<u32>,
    #[serde(default)]
    pub land_config: Json,
    pub rng_seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_variant_id: Option<String>,
    pub record_format_version: String,
    #[serde(default)]
    pub extensions: BTreeMap<String, Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAction {
    pub seq: u64,
    pub type_identifier: String,
    pub payload: Json,
    #[serde(default)]
    pub resolver_outputs: BTreeMap<String, Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_response: Option<Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedClientEvent {
    pub type_identifier: String,
    pub payload: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionID>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Join { player: PlayerID, client: ClientID, session: SessionID },
    Leave { player: PlayerID },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedServerEvent {
    pub seq: u64,
    pub tick_id: i64,
    pub type_identifier: String,
    pub payload: Json,
    pub target: EventTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickFrame {
    pub tick_id: i64,
    #[serde(default)]
    pub actions: Vec<RecordedAction>,
    #[serde(default)]
    pub client_events: Vec<RecordedClientEvent>,
    #[serde(default)]
    pub lifecycle_events: Vec<LifecycleEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_hash: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_events: Option<Vec<RecordedServerEvent>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReevaluationRecord {
    pub metadata: ReevaluationRecordMetadata,
    pub frames: Vec<TickFrame>,
}

impl ReevaluationRecord {
    pub fn max_tick_id(&self) -> i64 {
        self.frames.iter().map(|f| f.tick_id).max().unwrap_or(0)
    }
}

/// Append-only buffer of `TickFrame`s for one `LandKeeper`, plus its
/// metadata header. `save` writes stable-key-order JSON;
/// `load` is strict — missing required fields are an error, never a
/// best-effort guess.
pub struct ReevaluationRecorder {
    metadata: ReevaluationRecordMetadata,
    frames: Vec<TickFrame>,
}

impl ReevaluationRecorder {
    pub fn new(metadata: ReevaluationRecordMetadata) -> Self {
        Self { metadata, frames: Vec::new() }
    }

    pub fn append(&mut self, frame: TickFrame) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[TickFrame] {
        &self.frames
    }

    /// Rotates the buffer: callers must call `save` then `reset` to bound
    /// memory use.
    pub fn reset(&mut self) {
        self.frames.clear();
    }

    pub fn to_record(&self) -> ReevaluationRecord {
        ReevaluationRecord { metadata: self.metadata.clone(), frames: self.frames.clone() }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.to_record())?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<ReevaluationRecord> {
        let file = File::open(path)?;
        let record: ReevaluationRecord = serde_json::from_reader(file)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> ReevaluationRecordMetadata {
        ReevaluationRecordMetadata {
            land_id: "land-1".into(),
            land_type: "arena".into(),
            created_at_unix_ms: 0,
            land_definition_id: "arena-v1".into(),
            initial_state_hash: None,
            land_config: Json::Null,
            rng_seed: 42,
            rule_variant_id: None,
            record_format_version: RECORD_FORMAT_VERSION.to_string(),
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut recorder = ReevaluationRecorder::new(sample_metadata());
        recorder.append(TickFrame {
            tick_id: 1,
            actions: vec![],
            client_events: vec![],
            lifecycle_events: vec![],
            state_hash: Some(123),
            server_events: None,
        });

        let dir = std::env::temp_dir().join(format!("landkeeper-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("record.json");
        recorder.save(&path).unwrap();

        let loaded = ReevaluationRecorder::load(&path).unwrap();
        assert_eq!(loaded.metadata.land_definition_id, "arena-v1");
        assert_eq!(loaded.frames.len(), 1);
        assert_eq!(loaded.max_tick_id(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_malformed_record() {
        let dir = std::env::temp_dir().join(format!("landkeeper-test-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, b"{\"metadata\": {}}").unwrap();
        assert!(ReevaluationRecorder::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
