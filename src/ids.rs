//! Identity wrappers and dispatch targets.
//!
//! `PlayerID`, `ClientID` and `SessionID` are opaque string handles — the
//! runtime never interprets their contents, only compares and hashes them.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;

macro_rules! id_wrapper {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_wrapper!(PlayerID);
id_wrapper!(ClientID);
id_wrapper!(SessionID);

impl SessionID {
    /// Mints a fresh opaque session id for a client that connected without
    /// presenting one of its own (the common case for a brand-new WebSocket
    /// connection).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Dispatch destination for a server-originated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    All,
    Player(PlayerID),
    Players(Vec<PlayerID>),
    Client(ClientID),
    Session(SessionID),
}

/// Hand-rolled (rather than `#[serde(tag = "kind")]`) because serde's
/// internally tagged representation cannot serialize a newtype variant whose
/// payload is a bare string or array — every non-unit variant here wraps
/// exactly that.
impl Serialize for EventTarget {
    fn serialize<Se: serde::Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            EventTarget::All => {
                map.serialize_entry("kind", "all")?;
            }
            EventTarget::Player(id) => {
                map.serialize_entry("kind", "player")?;
                map.serialize_entry("player", id.as_str())?;
            }
            EventTarget::Players(ids) => {
                map.serialize_entry("kind", "players")?;
                let ids: Vec<&str> = ids.iter().map(PlayerID::as_str).collect();
                map.serialize_entry("players", &ids)?;
            }
            EventTarget::Client(id) => {
                map.serialize_entry("kind", "client")?;
                map.serialize_entry("client", id.as_str())?;
            }
            EventTarget::Session(id) => {
                map.serialize_entry("kind", "session")?;
                map.serialize_entry("session", id.as_str())?;
            }
        }
        map.end()
    }
}

/// Hand-rolled so an unrecognized `kind` or an empty id payload normalizes to
/// `All` rather than erroring — a record produced by a future/older version
/// of this runtime must still decode (round-trip invariant in spec.md §8).
impl<'de> Deserialize<'de> for EventTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        let obj = json.as_object().ok_or_else(|| D::Error::custom("EventTarget must be an object"))?;
        let kind = obj.get("kind").and_then(Json::as_str).unwrap_or("all");
        let target = match kind {
            "player" => obj
                .get("player")
                .and_then(Json::as_str)
                .filter(|id| !id.is_empty())
                .map(|id| EventTarget::Player(PlayerID::new(id))),
            "players" => obj.get("players").and_then(Json::as_array).map(|ids| {
                EventTarget::Players(
                    ids.iter().filter_map(Json::as_str).filter(|id| !id.is_empty()).map(PlayerID::new).collect(),
                )
            }),
            "client" => obj
                .get("client")
                .and_then(Json::as_str)
                .filter(|id| !id.is_empty())
                .map(|id| EventTarget::Client(ClientID::new(id))),
            "session" => obj
                .get("session")
                .and_then(Json::as_str)
                .filter(|id| !id.is_empty())
                .map(|id| EventTarget::Session(SessionID::new(id))),
            _ => None,
        };
        Ok(match target {
            Some(EventTarget::Players(ids)) if ids.is_empty() => EventTarget::All,
            Some(target) => target,
            None => EventTarget::All,
        })
    }
}

impl EventTarget {
    /// `true` if `player` is within this target's audience. `Client`/`Session`
    /// targets are resolved by the transport, not by player identity, so they
    /// never match here.
    pub fn includes_player(&self, player: &PlayerID) -> bool {
        match self {
            EventTarget::All => true,
            EventTarget::Player(p) => p == player,
            EventTarget::Players(ps) => ps.contains(player),
            EventTarget::Client(_) | EventTarget::Session(_) => false,
        }
    }
}

impl Default for EventTarget {
    /// Unknown or empty targets normalize to `All` (round-trip invariant).
    fn default() -> Self {
        EventTarget::All
    }
}
