//! `LandRegistry` — a thin owning map from land id to a running land handle,
//! keyed by the land's id string. Kept minimal: register/get/remove, no
//! supervision.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::land::LandKeeper;
use crate::sync::StateNode;

/// Owns every running `LandKeeper` of one state-tree type, keyed by land id.
/// Each `LandKeeper` is itself single-writer; the registry adds no
/// cross-land synchronization of its own — registering and removing entries
/// is the only thing that needs to be safe to call from multiple tasks.
pub struct LandRegistry<S: StateNode + 'static> {
    lands: Mutex<HashMap<String, Arc<Mutex<LandKeeper<S>>>>>,
}

impl<S: StateNode + 'static> Default for LandRegistry<S> {
    fn default() -> Self {
        Self { lands: Mutex::new(HashMap::new()) }
    }
}

impl<S: StateNode + 'static> LandRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a running keeper under `land_id`, replacing any prior
    /// keeper registered under the same id (the caller is responsible for
    /// having called `stop()` on the displaced one, if any).
    pub fn register(&self, land_id: impl Into<String>, keeper: LandKeeper<S>) -> Arc<Mutex<LandKeeper<S>>> {
        let handle = Arc::new(Mutex::new(keeper));
        self.lands.lock().expect("registry lock poisoned").insert(land_id.into(), Arc::clone(&handle));
        handle
    }

    pub fn get(&self, land_id: &str) -> Option<Arc<Mutex<LandKeeper<S>>>> {
        self.lands.lock().expect("registry lock poisoned").get(land_id).cloned()
    }

    pub fn remove(&self, land_id: &str) -> Option<Arc<Mutex<LandKeeper<S>>>> {
        self.lands.lock().expect("registry lock poisoned").remove(land_id)
    }

    pub fn land_ids(&self) -> Vec<String> {
        self.lands.lock().expect("registry lock poisoned").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lands.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
