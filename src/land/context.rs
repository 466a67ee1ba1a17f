//! `LandContext` — the per-handler-invocation context.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde_json::Value as Json;

use crate::ids::{ClientID, EventTarget, PlayerID, SessionID};
use crate::resolver::ResolverOutputs;

/// Typed key → service lookup, held by the `LandKeeper` and exposed to every
/// handler invocation.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.services.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.services.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref())
    }
}

/// Whether a handler requested an immediate sync this tick, and with which
/// variant. `syncNow`/`syncBroadcastOnly` are idempotent within one tick —
/// only the last call wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    Full,
    BroadcastOnly,
}

type SpawnedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Deferred side effects collected during one tick: emitted events, an
/// optional sync request, and detached tasks. Flushed by the keeper after
/// the tick's handlers have all run.
#[derive(Default)]
pub struct TickOutbox {
    pub(crate) events: Vec<(String, Json, EventTarget)>,
    pub(crate) sync_request: Option<SyncRequest>,
    pub(crate) spawned: Vec<SpawnedTask>,
}

/// Context passed to action handlers, client-event handlers, and the tick
/// handler. `state` itself is passed alongside as `&mut S`
/// rather than through this struct, so handlers cannot capture it across an
/// await point — handlers are synchronous by construction in this crate.
pub struct LandContext<'a, S> {
    pub land_id: &'a str,
    pub player: Option<&'a PlayerID>,
    pub client: Option<&'a ClientID>,
    pub session: Option<&'a SessionID>,
    pub services: &'a ServiceRegistry,
    pub metadata: &'a HashMap<String, Json>,
    resolver_outputs: &'a ResolverOutputs,
    outbox: &'a mut TickOutbox,
    _state: PhantomData<S>,
}

impl<'a, S> LandContext<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        land_id: &'a str,
        player: Option<&'a PlayerID>,
        client: Option<&'a ClientID>,
        session: Option<&'a SessionID>,
        services: &'a ServiceRegistry,
        metadata: &'a HashMap<String, Json>,
        resolver_outputs: &'a ResolverOutputs,
        outbox: &'a mut TickOutbox,
    ) -> Self {
        Self {
            land_id,
            player,
            client,
            session,
            services,
            metadata,
            resolver_outputs,
            outbox,
            _state: PhantomData,
        }
    }

    /// Recorded/replayed resolver outputs for the action currently being
    /// handled (empty outside action handlers).
    pub fn resolver_outputs(&self) -> &ResolverOutputs {
        self.resolver_outputs
    }

    pub fn emit_event(&mut self, type_identifier: impl Into<String>, payload: Json, target: EventTarget) {
        self.outbox.events.push((type_identifier.into(), payload, target));
    }

    /// Schedules a one-shot sync. Meaningful for tickless lands; on a
    /// ticked land the per-tick sync already fires automatically.
    pub fn sync_now(&mut self) {
        self.outbox.sync_request = Some(SyncRequest::Full);
    }

    pub fn sync_broadcast_only(&mut self) {
        self.outbox.sync_request = Some(SyncRequest::BroadcastOnly);
    }

    /// Submits a detached task. It runs outside the writer context and must
    /// not touch state directly.
    pub fn spawn(&mut self, future: impl Future<Output = ()> + Send + 'static) {
        self.outbox.spawned.push(Box::pin(future));
    }
}
