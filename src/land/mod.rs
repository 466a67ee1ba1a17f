//! `LandKeeper` — the single-writer tick-loop scheduler.

pub mod context;
pub mod keeper;
mod queue;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as Json;

use crate::error::ConfigError;
use crate::land::context::LandContext;
use crate::resolver::RegisteredResolver;
use crate::sync::StateNode;

pub use context::ServiceRegistry;
pub use keeper::{ActionError, LandKeeper, Mode};
pub use queue::{QueuedAction, QueuedClientEvent};

/// Gate on the unbounded action queue. Runs before the resolver phase, so a
/// rejected action never touches state or triggers a resolver lookup.
pub trait AdmissionHook: Send + Sync + 'static {
    fn admit(&self, type_identifier: &str, payload: &Json) -> bool;
}

/// Accepts everything — the default when no hook is installed.
pub struct AllowAll;

impl AdmissionHook for AllowAll {
    fn admit(&self, _type_identifier: &str, _payload: &Json) -> bool {
        true
    }
}

type ActionHandlerFn<S> = Arc<dyn Fn(&mut LandContext<S>, &mut S, Json) -> Result<Json, String> + Send + Sync>;
type ClientEventHandlerFn<S> = Arc<dyn Fn(&mut LandContext<S>, &mut S, Json) + Send + Sync>;
type TickHandlerFn<S> = Arc<dyn Fn(&mut LandContext<S>, &mut S) + Send + Sync>;

pub struct ActionRegistration<S> {
    pub(crate) handler: ActionHandlerFn<S>,
    pub(crate) resolvers: Vec<RegisteredResolver<S>>,
}

pub struct ClientEventRegistration<S> {
    pub(crate) handler: ClientEventHandlerFn<S>,
}

/// The rule set/allowed-events/tick-interval a `Land` is bound to. Built
/// once, then shared (read-only) across every `LandKeeper` instance of this
/// type via `Arc`.
pub struct LandDefinition<S> {
    pub land_type: &'static str,
    pub land_definition_id: String,
    pub rule_variant_id: Option<String>,
    pub(crate) tick_interval: Option<Duration>,
    pub(crate) actions: HashMap<String, ActionRegistration<S>>,
    pub(crate) client_events: HashMap<String, ClientEventRegistration<S>>,
    pub(crate) tick_handler: Option<TickHandlerFn<S>>,
}

impl<S: StateNode + 'static> LandDefinition<S> {
    pub fn builder(land_type: &'static str, land_definition_id: impl Into<String>) -> LandDefinitionBuilder<S> {
        LandDefinitionBuilder {
            land_type,
            land_definition_id: land_definition_id.into(),
            rule_variant_id: None,
            tick_interval: None,
            actions: HashMap::new(),
            client_events: HashMap::new(),
            tick_handler: None,
        }
    }
}

pub struct LandDefinitionBuilder<S> {
    land_type: &'static str,
    land_definition_id: String,
    rule_variant_id: Option<String>,
    tick_interval: Option<Duration>,
    actions: HashMap<String, ActionRegistration<S>>,
    client_events: HashMap<String, ClientEventRegistration<S>>,
    tick_handler: Option<TickHandlerFn<S>>,
}

impl<S: StateNode + 'static> LandDefinitionBuilder<S> {
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Convenience over [`tick_interval`](Self::tick_interval) for callers
    /// that load their tick timing from a deserialized
    /// [`crate::config::TickSettings`] rather than constructing a `Duration`
    /// by hand.
    pub fn tick_settings(self, settings: crate::config::TickSettings) -> Self {
        self.tick_interval(settings.tick_interval())
    }

    pub fn rule_variant_id(mut self, id: impl Into<String>) -> Self {
        self.rule_variant_id = Some(id.into());
        self
    }

    pub fn register_action(
        mut self,
        type_identifier: impl Into<String>,
        handler: impl Fn(&mut LandContext<S>, &mut S, Json) -> Result<Json, String> + Send + Sync + 'static,
        resolvers: Vec<RegisteredResolver<S>>,
    ) -> Self {
        self.actions.insert(
            type_identifier.into(),
            ActionRegistration { handler: Arc::new(handler), resolvers },
        );
        self
    }

    pub fn register_client_event(
        mut self,
        type_identifier: impl Into<String>,
        handler: impl Fn(&mut LandContext<S>, &mut S, Json) + Send + Sync + 'static,
    ) -> Self {
        self.client_events
            .insert(type_identifier.into(), ClientEventRegistration { handler: Arc::new(handler) });
        self
    }

    pub fn tick_handler(mut self, handler: impl Fn(&mut LandContext<S>, &mut S) + Send + Sync + 'static) -> Self {
        self.tick_handler = Some(Arc::new(handler));
        self
    }

    /// Rejects a tick handler paired with no (or a zero) tick interval.
    pub fn build(self) -> Result<LandDefinition<S>, ConfigError> {
        if self.tick_handler.is_some() {
            match self.tick_interval {
                Some(d) if !d.is_zero() => {}
                _ => return Err(ConfigError::ZeroTickInterval),
            }
        }
        Ok(LandDefinition {
            land_type: self.land_type,
            land_definition_id: self.land_definition_id,
            rule_variant_id: self.rule_variant_id,
            tick_interval: self.tick_interval,
            actions: self.actions,
            client_events: self.client_events,
            tick_handler: self.tick_handler,
        })
    }
}
