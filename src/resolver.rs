//! Async context resolvers — idempotent, read-only lookups
//! that run before a handler in live mode, and whose recorded outputs are
//! replayed verbatim in reevaluation mode so handlers stay deterministic.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::ResolverError;
use crate::ids::{ClientID, PlayerID, SessionID};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The context handed to a resolver: the acting identities, the decoded
/// action payload, and a read-only view of state at ingestion time.
pub struct ResolverContext<'a, S> {
    pub player: &'a PlayerID,
    pub client: &'a ClientID,
    pub session: &'a SessionID,
    pub action: &'a Json,
    pub state: &'a S,
}

/// A typed, idempotent, read-only pre-handler lookup. Implementations
/// declare their `Output` and `NAME` once; the executor associates them
/// with an action type at registration.
pub trait ContextResolver<S>: Send + Sync + 'static {
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// The resolver's registered type name, used as the recorded-output key
    /// and as the handler-facing accessor key (design note §9 replaces
    /// dynamic member lookup with a typed `get::<R>()` accessor keyed by
    /// this name rather than string-derived reflection).
    const NAME: &'static str;

    fn resolve<'a>(&'a self, ctx: ResolverContext<'a, S>) -> BoxFuture<'a, Result<Self::Output, ResolverError>>;
}

type ErasedResolver<S> = Arc<
    dyn for<'a> Fn(ResolverContext<'a, S>) -> BoxFuture<'a, Result<Json, ResolverError>> + Send + Sync,
>;

/// A resolver type-erased to a JSON-producing closure, stored in the
/// per-action-type registration.
#[derive(Clone)]
pub struct RegisteredResolver<S> {
    pub name: &'static str,
    func: ErasedResolver<S>,
}

impl<S: Send + Sync + 'static> RegisteredResolver<S> {
    pub fn new<R: ContextResolver<S>>(resolver: Arc<R>) -> Self {
        let func: ErasedResolver<S> = Arc::new(move |ctx| {
            let resolver = Arc::clone(&resolver);
            Box::pin(async move {
                let output = resolver.resolve(ctx).await?;
                serde_json::to_value(output).map_err(|e| ResolverError::Custom(e.to_string()))
            })
        });
        Self { name: R::NAME, func }
    }

    async fn run<'a>(&'a self, ctx: ResolverContext<'a, S>) -> Result<Json, ResolverError> {
        (self.func)(ctx).await
    }
}

/// Outputs collected for one action, keyed by resolver name.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResolverOutputs(pub BTreeMap<String, Json>);

impl ResolverOutputs {
    pub fn get<S, R: ContextResolver<S>>(&self) -> Option<R::Output> {
        self.0.get(R::NAME).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Executes every resolver declared for an action type in parallel and
/// collects their outputs, or runs none at all and returns the recorded
/// outputs verbatim in reevaluation mode.
pub async fn resolve_all<S: Send + Sync + 'static>(
    resolvers: &[RegisteredResolver<S>],
    player: &PlayerID,
    client: &ClientID,
    session: &SessionID,
    action: &Json,
    state: &S,
) -> Result<ResolverOutputs, crate::error::ResolverExecutionError> {
    let futures = resolvers.iter().map(|resolver| {
        let ctx = ResolverContext { player, client, session, action, state };
        async move { (resolver.name, resolver.run(ctx).await) }
    });
    let results = futures::future::join_all(futures).await;

    let mut outputs = BTreeMap::new();
    for (name, result) in results {
        match result {
            Ok(value) => {
                outputs.insert(name.to_string(), value);
            }
            Err(err) => {
                return Err(crate::error::ResolverExecutionError::resolver_failed(name, err));
            }
        }
    }
    Ok(ResolverOutputs(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;
    impl StateLike for Dummy {}
    trait StateLike: Send + Sync + 'static {}

    struct InventoryResolver;
    impl ContextResolver<Dummy> for InventoryResolver {
        type Output = Vec<String>;
        const NAME: &'static str = "InventoryResolver";

        fn resolve<'a>(&'a self, _ctx: ResolverContext<'a, Dummy>) -> BoxFuture<'a, Result<Self::Output, ResolverError>> {
            Box::pin(async { Ok(vec!["sword".to_string()]) })
        }
    }

    #[tokio::test]
    async fn resolver_output_round_trips_through_typed_accessor() {
        let state = Dummy;
        let player = PlayerID::new("p1");
        let client = ClientID::new("c1");
        let session = SessionID::new("s1");
        let action = serde_json::json!({});

        let resolvers = vec![RegisteredResolver::new(Arc::new(InventoryResolver))];
        let outputs = resolve_all(&resolvers, &player, &client, &session, &action, &state)
            .await
            .unwrap();

        let items: Vec<String> = outputs.get::<Dummy, InventoryResolver>().unwrap();
        assert_eq!(items, vec!["sword".to_string()]);
    }

    #[tokio::test]
    async fn resolver_failure_is_reported_with_name() {
        struct FailingResolver;
        impl ContextResolver<Dummy> for FailingResolver {
            type Output = ();
            const NAME: &'static str = "FailingResolver";

            fn resolve<'a>(&'a self, _ctx: ResolverContext<'a, Dummy>) -> BoxFuture<'a, Result<Self::Output, ResolverError>> {
                Box::pin(async { Err(ResolverError::DataLoadFailed("timeout".into())) })
            }
        }

        let state = Dummy;
        let player = PlayerID::new("p1");
        let client = ClientID::new("c1");
        let session = SessionID::new("s1");
        let action = serde_json::json!({});
        let resolvers = vec![RegisteredResolver::new(Arc::new(FailingResolver))];

        let err = resolve_all(&resolvers, &player, &client, &session, &action, &state)
            .await
            .unwrap_err();
        assert_eq!(err.resolver_name, "FailingResolver");
    }
}
