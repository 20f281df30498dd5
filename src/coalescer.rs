use std::sync::Arc;

use futures::Future;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    controller::Attach,
    key::{CallKey, KeyError},
    registry::CallRegistry,
    stats::CoalesceStats,
    BoxFut,
};

/// Deduplicates concurrent calls that describe the same request.
///
/// The predicate runs at most once per canonical key: the first caller
/// starts it, concurrent callers for the same key join the in-flight call,
/// and once it settles the result is cached for the lifetime of the
/// coalescer. Clones share the same registry; independent coalescers never
/// share state.
pub struct Coalescer<D, V>
where
    D: Serialize,
    V: Clone + Send + Sync + 'static,
{
    registry: Arc<CallRegistry<V>>,
    predicate: Arc<dyn Fn(D) -> BoxFut<'static, V> + Send + Sync>,
    stats: Arc<CoalesceStats>,
}

#[derive(Debug, Error)]
pub enum CoalesceError {
    /// The description could not be serialized to a canonical key. Nothing
    /// was recorded for the call.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// The coalescer was torn down while this call was still in flight.
    #[error("in-flight call was abandoned before settling")]
    FlightAborted,
}

impl<D, V> Coalescer<D, V>
where
    D: Serialize,
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(D) -> BoxFut<'static, V> + Send + Sync + 'static,
    {
        Self {
            registry: Arc::new(CallRegistry::new()),
            predicate: Arc::new(predicate),
            stats: Arc::new(CoalesceStats::default()),
        }
    }

    /// Like [`Coalescer::new`], boxing the predicate's future for you.
    pub fn from_source<F, Fut>(source: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        Self::new(move |description| -> BoxFut<'static, V> { Box::pin(source(description)) })
    }

    /// Resolve the description to its settled value.
    ///
    /// Replays the cached result if the key already settled. Otherwise the
    /// call joins the in-flight predicate execution for the key, starting
    /// one if there is none, and resolves when it settles. A predicate
    /// future that never resolves stalls every caller for its key; that is
    /// the predicate's contract to uphold.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get(&self, description: D) -> Result<V, CoalesceError> {
        let key = CallKey::derive(&description)?;
        let controller = self.registry.resolve(&key);

        match controller.attach() {
            Attach::Replay(value) => {
                self.stats.record_replay();
                Ok(value)
            }
            Attach::Wait(rx) => {
                self.stats.record_waiter();
                rx.await.map_err(|_| CoalesceError::FlightAborted)
            }
            Attach::Lead(rx) => {
                self.stats.record_leader();
                debug!(key = %key, "starting predicate call");
                let flight = (self.predicate)(description);
                tokio::spawn(async move {
                    let value = flight.await;
                    controller.settle(value);
                });
                rx.await.map_err(|_| CoalesceError::FlightAborted)
            }
        }
    }

    /// Replay an already-settled result without joining or starting a
    /// flight. Never invokes the predicate.
    pub fn try_get(&self, description: &D) -> Result<Option<V>, CoalesceError> {
        let key = CallKey::derive(description)?;
        let value = self
            .registry
            .lookup(&key)
            .and_then(|controller| controller.try_replay());
        if value.is_some() {
            self.stats.record_replay();
        }
        Ok(value)
    }

    /// Number of distinct keys observed so far. Per-key state is permanent,
    /// so this only grows.
    pub fn key_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> &CoalesceStats {
        &self.stats
    }
}

impl<D, V> Clone for Coalescer<D, V>
where
    D: Serialize,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            predicate: Arc::clone(&self.predicate),
            stats: Arc::clone(&self.stats),
        }
    }
}
