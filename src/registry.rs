use std::sync::Arc;

use dashmap::DashMap;

use crate::{controller::CallController, key::CallKey};

/// Maps each canonical key to its one controller. Controllers are created
/// lazily and live as long as the registry.
pub(crate) struct CallRegistry<V> {
    calls: DashMap<CallKey, Arc<CallController<V>>>,
}

impl<V> CallRegistry<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            calls: DashMap::new(),
        }
    }

    /// Same key, same controller, for the lifetime of the registry.
    pub(crate) fn resolve(&self, key: &CallKey) -> Arc<CallController<V>> {
        self.calls
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CallController::new(key.clone())))
            .value()
            .clone()
    }

    pub(crate) fn lookup(&self, key: &CallKey) -> Option<Arc<CallController<V>>> {
        self.calls.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}
