use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::key::CallKey;

/// Per-key call state: the listener queue while a call is in flight, the
/// settled result forever after.
pub(crate) struct CallController<V> {
    key: CallKey,
    state: Mutex<CallState<V>>,
}

struct CallState<V> {
    result: Option<V>,
    listeners: Vec<oneshot::Sender<V>>,
}

/// Outcome of attaching a caller to a controller.
pub(crate) enum Attach<V> {
    /// The call already settled; the cached result is replayed immediately.
    Replay(V),
    /// Another call is in flight for this key; wait for its fan-out.
    Wait(oneshot::Receiver<V>),
    /// First listener; the caller must start the predicate.
    Lead(oneshot::Receiver<V>),
}

impl<V> CallController<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new(key: CallKey) -> Self {
        Self {
            key,
            state: Mutex::new(CallState {
                result: None,
                listeners: Vec::new(),
            }),
        }
    }

    /// Check for a settled result, enqueue a listener, and decide leadership
    /// as one atomic step.
    pub(crate) fn attach(&self) -> Attach<V> {
        let mut state = self.state.lock();

        if let Some(value) = state.result.as_ref() {
            debug!(key = %self.key, "replaying settled result");
            return Attach::Replay(value.clone());
        }

        let (tx, rx) = oneshot::channel();
        state.listeners.push(tx);

        if state.listeners.len() == 1 {
            Attach::Lead(rx)
        } else {
            debug!(key = %self.key, pending = state.listeners.len(), "joining in-flight call");
            Attach::Wait(rx)
        }
    }

    /// Store the result (first and only write) and fan it out to every
    /// queued listener in enqueue order. Returns the number of listeners
    /// that received it.
    ///
    /// Settling twice is a predicate contract violation; the second call is
    /// ignored and the first result kept.
    pub(crate) fn settle(&self, value: V) -> usize {
        let listeners = {
            let mut state = self.state.lock();

            if state.result.is_some() {
                warn!(key = %self.key, "call settled more than once, keeping the first result");
                return 0;
            }

            state.result = Some(value.clone());
            std::mem::take(&mut state.listeners)
        };

        debug!(key = %self.key, listeners = listeners.len(), "fanning out settled result");

        let mut notified = 0;
        for tx in listeners {
            // A listener that stopped waiting must not break the fan-out
            // for the rest.
            if tx.send(value.clone()).is_ok() {
                notified += 1;
            }
        }
        notified
    }

    /// Presence check without enqueueing.
    pub(crate) fn try_replay(&self) -> Option<V> {
        self.state.lock().result.clone()
    }
}
