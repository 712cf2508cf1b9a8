//! Call Deduplication
//!
//! Collapses concurrent calls that share a key into a single execution.
//! The first caller for a key (the leader) runs the work on its own task;
//! every caller that arrives while that work is in flight awaits the
//! leader's result instead of running the work again.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{CacheError, Result};

/// Completion signal shared by all waiters of one in-flight call.
type InFlight<T> = Shared<oneshot::Receiver<Result<T>>>;

/// What a caller does once it has looked at the table.
enum Role<T> {
    Leader(oneshot::Sender<Result<T>>),
    Waiter(InFlight<T>),
}

// == Single Flight ==
/// Table of in-flight calls, one per key.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, InFlight<T>>>,
}

impl<T> fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Do ==
    /// Runs `work` for `key` unless a call for `key` is already running, in
    /// which case the caller waits for that call and gets its result.
    ///
    /// The table lock is released before `work` starts, so calls for other
    /// keys are never held up.
    pub async fn call<F, Fut>(&self, key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let role = {
            let mut calls = self.calls.lock();
            if let Some(in_flight) = calls.get(key) {
                Role::Waiter(in_flight.clone())
            } else {
                let (tx, rx) = oneshot::channel();
                calls.insert(key.to_string(), rx.shared());
                Role::Leader(tx)
            }
        };

        match role {
            Role::Leader(tx) => self.lead(key, tx, work).await,
            Role::Waiter(in_flight) => {
                trace!(key, "Waiting on in-flight call");
                in_flight.await.unwrap_or_else(|_| {
                    Err(CacheError::Internal(format!(
                        "in-flight call for key {} was abandoned",
                        key
                    )))
                })
            }
        }
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    async fn lead<F, Fut>(&self, key: &str, tx: oneshot::Sender<Result<T>>, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Removes the table entry even if this future is dropped mid-flight;
        // waiters then observe a cancelled channel.
        let _guard = CallGuard {
            calls: &self.calls,
            key,
        };

        let result = work().await;
        let _ = tx.send(result.clone());
        result
    }
}

// == Call Guard ==
struct CallGuard<'a, T> {
    calls: &'a Mutex<HashMap<String, InFlight<T>>>,
    key: &'a str,
}

impl<T> Drop for CallGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}
