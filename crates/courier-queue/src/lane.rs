//! Single-flight, FIFO, delay-throttled task runner.
//!
//! A [`Lane`] owns a queue of pending tasks and at most one run-loop. The
//! run-loop is spawned on the Tokio runtime when the first task arrives
//! and exits once the queue drains, clearing the running flag in the same
//! critical section that observed the empty queue. A later submission
//! starts a fresh loop.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::TaskError;

/// Type-erased unit of work: runs the task and resolves its notifier.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Mutable state guarded by the lane mutex. Never held across an await.
#[derive(Default)]
struct LaneState {
    entries: VecDeque<Job>,
    running: bool,
}

/// A FIFO run-loop over tasks sharing one key.
pub struct Lane {
    key: String,
    delay: Duration,
    state: Mutex<LaneState>,
}

impl Lane {
    /// Create an idle lane. The delay is applied after every task.
    pub fn new(key: impl Into<String>, delay: Duration) -> Self {
        Self {
            key: key.into(),
            delay,
            state: Mutex::new(LaneState::default()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a run-loop is currently live for this lane.
    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Number of tasks waiting to start (excludes the one executing).
    pub fn pending(&self) -> usize {
        self.state().entries.len()
    }

    /// Queue `task` and return a ticket resolving to its outcome.
    ///
    /// Submission never waits: the task is appended and, if no run-loop is
    /// live, one is spawned. Dropping the ticket does not cancel the task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime and a run-loop has to be
    /// started, as [`tokio::spawn`] does.
    pub fn submit<F, Fut, T, E>(self: &Arc<Self>, task: F) -> LaneTicket<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (notifier, rx) = oneshot::channel();
        let key = self.key.clone();

        let job: Job = Box::new(move || {
            async move {
                let outcome = match AssertUnwindSafe(async move { task().await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(data)) => Ok(data),
                    Ok(Err(e)) => {
                        tracing::warn!(key = %key, "Lane task failed");
                        Err(TaskError::Failed(e))
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(key = %key, panic = %message, "Lane task panicked");
                        Err(TaskError::Panicked(message))
                    }
                };

                if notifier.send(outcome).is_err() {
                    tracing::debug!(key = %key, "Lane task result discarded, ticket dropped");
                }
            }
            .boxed()
        });

        let start_loop = {
            let mut state = self.state();
            state.entries.push_back(job);
            !std::mem::replace(&mut state.running, true)
        };

        if start_loop {
            tokio::spawn(Arc::clone(self).run());
        }

        LaneTicket { rx }
    }

    async fn run(self: Arc<Self>) {
        tracing::debug!(
            key = %self.key,
            delay_ms = self.delay.as_millis() as u64,
            "Lane run-loop started",
        );

        loop {
            let job = {
                let mut state = self.state();
                match state.entries.pop_front() {
                    Some(job) => job,
                    None => {
                        state.running = false;
                        break;
                    }
                }
            };

            job().await;

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::debug!(key = %self.key, "Lane run-loop drained");
    }

    fn state(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Lane")
            .field("key", &self.key)
            .field("delay", &self.delay)
            .field("pending", &state.entries.len())
            .field("running", &state.running)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// LaneTicket
// ---------------------------------------------------------------------------

/// Pending outcome of a submitted task.
#[must_use = "a ticket does nothing unless awaited; the task runs regardless"]
pub struct LaneTicket<T, E> {
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> Future for LaneTicket<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Abandoned)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
