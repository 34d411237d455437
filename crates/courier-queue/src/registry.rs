//! Key-to-lane mapping.
//!
//! [`LaneRegistry`] is created once by the application and shared via
//! `Arc<LaneRegistry>`. Lanes are created lazily on first use of a key
//! and live as long as the registry; there is no removal.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::lane::{Lane, LaneTicket};

/// Delay applied by lanes created without an explicit one.
pub const DEFAULT_LANE_DELAY: Duration = Duration::from_millis(100);

/// Append-only registry of [`Lane`]s keyed by string.
pub struct LaneRegistry {
    lanes: Mutex<HashMap<String, Arc<Lane>>>,
    default_delay: Duration,
}

impl LaneRegistry {
    /// Create an empty registry using [`DEFAULT_LANE_DELAY`].
    pub fn new() -> Self {
        Self::with_default_delay(DEFAULT_LANE_DELAY)
    }

    /// Create an empty registry whose lanes default to `default_delay`.
    pub fn with_default_delay(default_delay: Duration) -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
            default_delay,
        }
    }

    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Submit `task` to the lane for `key`, creating the lane if needed.
    ///
    /// `delay` only takes effect when this call creates the lane; an
    /// existing lane keeps the delay it was created with.
    ///
    /// # Panics
    ///
    /// Panics outside a Tokio runtime, see [`Lane::submit`].
    pub fn submit<F, Fut, T, E>(
        &self,
        key: &str,
        task: F,
        delay: Option<Duration>,
    ) -> LaneTicket<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.lane_for(key, delay).submit(task)
    }

    /// Look up an existing lane without creating one.
    pub fn lane(&self, key: &str) -> Option<Arc<Lane>> {
        self.lanes().get(key).cloned()
    }

    /// Keys of every lane created so far, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.lanes().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lanes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes().is_empty()
    }

    fn lane_for(&self, key: &str, delay: Option<Duration>) -> Arc<Lane> {
        let mut lanes = self.lanes();

        if let Some(lane) = lanes.get(key) {
            if let Some(requested) = delay.filter(|d| *d != lane.delay()) {
                tracing::debug!(
                    key,
                    requested_ms = requested.as_millis() as u64,
                    delay_ms = lane.delay().as_millis() as u64,
                    "Lane already exists, ignoring requested delay",
                );
            }
            return Arc::clone(lane);
        }

        let delay = delay.unwrap_or(self.default_delay);
        tracing::debug!(key, delay_ms = delay.as_millis() as u64, "Creating lane");

        let lane = Arc::new(Lane::new(key, delay));
        lanes.insert(key.to_string(), Arc::clone(&lane));
        lane
    }

    fn lanes(&self) -> MutexGuard<'_, HashMap<String, Arc<Lane>>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LaneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_is_empty() {
        let registry = LaneRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.default_delay(), DEFAULT_LANE_DELAY);
        assert!(registry.lane("missing").is_none());
    }

    #[tokio::test]
    async fn creates_lane_lazily_with_requested_delay() {
        let registry = LaneRegistry::new();

        registry
            .submit("k", || async { Ok::<_, ()>(()) }, Some(Duration::ZERO))
            .await
            .unwrap();

        let lane = registry.lane("k").expect("lane should exist");
        assert_eq!(lane.delay(), Duration::ZERO);
        assert_eq!(registry.keys(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn first_delay_wins() {
        let registry = LaneRegistry::new();

        registry
            .submit("k", || async { Ok::<_, ()>(()) }, Some(Duration::ZERO))
            .await
            .unwrap();
        registry
            .submit("k", || async { Ok::<_, ()>(()) }, Some(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lane("k").unwrap().delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn omitted_delay_uses_registry_default() {
        let registry = LaneRegistry::with_default_delay(Duration::from_millis(7));

        registry
            .submit("k", || async { Ok::<_, ()>(()) }, None)
            .await
            .unwrap();

        assert_eq!(registry.lane("k").unwrap().delay(), Duration::from_millis(7));
    }

    #[tokio::test]
    async fn same_key_shares_one_lane() {
        let registry = LaneRegistry::with_default_delay(Duration::ZERO);

        let a = registry.submit("shared", || async { Ok::<_, ()>(1) }, None);
        let b = registry.submit("shared", || async { Ok::<_, ()>(2) }, None);
        let c = registry.submit("other", || async { Ok::<_, ()>(3) }, None);

        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(b.await.unwrap(), 2);
        assert_eq!(c.await.unwrap(), 3);
        assert_eq!(registry.len(), 2);
    }
}
