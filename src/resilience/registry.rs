//! Per-category circuit breakers.

use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{BreakerPolicy, BreakerSnapshot, CircuitBreaker};

/// Category used when a deployment does not isolate providers.
pub const DEFAULT_CATEGORY: &str = "default";

/// A thread-safe map of category -> breaker.
///
/// Breakers are created lazily on first use with the registry's policy and
/// live as long as the registry.
#[derive(Debug, Clone, Default)]
pub struct BreakerRegistry {
    inner: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    policy: BreakerPolicy,
}

impl BreakerRegistry {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    /// Get the breaker for `category`, creating it if needed.
    pub fn breaker(&self, category: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.inner.get(category) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .inner
            .entry(category.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(category, self.policy)));
        Arc::clone(entry.value())
    }

    pub fn is_open(&self, category: &str) -> bool {
        self.breaker(category).is_open()
    }

    pub fn record_failure(&self, category: &str) {
        self.breaker(category).record_failure();
    }

    pub fn record_success(&self, category: &str) {
        self.breaker(category).record_success();
    }

    pub fn snapshot(&self, category: &str) -> BreakerSnapshot {
        self.breaker(category).snapshot()
    }

    /// Snapshots of every breaker created so far, sorted by category.
    pub fn snapshot_all(&self) -> Vec<BreakerSnapshot> {
        let mut all: Vec<BreakerSnapshot> = self.inner.iter().map(|entry| entry.value().snapshot()).collect();
        all.sort_by(|a, b| a.category.cmp(&b.category));
        all
    }

    /// Reset every breaker to closed.
    pub fn reset_all(&self) {
        for entry in self.inner.iter() {
            entry.value().reset();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitState;

    #[test]
    fn test_categories_are_isolated() {
        let registry = BreakerRegistry::default();
        for _ in 0..3 {
            registry.record_failure("gemini");
        }

        assert!(registry.is_open("gemini"));
        assert!(!registry.is_open("openai"));
        assert!(!registry.is_open(DEFAULT_CATEGORY));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_same_breaker_returned() {
        let registry = BreakerRegistry::default();
        let a = registry.breaker("anthropic");
        let b = registry.breaker("anthropic");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_clones_share_state() {
        let registry = BreakerRegistry::default();
        let clone = registry.clone();
        clone.record_failure("gemini");
        assert_eq!(registry.snapshot("gemini").consecutive_failures, 1);
    }

    #[test]
    fn test_snapshot_all_sorted_and_reset() {
        let registry = BreakerRegistry::new(BreakerPolicy { failure_threshold: 1, ..BreakerPolicy::default() });
        registry.record_failure("openai");
        registry.record_success("anthropic");

        let all = registry.snapshot_all();
        let names: Vec<&str> = all.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["anthropic", "openai"]);
        assert_eq!(all[1].state, CircuitState::Open);

        registry.reset_all();
        assert!(!registry.is_open("openai"));
    }

    #[test]
    fn test_concurrent_failures_are_counted() {
        let registry = BreakerRegistry::new(BreakerPolicy { failure_threshold: 1000, ..BreakerPolicy::default() });
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.record_failure("shared");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.snapshot("shared").consecutive_failures, 800);
    }
}
