//! Per-key plan cache.
//!
//! Planning is slow, so every variable set is planned at most once per
//! process. The first caller for a key computes the plan; concurrent callers
//! for the same key block on that key's cell and then share the result.
//! Unrelated keys never wait on one another: the map lock is held only long
//! enough to find or insert a key's cell.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use plancheck_plan::{Plan, PlanDriver, PlanError, VariableSet};

use crate::error::CacheError;

type Cell<V> = Arc<OnceLock<Result<Arc<V>, CacheError>>>;

/// Computes each key's value once and hands out shared references.
#[derive(Debug)]
pub struct PlanCache<V = Plan> {
    cells: Mutex<HashMap<String, Cell<V>>>,
}

impl<V> Default for PlanCache<V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> PlanCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `plan_fn` if no caller has yet.
    ///
    /// A failed computation is cached too: every caller for the key receives
    /// the same error and `plan_fn` is not retried.
    pub fn get<F>(&self, key: &str, plan_fn: F) -> Result<Arc<V>, CacheError>
    where
        F: FnOnce() -> Result<V, PlanError>,
    {
        let cell = Arc::clone(self.cells.lock().entry(key.to_string()).or_default());

        let mut computed = false;
        let result = cell.get_or_init(|| {
            computed = true;
            tracing::debug!(key, "plan cache miss");
            plan_fn().map(Arc::new).map_err(|e| CacheError {
                key: key.to_string(),
                source: Arc::new(e),
            })
        });
        if !computed {
            tracing::debug!(key, "plan cache hit");
        }
        result.clone()
    }

    /// Keys with a finished computation.
    #[must_use]
    pub fn completed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .cells
            .lock()
            .iter()
            .filter(|(_, cell)| cell.get().is_some())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PlanCache<Plan> {
    /// Plan `vars` through `driver`, keyed by [`VariableSet::cache_key`].
    pub fn plan<D>(&self, driver: &D, vars: &VariableSet) -> Result<Arc<Plan>, CacheError>
    where
        D: PlanDriver + ?Sized,
    {
        self.get(&vars.cache_key(), || driver.plan(vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_get_returns_same_arc_without_recomputing() {
        let cache: PlanCache<String> = PlanCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("plan".to_string())
        };
        let a = cache.get("default", compute).unwrap();
        let b = cache.get("default", compute).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.completed_keys(), vec!["default".to_string()]);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        const THREADS: usize = 16;
        let cache: Arc<PlanCache<String>> = Arc::new(PlanCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let (cache, calls, barrier) = (Arc::clone(&cache), Arc::clone(&calls), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get("acr-premium", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok("premium".to_string())
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn failures_are_shared_by_every_caller() {
        let cache: PlanCache<String> = PlanCache::new();
        let calls = AtomicUsize::new(0);
        let failing = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PlanError::Tool {
                command: "terraform plan".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Error: Missing required argument".to_string(),
            })
        };
        let first = cache.get("rbac", failing).unwrap_err();
        let second = cache.get("rbac", failing).unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.source, &second.source));
        assert_eq!(first.plan_error().tool_output(), Some("Error: Missing required argument"));
        assert_eq!(first.key, "rbac");
    }

    #[test]
    fn unrelated_keys_do_not_wait_on_each_other() {
        let cache: Arc<PlanCache<u32>> = Arc::new(PlanCache::new());
        let started = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let slow = {
            let (cache, started, release) = (Arc::clone(&cache), Arc::clone(&started), Arc::clone(&release));
            thread::spawn(move || {
                cache
                    .get("slow", || {
                        started.wait();
                        release.wait();
                        Ok(1)
                    })
                    .unwrap()
            })
        };

        started.wait();
        // "slow" is mid-computation; another key must still complete.
        assert_eq!(*cache.get("fast", || Ok(2)).unwrap(), 2);
        release.wait();
        assert_eq!(*slow.join().unwrap(), 1);
        assert_eq!(cache.len(), 2);
    }
}
