//! Concurrent duplicate-suppressing cache for package loads.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use jadep_core::{Error, Package, Result};

use crate::Loader;

/// A concurrent duplicate-suppressing cache for results from a loader.
///
/// It wraps another loader `L` and guarantees each requested package is
/// loaded at most once. For example, `load(a, b)` followed by `load(b, c)`
/// results in `L.load(a, b)` and `L.load(c)`; `b` is requested once.
/// Concurrent callers requesting an in-flight package await the same entry.
///
/// If loading a batch fails, the failure is cached for every package in the
/// batch and loading is not re-attempted. In particular, it's possible to
/// poison the cache for `P` by loading `[P, BadPkg]` first.
pub struct CachingLoader {
    inner: Arc<dyn Loader>,
    cache: Mutex<HashMap<String, Entry>>,
}

/// The cached outcome for one package: the package (or absence), and the
/// batch error if its batch failed.
#[derive(Clone, Default)]
struct Outcome {
    value: Option<Arc<Package>>,
    err: Option<Arc<Error>>,
}

/// A per-package slot, born pending and completed exactly once.
#[derive(Clone)]
struct Entry {
    rx: watch::Receiver<Option<Outcome>>,
}

impl CachingLoader {
    pub fn new(inner: Arc<dyn Loader>) -> CachingLoader {
        CachingLoader {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Loader for CachingLoader {
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        // Lookup-or-insert under the lock; the RPC below runs outside it.
        let mut work = Vec::new();
        let mut all = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            for p in packages {
                match cache.get(p) {
                    Some(entry) => all.push((p.clone(), entry.rx.clone())),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        cache.insert(p.clone(), Entry { rx: rx.clone() });
                        work.push((p.clone(), tx));
                        all.push((p.clone(), rx));
                    }
                }
            }
        }

        if !work.is_empty() {
            let to_load: Vec<String> = work.iter().map(|(name, _)| name.clone()).collect();
            // The guard completes the pending entries even if this future is
            // dropped mid-RPC, so concurrent callers never hang on them.
            let guard = FillGuard { pending: work };
            let outcome = self.inner.load(&to_load).await;
            guard.complete(outcome);
        }

        let mut result = HashMap::new();
        let mut errors = Vec::new();
        for (name, mut rx) in all {
            let outcome = {
                let slot = rx
                    .wait_for(|v| v.is_some())
                    .await
                    .map_err(|_| Error::Cancelled)?;
                slot.clone().unwrap_or_default()
            };
            if let Some(pkg) = outcome.value {
                result.insert(name, pkg);
            }
            if let Some(err) = outcome.err {
                let msg = err.to_string();
                if !errors.contains(&msg) {
                    errors.push(msg);
                }
            }
        }
        if !errors.is_empty() {
            return Err(Error::load(format!(
                "errors when loading packages: {}",
                errors.join("; ")
            )));
        }
        Ok(result)
    }
}

/// Completes a batch of pending cache entries exactly once: either with the
/// loader's outcome, or with a cancellation error if dropped unfinished.
struct FillGuard {
    pending: Vec<(String, watch::Sender<Option<Outcome>>)>,
}

impl FillGuard {
    fn complete(mut self, outcome: Result<HashMap<String, Arc<Package>>>) {
        let pending = std::mem::take(&mut self.pending);
        match outcome {
            Ok(pkgs) => {
                for (name, tx) in pending {
                    let _ = tx.send(Some(Outcome {
                        value: pkgs.get(&name).cloned(),
                        err: None,
                    }));
                }
            }
            Err(err) => {
                let err = Arc::new(err);
                for (_, tx) in pending {
                    let _ = tx.send(Some(Outcome {
                        value: None,
                        err: Some(Arc::clone(&err)),
                    }));
                }
            }
        }
    }
}

impl Drop for FillGuard {
    fn drop(&mut self) {
        for (_, tx) in self.pending.drain(..) {
            let _ = tx.send(Some(Outcome {
                value: None,
                err: Some(Arc::new(Error::Cancelled)),
            }));
        }
    }
}
