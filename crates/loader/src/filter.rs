//! Blacklist filtering in front of another loader.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jadep_core::{Package, Result};

use crate::Loader;

/// A loader that drops blacklisted packages before delegating.
///
/// The underlying loader is never asked to load a blacklisted package, so
/// such packages behave exactly like absent ones.
pub struct FilteringLoader {
    inner: Arc<dyn Loader>,
    blacklisted_packages: HashSet<String>,
}

impl FilteringLoader {
    pub fn new(inner: Arc<dyn Loader>, blacklisted_packages: HashSet<String>) -> FilteringLoader {
        FilteringLoader {
            inner,
            blacklisted_packages,
        }
    }
}

#[async_trait]
impl Loader for FilteringLoader {
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        let filtered: Vec<String> = packages
            .iter()
            .filter(|p| !self.blacklisted_packages.contains(*p))
            .cloned()
            .collect();
        self.inner.load(&filtered).await
    }
}
