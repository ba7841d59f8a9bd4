//! One-shot future values for slow background loads.
//!
//! A [`FutureValue`] starts computing at construction time and hands the
//! result to any number of callers through [`FutureValue::get`]. It hides
//! load-at-startup work (blacklists, built-in class lists) behind a
//! non-blocking constructor.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// A one-shot container for a value computed in the background.
#[derive(Clone)]
pub struct FutureValue<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T: Send + Sync + 'static> FutureValue<T> {
    /// Spawns `fut` onto the runtime and returns immediately. The value
    /// becomes available to [`FutureValue::get`] once `fut` completes.
    pub fn spawn<F>(fut: F) -> FutureValue<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            let value = fut.await;
            let _ = tx.send(Some(Arc::new(value)));
        });
        FutureValue { rx }
    }

    /// Returns a future value that resolves immediately to `value`.
    pub fn ready(value: T) -> FutureValue<T> {
        let (_tx, rx) = watch::channel(Some(Arc::new(value)));
        FutureValue { rx }
    }

    /// Waits for the background computation to finish and returns the
    /// cached value. Safe to call any number of times, from any task.
    pub async fn get(&self) -> Result<Arc<T>> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(|v| v.is_some())
            .await
            .map_err(|_| Error::Cancelled)?;
        match slot.as_ref() {
            Some(value) => Ok(Arc::clone(value)),
            None => Err(Error::Cancelled),
        }
    }
}
