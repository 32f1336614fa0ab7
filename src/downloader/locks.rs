//! Keyed async locks so the existence-check-then-create sequence for one
//! shortcode never runs twice at the same time.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per shortcode, created on demand
#[derive(Clone, Default)]
pub struct ShortcodeLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ShortcodeLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `shortcode`; released when the guard drops
    pub async fn lock(&self, shortcode: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.inner.lock().await;
            // Drop entries nobody holds or waits on
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table.entry(shortcode.to_string()).or_default().clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
