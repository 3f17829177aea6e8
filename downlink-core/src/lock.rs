//! Key-scoped locking contract for cache/storage collaborators.
//!
//! The core only requires scoped acquisition with guaranteed release (the
//! guard releases on drop, on all exit paths) and independent named locks
//! per string sub-key.  Re-entrancy and cross-process safety are the
//! collaborator's responsibility, not the core's.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::datasource::PipelineError;

/// Held lock; released when dropped.
pub struct LockGuard {
    _inner: Box<dyn Any + Send>,
}

impl LockGuard {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        LockGuard {
            _inner: Box::new(guard),
        }
    }
}

#[async_trait]
pub trait KeyLock: Send + Sync {
    /// Acquire the lock named `key`; held until the guard drops.
    async fn acquire(&self, key: &str) -> Result<LockGuard, PipelineError>;
}

/// Process-local lock registry; one independent lock per name.  The same
/// lock object is always used for the same name, so independent names
/// never contend.
#[derive(Default)]
pub struct MemoryKeyLock {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MemoryKeyLock {
    pub fn new() -> Self {
        MemoryKeyLock::default()
    }
}

#[async_trait]
impl KeyLock for MemoryKeyLock {
    async fn acquire(&self, key: &str) -> Result<LockGuard, PipelineError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|er| {
                PipelineError::Generic(format!("poisoned lock registry: {}", er))
            })?;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        Ok(LockGuard::new(guard))
    }
}
