//! Data sources used for testing the wrapper layers: an instrumented
//! store that counts its operations and a computed source.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::memory::MemoryDataSource;
use super::{DataSource, Dataset, PipelineError, Queryable};
use crate::query::Criteria;

/// A pass-through store that counts get/set/query invocations, for
/// asserting cache and resolution behavior.  Clones share both the
/// storage and the counters.
#[derive(Debug, Clone)]
pub struct CountingStore<K, V> {
    inner: MemoryDataSource<K, V>,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
}

impl<K: Eq + Hash, V> CountingStore<K, V> {
    pub fn new() -> Self {
        CountingStore::wrap(MemoryDataSource::new())
    }

    pub fn with_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        CountingStore::wrap(MemoryDataSource::with_items(items))
    }

    fn wrap(inner: MemoryDataSource<K, V>) -> Self {
        CountingStore {
            inner,
            gets: Arc::new(AtomicUsize::new(0)),
            sets: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for CountingStore<K, V> {
    fn default() -> Self {
        CountingStore::new()
    }
}

#[async_trait]
impl<K, V> DataSource for CountingStore<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Output = V;

    async fn get(&self, key: K) -> Result<V, PipelineError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }
}

#[async_trait]
impl<K, V> Dataset for CountingStore<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: K, value: V) -> Result<(), PipelineError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: K) -> Result<(), PipelineError> {
        self.inner.delete(key).await
    }
}

#[async_trait]
impl<V> Queryable for CountingStore<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    type Id = String;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<String>, PipelineError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(criteria).await
    }
}

/// Computed source: every key maps to its square.
#[derive(Debug, Clone, Default)]
pub struct SquareSource;

#[async_trait]
impl DataSource for SquareSource {
    type Key = i64;
    type Output = i64;

    async fn get(&self, key: i64) -> Result<i64, PipelineError> {
        Ok(key * key)
    }
}
