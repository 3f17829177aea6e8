//! Read-through/write-through caching of a source's results.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::context::RunContext;
use crate::datasource::{
    DataSource, Dataset, MultiKeyDataSource, PipelineError, Queryable,
};
use crate::lock::KeyLock;
use crate::query::Criteria;

pub type SkipPredicate<K, V> = Arc<dyn Fn(&K, &V) -> bool + Send + Sync>;

/// A source whose results are made durable in a cache-like sink.
///
/// Per-key protocol: try the sink; on a miss load from the source, store
/// to the sink and read the sink again.  The re-read is intentional: the
/// sink may transform the value on the way in (e.g. serialize it), so the
/// authoritative value is what the sink reports back, not the in-memory
/// value produced by the source.
pub struct Cached<S: DataSource, C> {
    source: S,
    sink: C,
    skip_if: Option<SkipPredicate<S::Key, S::Output>>,
    lock: Option<Arc<dyn KeyLock>>,
}

impl<S: DataSource, C> Cached<S, C> {
    pub fn new(source: S, sink: C) -> Self {
        Cached {
            source,
            sink,
            skip_if: None,
            lock: None,
        }
    }

    /// Do not populate the sink when the predicate matches the freshly
    /// loaded value; the value is returned directly instead.  Used to
    /// avoid caching not-yet-final data.
    pub fn with_skip_if<F>(mut self, skip_if: F) -> Self
    where
        F: Fn(&S::Key, &S::Output) -> bool + Send + Sync + 'static,
    {
        self.skip_if = Some(Arc::new(skip_if));
        self
    }

    /// Serialize cache fills through a per-key named lock.
    pub fn with_lock(mut self, lock: Arc<dyn KeyLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }
}

#[async_trait]
impl<S, C> DataSource for Cached<S, C>
where
    S: DataSource,
    S::Key: Clone,
    C: Dataset<Key = S::Key, Output = S::Output>,
{
    type Key = S::Key;
    type Output = S::Output;

    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError> {
        match self.sink.get(key.clone()).await {
            Ok(value) => {
                log::debug!("data for key {:?} loaded from cache", key);
                Ok(value)
            }
            Err(PipelineError::NotFound { .. }) => {
                log::debug!(
                    "data for key {:?} not found in cache, loading from the original source",
                    key
                );
                let _guard = match &self.lock {
                    Some(lock) => Some(lock.acquire(&format!("{:?}", key)).await?),
                    None => None,
                };

                let data = self.source.get(key.clone()).await?;
                if let Some(skip_if) = &self.skip_if {
                    if skip_if(&key, &data) {
                        log::debug!(
                            "skip predicate matched for key {:?}, bypassing cache fill",
                            key
                        );
                        return Ok(data);
                    }
                }
                self.sink.set(key.clone(), data).await?;
                log::debug!("data for key {:?} saved to cache", key);
                // do not return the loaded value directly, the sink may
                // have transformed it
                self.sink.get(key).await
            }
            Err(er) => Err(er),
        }
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

#[async_trait]
impl<S, C> MultiKeyDataSource for Cached<S, C>
where
    S: DataSource,
    S::Key: Clone,
    C: Dataset<Key = S::Key, Output = S::Output>,
{
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError> {
        // no batch semantics at this layer; parallelism, if any, must come
        // from a wrapping fan-out layer
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl<S, C> Queryable for Cached<S, C>
where
    S: DataSource + Queryable,
    C: Send + Sync,
{
    type Id = <S as Queryable>::Id;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<Self::Id>, PipelineError> {
        self.source.query(criteria).await
    }
}

/// Skip predicate for volatile data: skips the cache fill whenever the
/// extracted timestamp is later than `cutoff` (e.g. today's archive that
/// is not final yet).
pub fn skip_newer_than<K, V, F>(cutoff: DateTime<Utc>, timestamp: F) -> SkipPredicate<K, V>
where
    F: Fn(&K, &V) -> Option<DateTime<Utc>> + Send + Sync + 'static,
{
    Arc::new(move |key, value| {
        timestamp(key, value)
            .map(|ts| ts > cutoff)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_skip_newer_than() {
        let cutoff = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let skip = skip_newer_than(cutoff, |_key: &String, value: &DateTime<Utc>| {
            Some(*value)
        });

        let fresh = Utc.with_ymd_and_hms(2023, 4, 2, 0, 0, 0).unwrap();
        let settled = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
        assert!(skip(&"k".to_string(), &fresh));
        assert!(!skip(&"k".to_string(), &settled));
    }
}
