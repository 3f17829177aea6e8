use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{DataSource, Dataset, PipelineError, Queryable};
use crate::query::Criteria;

/// In-memory key-value store.  Not meant for big payloads; primarily used
/// as a cache sink, a resolution cache, or a fixture source.
///
/// Clones share the underlying storage.
#[derive(Debug, Clone)]
pub struct MemoryDataSource<K, V> {
    items: Arc<Mutex<HashMap<K, V>>>,
}

impl<K: Eq + Hash, V> MemoryDataSource<K, V> {
    pub fn new() -> Self {
        MemoryDataSource {
            items: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        MemoryDataSource {
            items: Arc::new(Mutex::new(items.into_iter().collect())),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locked(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<K, V>>, PipelineError> {
        self.items
            .lock()
            .map_err(|er| PipelineError::Generic(format!("poisoned store lock: {}", er)))
    }
}

impl<K: Eq + Hash, V> Default for MemoryDataSource<K, V> {
    fn default() -> Self {
        MemoryDataSource::new()
    }
}

#[async_trait]
impl<K, V> DataSource for MemoryDataSource<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Output = V;

    async fn get(&self, key: K) -> Result<V, PipelineError> {
        let items = self.locked()?;
        items
            .get(&key)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(&key, "key not present in memory store"))
    }
}

#[async_trait]
impl<K, V> Dataset for MemoryDataSource<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: K, value: V) -> Result<(), PipelineError> {
        let mut items = self.locked()?;
        items.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: K) -> Result<(), PipelineError> {
        let mut items = self.locked()?;
        items
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| PipelineError::not_found(&key, "key not present in memory store"))
    }
}

/// String-keyed stores can be queried by key prefix: the only recognized
/// criterion is `prefix`; any other criterion is rejected.  Matching keys
/// are returned sorted.
#[async_trait]
impl<V> Queryable for MemoryDataSource<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    type Id = String;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<String>, PipelineError> {
        for (name, _) in criteria.iter() {
            if name != "prefix" {
                return Err(PipelineError::Configuration(format!(
                    "unexpected query criterion: `{}`",
                    name
                )));
            }
        }
        let prefix = match criteria.get("prefix") {
            Some(JsonValue::String(prefix)) => prefix.clone(),
            Some(other) => {
                return Err(PipelineError::Configuration(format!(
                    "`prefix` criterion must be a string, got `{}`",
                    other
                )));
            }
            None => String::new(),
        };

        let items = self.locked()?;
        let mut keys: Vec<String> = items
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
