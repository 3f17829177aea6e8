use std::fmt::Debug;

use async_trait::async_trait;

use super::{BoxedDataSource, DataSource, PipelineError};

/// Strategy to search for keys in a [MultiSource].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySearchStrategy {
    /// Search every sub-datasource and return the de-duplicated results.
    All,
    /// Stop at the first sub-datasource that holds the key.
    First,
}

impl Default for KeySearchStrategy {
    fn default() -> Self {
        KeySearchStrategy::All
    }
}

/// A datasource composed of multiple sub-datasources sharing one key
/// space.  A key is looked up in declaration order; with
/// [KeySearchStrategy::First] the earliest holder wins, with
/// [KeySearchStrategy::All] every match contributes and duplicate values
/// are dropped.
pub struct MultiSource<K, V> {
    datasources: Vec<BoxedDataSource<K, V>>,
    search_strategy: KeySearchStrategy,
}

impl<K, V> MultiSource<K, V>
where
    K: Debug + Send + 'static,
    V: Send + 'static,
{
    pub fn new(
        datasources: Vec<BoxedDataSource<K, V>>,
        search_strategy: KeySearchStrategy,
    ) -> Result<Self, PipelineError> {
        if datasources.is_empty() {
            return Err(PipelineError::composition(
                "MultiSource requires at least one sub-datasource",
            ));
        }
        Ok(MultiSource {
            datasources,
            search_strategy,
        })
    }
}

#[async_trait]
impl<K, V> DataSource for MultiSource<K, V>
where
    K: Clone + Debug + Send + Sync + 'static,
    V: PartialEq + Send + Sync + 'static,
{
    type Key = K;
    type Output = Vec<V>;

    async fn get(&self, key: K) -> Result<Vec<V>, PipelineError> {
        let mut values: Vec<V> = Vec::new();
        let mut found = false;
        for datasource in &self.datasources {
            match datasource.get(key.clone()).await {
                Ok(value) => {
                    found = true;
                    if !values.contains(&value) {
                        values.push(value);
                    }
                    if self.search_strategy == KeySearchStrategy::First {
                        break;
                    }
                }
                Err(PipelineError::NotFound { .. }) => continue,
                Err(er) => return Err(er),
            }
        }

        if found {
            Ok(values)
        } else {
            Err(PipelineError::not_found(
                &key,
                "no sub-datasource holds this key",
            ))
        }
    }
}
