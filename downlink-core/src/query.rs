//! Address a queryable source by a high-level key.
//!
//! A component exposing only `query(criteria) -> ids` becomes a
//! [DataSource] addressable by e.g. a time specification: the key is first
//! bound to criteria, the criteria are resolved to underlying ids, and the
//! items are fetched by those ids.  An optional second-level cache
//! memoizes key-to-ids resolutions.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::context::RunContext;
use crate::datasource::{
    DataSource, Dataset, MultiKeyDataSource, PipelineError, Queryable,
};

/// Named query criteria, the typed replacement for keyword arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria(BTreeMap<String, JsonValue>);

impl Criteria {
    pub fn new() -> Self {
        Criteria::default()
    }

    pub fn with<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<JsonValue>,
    {
        self.set(name, value);
        self
    }

    pub fn set<N, V>(&mut self, name: N, value: V)
    where
        N: Into<String>,
        V: Into<JsonValue>,
    {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Build criteria from a JSON value, which must be an object.
    pub fn from_value(value: JsonValue) -> Result<Criteria, PipelineError> {
        match value {
            JsonValue::Object(map) => Ok(Criteria(map.into_iter().collect())),
            other => Err(PipelineError::InvalidKey(format!(
                "expected a mapping, got `{}`",
                other
            ))),
        }
    }

    /// Build criteria from any value that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Criteria, PipelineError> {
        let value = serde_json::to_value(value)
            .map_err(|er| PipelineError::Generic(er.to_string()))?;
        Criteria::from_value(value)
    }
}

/// How an incoming high-level key becomes query criteria.
pub enum KeyBinding<Q> {
    /// The key itself must already be a mapping (serialize to an object).
    AsCriteria,
    /// Wrap the key into a one-entry mapping under this field name.
    Field(String),
    /// Preprocess the key with an arbitrary function.
    With(Arc<dyn Fn(&Q) -> Result<Criteria, PipelineError> + Send + Sync>),
}

impl<Q> KeyBinding<Q> {
    pub fn field<N: Into<String>>(name: N) -> Self {
        KeyBinding::Field(name.into())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Q) -> Result<Criteria, PipelineError> + Send + Sync + 'static,
    {
        KeyBinding::With(Arc::new(f))
    }
}

impl<Q> Clone for KeyBinding<Q> {
    fn clone(&self) -> Self {
        match self {
            KeyBinding::AsCriteria => KeyBinding::AsCriteria,
            KeyBinding::Field(name) => KeyBinding::Field(name.clone()),
            KeyBinding::With(f) => KeyBinding::With(f.clone()),
        }
    }
}

impl<Q: Serialize + Debug> KeyBinding<Q> {
    pub fn bind(&self, key: &Q) -> Result<Criteria, PipelineError> {
        match self {
            KeyBinding::AsCriteria => Criteria::from_serialize(key).map_err(|er| {
                match er {
                    PipelineError::InvalidKey(_) => PipelineError::InvalidKey(format!(
                        "key {:?} does not bind to a criteria mapping",
                        key
                    )),
                    other => other,
                }
            }),
            KeyBinding::Field(name) => {
                let value = serde_json::to_value(key)
                    .map_err(|er| PipelineError::Generic(er.to_string()))?;
                Ok(Criteria::new().with(name.clone(), value))
            }
            KeyBinding::With(f) => f(key),
        }
    }
}

/// Second-level cache mapping a high-level key to resolved underlying ids.
pub type ResolutionCache<Q, Id> = Box<dyn Dataset<Key = Q, Output = Vec<Id>>>;

/// A queryable source addressed by a high-level key.
///
/// `get(key)` returns all items matching the resolved ids, in resolution
/// order.
pub struct Queried<Q, S>
where
    Q: Debug + Send + 'static,
    S: DataSource,
{
    source: S,
    binding: KeyBinding<Q>,
    resolution_cache: Option<ResolutionCache<Q, S::Key>>,
}

impl<Q, S> Queried<Q, S>
where
    Q: Debug + Send + 'static,
    S: DataSource,
{
    pub fn new(source: S, binding: KeyBinding<Q>) -> Self {
        Queried {
            source,
            binding,
            resolution_cache: None,
        }
    }

    /// Memoize key-to-ids resolutions so that repeated queries with the
    /// same high-level key skip re-querying.
    pub fn with_resolution_cache(mut self, cache: ResolutionCache<Q, S::Key>) -> Self {
        self.resolution_cache = Some(cache);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<Q, S> Queried<Q, S>
where
    Q: Serialize + Debug + Clone + Send + Sync + 'static,
    S: DataSource + Queryable<Id = <S as DataSource>::Key>,
    <S as DataSource>::Key: Clone,
{
    async fn resolve(&self, key: &Q) -> Result<Vec<<S as DataSource>::Key>, PipelineError> {
        match &self.resolution_cache {
            Some(cache) => match cache.get(key.clone()).await {
                Ok(ids) => {
                    log::debug!("resolution for query key {:?} found in cache", key);
                    Ok(ids)
                }
                Err(PipelineError::NotFound { .. }) => {
                    log::debug!(
                        "resolution for query key {:?} not found in cache, running the query",
                        key
                    );
                    let criteria = self.binding.bind(key)?;
                    let ids = self.source.query(&criteria).await?;
                    cache.set(key.clone(), ids.clone()).await?;
                    log::debug!("resolution for query key {:?} saved to cache", key);
                    Ok(ids)
                }
                Err(er) => Err(er),
            },
            None => {
                let criteria = self.binding.bind(key)?;
                log::debug!("resolving query key {:?} directly", key);
                self.source.query(&criteria).await
            }
        }
    }
}

#[async_trait]
impl<Q, S> DataSource for Queried<Q, S>
where
    Q: Serialize + Debug + Clone + Send + Sync + 'static,
    S: DataSource + Queryable<Id = <S as DataSource>::Key>,
    <S as DataSource>::Key: Clone,
{
    type Key = Q;
    type Output = Vec<<S as DataSource>::Output>;

    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError> {
        let ids = self.resolve(&key).await?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            items.push(self.source.get(id).await?);
        }
        log::debug!("loaded {} items for query key {:?}", items.len(), key);
        Ok(items)
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

#[async_trait]
impl<Q, S> MultiKeyDataSource for Queried<Q, S>
where
    Q: Serialize + Debug + Clone + Send + Sync + 'static,
    S: DataSource + Queryable<Id = <S as DataSource>::Key>,
    <S as DataSource>::Key: Clone,
{
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError> {
        // resolutions are independent; parallelism comes from an outer
        // fan-out layer
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_builder() {
        let criteria = Criteria::new().with("satellite", "metop-a").with("limit", 5);
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria.get("satellite"), Some(&JsonValue::from("metop-a")));
        assert_eq!(criteria.get("limit"), Some(&JsonValue::from(5)));
    }

    #[test]
    fn test_criteria_from_serialize() {
        #[derive(Serialize)]
        struct TimeRange {
            start: String,
            end: String,
        }

        let criteria = Criteria::from_serialize(&TimeRange {
            start: "2023-04-01".to_string(),
            end: "2023-04-02".to_string(),
        })
        .unwrap();
        assert_eq!(criteria.get("start"), Some(&JsonValue::from("2023-04-01")));

        let err = Criteria::from_serialize(&"just a string").unwrap_err();
        match err {
            PipelineError::InvalidKey(_) => {}
            other => panic!("expected InvalidKey, got {:?}", other),
        }
    }

    #[test]
    fn test_binding_modes() {
        #[derive(Serialize, Debug, Clone)]
        struct MappingKey {
            x: i64,
        }

        // the key itself is already a mapping
        let binding: KeyBinding<MappingKey> = KeyBinding::AsCriteria;
        let criteria = binding.bind(&MappingKey { x: 7 }).unwrap();
        assert_eq!(criteria.get("x"), Some(&JsonValue::from(7)));

        // a scalar key cannot bind as a mapping
        let binding: KeyBinding<i64> = KeyBinding::AsCriteria;
        match binding.bind(&7) {
            Err(PipelineError::InvalidKey(_)) => {}
            other => panic!("expected InvalidKey, got {:?}", other),
        }

        // a scalar key is wrapped under the given field name
        let binding: KeyBinding<i64> = KeyBinding::field("x");
        let criteria = binding.bind(&7).unwrap();
        assert_eq!(criteria.get("x"), Some(&JsonValue::from(7)));

        // arbitrary preprocessing
        let binding: KeyBinding<i64> =
            KeyBinding::with(|key| Ok(Criteria::new().with("x", *key).with("y", 3)));
        let criteria = binding.bind(&1).unwrap();
        assert_eq!(criteria.get("x"), Some(&JsonValue::from(1)));
        assert_eq!(criteria.get("y"), Some(&JsonValue::from(3)));
    }
}
