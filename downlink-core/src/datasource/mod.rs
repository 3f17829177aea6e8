use async_trait::async_trait;
use std::fmt::Debug;

use crate::context::RunContext;
use crate::query::Criteria;

pub use self::error::PipelineError;

pub mod error;
/// In-memory key-value store
pub mod memory;
/// Various data sources used for testing
pub mod mock;
/// Combine several datasources under one key space
pub mod multi;

pub type BoxedDataSource<K, V> = Box<dyn DataSource<Key = K, Output = V>>;
pub type BoxedDataset<K, V> = Box<dyn Dataset<Key = K, Output = V>>;

/// A source of items addressable by a single key.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Key: Debug + Send + 'static;
    type Output: Send + 'static;

    /// Return the item stored under `key`.  Fails with
    /// [PipelineError::NotFound] when the key is absent.
    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError>;

    /// Component-level run context, consulted by fan-out layers when no
    /// instance-level context was attached.
    fn default_context(&self) -> Option<RunContext> {
        None
    }
}

/// A mutable [DataSource]; the sink side of a cache.
#[async_trait]
pub trait Dataset: DataSource {
    async fn set(&self, key: Self::Key, value: Self::Output) -> Result<(), PipelineError>;

    /// Remove the item stored under `key`.  Fails with
    /// [PipelineError::NotFound] when the key is absent.
    async fn delete(&self, key: Self::Key) -> Result<(), PipelineError>;
}

/// A [DataSource] that additionally accepts an ordered sequence of keys.
///
/// `get_many` returns results in input-key order and fails as a whole if
/// any single key fails; there is no partial-success mode.
#[async_trait]
pub trait MultiKeyDataSource: DataSource {
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError>;
}

/// A component that can resolve search criteria to the ids of matching
/// items.
#[async_trait]
pub trait Queryable: Send + Sync {
    type Id: Send + 'static;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<Self::Id>, PipelineError>;
}
