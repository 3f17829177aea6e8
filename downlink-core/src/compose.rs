//! Combinators for building acquisition pipelines.
//!
//! The directionality contract: `source.then(transform)` modifies the
//! source's *output*, `source.map_key(transform)` modifies the source's
//! *input key*.  Swapping the two changes meaning, not just syntax.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::Cached;
use crate::context::RunContext;
use crate::datasource::{
    DataSource, Dataset, MultiKeyDataSource, PipelineError, Queryable,
};
use crate::query::{Criteria, KeyBinding, Queried};
use crate::transform::Transform;

/// A source whose output is post-processed by a transform:
/// `get(k) == transform.apply(source.get(k))`.
pub struct OutputMapped<S, T> {
    source: S,
    transform: T,
    context: Option<RunContext>,
}

impl<S, T> OutputMapped<S, T> {
    pub fn new(source: S, transform: T) -> Self {
        OutputMapped {
            source,
            transform,
            context: None,
        }
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S, T> DataSource for OutputMapped<S, T>
where
    S: DataSource,
    T: Transform<Input = S::Output>,
{
    type Key = S::Key;
    type Output = T::Output;

    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError> {
        let data = self.source.get(key).await?;
        let result = self.transform.apply(data)?;
        log::debug!("applied output transform after source fetch");
        Ok(result)
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

#[async_trait]
impl<S, T> MultiKeyDataSource for OutputMapped<S, T>
where
    S: DataSource,
    T: Transform<Input = S::Output>,
{
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError> {
        let context = self
            .context
            .clone()
            .or_else(|| self.source.default_context())
            .unwrap_or_default();
        context.map(keys, |key| self.get(key)).await
    }
}

#[async_trait]
impl<S, T> Queryable for OutputMapped<S, T>
where
    S: Queryable,
    T: Send + Sync,
{
    type Id = S::Id;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<Self::Id>, PipelineError> {
        self.source.query(criteria).await
    }
}

/// A source whose key is pre-processed by a transform:
/// `get(k) == source.get(transform.apply(k))`.
pub struct KeyMapped<S, T> {
    source: S,
    transform: T,
    context: Option<RunContext>,
}

impl<S, T> KeyMapped<S, T> {
    pub fn new(source: S, transform: T) -> Self {
        KeyMapped {
            source,
            transform,
            context: None,
        }
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S, T> DataSource for KeyMapped<S, T>
where
    S: DataSource,
    T: Transform<Output = S::Key>,
    T::Input: Debug,
{
    type Key = T::Input;
    type Output = S::Output;

    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError> {
        let new_key = self.transform.apply(key)?;
        log::debug!("applied input transform, fetching key {:?}", new_key);
        self.source.get(new_key).await
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

#[async_trait]
impl<S, T> MultiKeyDataSource for KeyMapped<S, T>
where
    S: DataSource,
    T: Transform<Output = S::Key>,
    T::Input: Debug,
{
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError> {
        let context = self
            .context
            .clone()
            .or_else(|| self.source.default_context())
            .unwrap_or_default();
        context.map(keys, |key| self.get(key)).await
    }
}

#[async_trait]
impl<S, T> Queryable for KeyMapped<S, T>
where
    S: Queryable,
    T: Send + Sync,
{
    type Id = S::Id;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<Self::Id>, PipelineError> {
        self.source.query(criteria).await
    }
}

/// Applies a transform to the *entire* result of a multi-key fetch, as
/// opposed to element-wise.  The transform may change arity, e.g. flatten
/// nested per-key results into one flat sequence.
pub struct Reduced<S, T> {
    source: S,
    transform: T,
}

impl<S, T> Reduced<S, T> {
    pub fn new(source: S, transform: T) -> Self {
        Reduced { source, transform }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S, T> DataSource for Reduced<S, T>
where
    S: MultiKeyDataSource,
    T: Transform<Input = Vec<S::Output>>,
{
    type Key = Vec<S::Key>;
    type Output = T::Output;

    async fn get(&self, keys: Self::Key) -> Result<Self::Output, PipelineError> {
        let data = self.source.get_many(keys).await?;
        let result = self.transform.apply(data)?;
        log::debug!("applied reduce transform on multi-key result");
        Ok(result)
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

/// Upgrades a single-key source to a [MultiKeyDataSource] by element-wise
/// fan-out, optionally concurrent per the resolved [RunContext].
pub struct FanOut<S> {
    source: S,
    context: Option<RunContext>,
}

impl<S> FanOut<S> {
    pub fn new(source: S) -> Self {
        FanOut {
            source,
            context: None,
        }
    }

    /// Already multi-key; wrapping again is a no-op.
    pub fn fan_out(self) -> Self {
        self
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[async_trait]
impl<S> DataSource for FanOut<S>
where
    S: DataSource,
{
    type Key = S::Key;
    type Output = S::Output;

    async fn get(&self, key: Self::Key) -> Result<Self::Output, PipelineError> {
        self.source.get(key).await
    }

    fn default_context(&self) -> Option<RunContext> {
        self.source.default_context()
    }
}

#[async_trait]
impl<S> MultiKeyDataSource for FanOut<S>
where
    S: DataSource,
{
    async fn get_many(
        &self,
        keys: Vec<Self::Key>,
    ) -> Result<Vec<Self::Output>, PipelineError> {
        let context = self
            .context
            .clone()
            .or_else(|| self.source.default_context())
            .unwrap_or_default();
        context.map(keys, |key| self.source.get(key)).await
    }
}

#[async_trait]
impl<S> Dataset for FanOut<S>
where
    S: Dataset,
{
    async fn set(&self, key: Self::Key, value: Self::Output) -> Result<(), PipelineError> {
        self.source.set(key, value).await
    }

    async fn delete(&self, key: Self::Key) -> Result<(), PipelineError> {
        self.source.delete(key).await
    }
}

#[async_trait]
impl<S> Queryable for FanOut<S>
where
    S: Queryable,
{
    type Id = S::Id;

    async fn query(&self, criteria: &Criteria) -> Result<Vec<Self::Id>, PipelineError> {
        self.source.query(criteria).await
    }
}

/// Builder methods for composing sources with transforms and wrappers.
pub trait DataSourceExt: DataSource + Sized {
    /// Post-process this source's output:
    /// `source.then(t).get(k) == t.apply(source.get(k))`.
    fn then<T>(self, transform: T) -> OutputMapped<Self, T>
    where
        T: Transform<Input = Self::Output>,
    {
        OutputMapped::new(self, transform)
    }

    /// Pre-process this source's key:
    /// `source.map_key(t).get(k) == source.get(t.apply(k))`.
    fn map_key<T>(self, transform: T) -> KeyMapped<Self, T>
    where
        T: Transform<Output = Self::Key>,
        T::Input: Debug,
    {
        KeyMapped::new(self, transform)
    }

    /// Apply a transform to the whole result of a multi-key fetch.
    fn reduce<T>(self, transform: T) -> Reduced<Self, T>
    where
        Self: MultiKeyDataSource,
        T: Transform<Input = Vec<Self::Output>>,
    {
        Reduced::new(self, transform)
    }

    /// Accept a sequence of keys, fanning out element-wise.
    fn fan_out(self) -> FanOut<Self> {
        FanOut::new(self)
    }

    /// Consult `sink` before this source and populate it after a miss.
    fn cached<C>(self, sink: C) -> Cached<Self, C>
    where
        C: Dataset<Key = Self::Key, Output = Self::Output>,
    {
        Cached::new(self, sink)
    }

    /// Address this queryable source by a high-level key that is first
    /// resolved to underlying ids via `query`.
    fn by_query<Q>(self, binding: KeyBinding<Q>) -> Queried<Q, Self>
    where
        Self: Queryable<Id = <Self as DataSource>::Key>,
        Q: Serialize + Debug + Clone + Send + Sync + 'static,
    {
        Queried::new(self, binding)
    }
}

impl<S: DataSource + Sized> DataSourceExt for S {}
