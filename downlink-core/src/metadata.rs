//! Out-of-band metadata that travels with pipeline values.
//!
//! Transforms frequently produce brand-new values (an unzip produces new
//! buffers), which would lose provenance such as the original filename or
//! the requested key.  Wrapping a value in an [Envelope] keeps a metadata
//! mapping attached through every composition step; [keep_meta] lifts a
//! plain transform so that metadata present on its input is copied onto
//! its output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::datasource::PipelineError;
use crate::transform::{FnTransform, Transform};

/// Named auxiliary attributes attached to a pipeline value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<String, JsonValue>);

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
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

    /// Store any serializable value under `name`.
    pub fn set_serialized<N, V>(&mut self, name: N, value: &V) -> Result<(), PipelineError>
    where
        N: Into<String>,
        V: Serialize,
    {
        let value = serde_json::to_value(value)
            .map_err(|er| PipelineError::Generic(er.to_string()))?;
        self.0.insert(name.into(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.0.remove(name)
    }

    pub fn clear(&mut self) {
        self.0.clear()
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

    /// Merge entries of `other` into `self`.  Entries already present in
    /// `self` win on conflict.
    pub fn merge(&mut self, other: &Metadata) {
        for (name, value) in other.iter() {
            self.0
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// A pipeline value together with its metadata.
///
/// The metadata is owned by the envelope: it is dropped with the value and
/// can never outlive it, and attaching it cannot fail for any value type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope<T> {
    value: T,
    metadata: Metadata,
}

impl<T> Envelope<T> {
    pub fn new(value: T) -> Self {
        Envelope {
            value,
            metadata: Metadata::new(),
        }
    }

    pub fn with_meta(value: T, metadata: Metadata) -> Self {
        Envelope { value, metadata }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Unwrap the value, discarding the metadata.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, Metadata) {
        (self.value, self.metadata)
    }

    /// Transform the value while carrying the metadata over to the result.
    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        Envelope {
            value: f(self.value),
            metadata: self.metadata,
        }
    }

    pub fn try_map<U, E, F>(self, f: F) -> Result<Envelope<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(Envelope {
            value: f(self.value)?,
            metadata: self.metadata,
        })
    }
}

/// Lift a transform to the envelope level: metadata present on the input
/// is copied onto the output, even though the output is a new value.
pub struct KeepMeta<T> {
    inner: T,
}

pub fn keep_meta<T: Transform>(inner: T) -> KeepMeta<T> {
    KeepMeta { inner }
}

/// [keep_meta] for a plain function.
pub fn keep_meta_fn<F, I, O>(
    f: F,
) -> KeepMeta<FnTransform<impl Fn(I) -> Result<O, PipelineError>, I, O>>
where
    F: Fn(I) -> O + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    keep_meta(crate::transform::transform_fn(f))
}

impl<T: Transform> Transform for KeepMeta<T> {
    type Input = Envelope<T::Input>;
    type Output = Envelope<T::Output>;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let (value, metadata) = input.into_parts();
        let output = self.inner.apply(value)?;
        Ok(Envelope::with_meta(output, metadata))
    }
}
