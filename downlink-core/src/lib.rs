//! Building blocks for keyed acquisition pipelines: compose data sources
//! with transforms, cache their results, resolve query-style keys to
//! underlying ids and fan out multi-key requests, with out-of-band
//! metadata that survives every composition step.

/// Read-through/write-through caching of a source's results
pub mod cache;
/// Combinators wiring sources and transforms together
pub mod compose;
/// Parallelism configuration for fan-out calls
pub mod context;
/// Converters between supported payload kinds
pub mod convert;
pub mod datasource;
/// Key-scoped locking contract for storage collaborators
pub mod lock;
/// Out-of-band metadata that travels with pipeline values
pub mod metadata;
/// Address a queryable source by a high-level key
pub mod query;
pub mod transform;
pub mod utils;

pub mod preamble {
    pub use crate::cache::Cached;
    pub use crate::compose::{DataSourceExt, FanOut, KeyMapped, OutputMapped, Reduced};
    pub use crate::context::RunContext;
    pub use crate::datasource::{
        DataSource, Dataset, MultiKeyDataSource, PipelineError, Queryable,
    };
    pub use crate::metadata::{keep_meta, Envelope, Metadata};
    pub use crate::query::{Criteria, KeyBinding, Queried};
    pub use crate::transform::{compose, transform_fn, Transform, TransformExt};
}

/// deps which are re-exported (and used in the core)
pub mod deps {
    pub use anyhow;
    pub use async_trait::async_trait;
    pub use bytes;
    pub use chrono;
    pub use futures;
    pub use log;
    pub use serde;
    pub use serde_json;
    pub use thiserror;
    pub use tokio;
}
