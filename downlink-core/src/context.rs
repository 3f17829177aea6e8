use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;

use crate::datasource::PipelineError;

pub const NUM_WORKERS: &str = "num_workers";
pub const MAX_WORKERS: &str = "max_workers";

/// Run context describing the desired parallelism of fan-out calls.
///
/// `max_workers` caps `num_workers`; when neither is set execution is
/// strictly serial.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunContext {
    #[serde(default)]
    pub num_workers: Option<usize>,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl RunContext {
    pub fn new() -> Self {
        RunContext::default()
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = Some(num_workers);
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Build a context from named options.
    ///
    /// Only `num_workers` and `max_workers` are recognized; in strict mode
    /// any other name is a configuration error, otherwise it is ignored.
    pub fn from_options<I>(options: I, strict: bool) -> Result<RunContext, PipelineError>
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let mut context = RunContext::default();
        for (name, value) in options {
            match name.as_str() {
                NUM_WORKERS => context.num_workers = Some(value),
                MAX_WORKERS => context.max_workers = Some(value),
                other => {
                    if strict {
                        return Err(PipelineError::Configuration(format!(
                            "invalid run context property: `{}`",
                            other
                        )));
                    }
                    log::debug!("ignoring unknown run context property `{}`", other);
                }
            }
        }
        Ok(context)
    }

    /// Number of workers to be used for concurrent fan-out.
    pub fn effective_workers(&self) -> Option<usize> {
        match (self.num_workers, self.max_workers) {
            (Some(num), Some(max)) => Some(num.min(max)),
            (Some(num), None) => Some(num),
            (None, max) => max,
        }
    }

    /// Apply an async operation to every element of `items`.
    ///
    /// Runs serially in input order when the resolved worker count is at
    /// most 1 or there is at most one item; otherwise up to that many
    /// operations run concurrently.  Results always come back in input
    /// order regardless of completion order, and the first failure aborts
    /// the whole call.
    pub async fn map<I, O, F, Fut>(&self, items: Vec<I>, f: F) -> Result<Vec<O>, PipelineError>
    where
        I: Send,
        O: Send,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O, PipelineError>>,
    {
        let workers = self.effective_workers().unwrap_or(1);
        if workers <= 1 || items.len() <= 1 {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(f(item).await?);
            }
            return Ok(results);
        }

        log::debug!("fanning out {} items across {} workers", items.len(), workers);
        stream::iter(items.into_iter().map(|item| f(item)))
            .buffered(workers)
            .try_collect()
            .await
    }
}
