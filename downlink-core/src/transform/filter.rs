use std::sync::Arc;

use super::Transform;
use crate::datasource::PipelineError;
use crate::metadata::{Envelope, Metadata};

/// Filter elements of a single pipeline value.
///
/// This filters the *content* of one data element (the vector inside the
/// envelope), it never changes the number of pipeline values produced by a
/// multi-key call.  The predicate also sees the metadata of the value, so
/// provenance can take part in the decision.
pub struct Filter<V> {
    predicate: Arc<dyn Fn(&V, &Metadata) -> bool + Send + Sync>,
}

impl<V> Filter<V> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&V, &Metadata) -> bool + Send + Sync + 'static,
    {
        Filter {
            predicate: Arc::new(predicate),
        }
    }
}

impl<V> Clone for Filter<V> {
    fn clone(&self) -> Self {
        Filter {
            predicate: self.predicate.clone(),
        }
    }
}

impl<V: Send + 'static> Transform for Filter<V> {
    type Input = Envelope<Vec<V>>;
    type Output = Envelope<Vec<V>>;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let (values, metadata) = input.into_parts();
        let kept: Vec<V> = values
            .into_iter()
            .filter(|value| (self.predicate)(value, &metadata))
            .collect();
        Ok(Envelope::with_meta(kept, metadata))
    }
}
