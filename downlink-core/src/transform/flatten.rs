use std::marker::PhantomData;

use super::Transform;
use crate::datasource::PipelineError;

/// Flatten nested per-key results by one nesting level.
///
/// E.g. `[[a], [b, c]] -> [a, b, c]`.  Apply twice (`flatten.then(flatten)`)
/// for deeper nesting.
pub struct Flatten<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Flatten<T> {
    pub fn new() -> Self {
        Flatten {
            marker: PhantomData,
        }
    }
}

impl<T> Default for Flatten<T> {
    fn default() -> Self {
        Flatten::new()
    }
}

impl<T: Send + 'static> Transform for Flatten<T> {
    type Input = Vec<Vec<T>>;
    type Output = Vec<T>;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        Ok(input.into_iter().flatten().collect())
    }
}
