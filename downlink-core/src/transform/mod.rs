use std::marker::PhantomData;

use crate::datasource::PipelineError;

/// Decode CSV payloads into typed rows
pub mod csv;
/// Filter elements of a single pipeline value
pub mod filter;
/// Flatten nested per-key results
pub mod flatten;
/// Unpack in-memory zip archives
pub mod unzip;

/// A pure single-argument transformation of a pipeline value.
pub trait Transform: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError>;
}

/// Adapter turning a plain function into a [Transform].
pub struct FnTransform<F, I, O> {
    f: F,
    marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> FnTransform<F, I, O>
where
    F: Fn(I) -> Result<O, PipelineError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnTransform {
            f,
            marker: PhantomData,
        }
    }
}

/// Wrap an infallible function as a [Transform].
pub fn transform_fn<F, I, O>(
    f: F,
) -> FnTransform<impl Fn(I) -> Result<O, PipelineError>, I, O>
where
    F: Fn(I) -> O + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    FnTransform::new(move |input| Ok(f(input)))
}

/// Wrap a fallible function as a [Transform].
pub fn try_transform_fn<F, I, O>(f: F) -> FnTransform<F, I, O>
where
    F: Fn(I) -> Result<O, PipelineError> + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    FnTransform::new(f)
}

impl<F, I, O> Transform for FnTransform<F, I, O>
where
    F: Fn(I) -> Result<O, PipelineError> + Send + Sync,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn apply(&self, input: I) -> Result<O, PipelineError> {
        (self.f)(input)
    }
}

/// Two transforms applied in sequence: `first`, then `second`.
pub struct Composed<A, B> {
    first: A,
    second: B,
}

/// Compose two transforms so that
/// `compose(a, b).apply(x) == b.apply(a.apply(x))`.
pub fn compose<A, B>(first: A, second: B) -> Composed<A, B>
where
    A: Transform,
    B: Transform<Input = A::Output>,
{
    Composed { first, second }
}

impl<A, B> Transform for Composed<A, B>
where
    A: Transform,
    B: Transform<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let intermediate = self.first.apply(input)?;
        self.second.apply(intermediate)
    }
}

pub trait TransformExt: Transform + Sized {
    /// `a.then(b)` applies `a` first, then `b`.
    fn then<B>(self, next: B) -> Composed<Self, B>
    where
        B: Transform<Input = Self::Output>,
    {
        compose(self, next)
    }
}

impl<T: Transform + Sized> TransformExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_fn() {
        let plus_three = transform_fn(|v: i64| v + 3);
        assert_eq!(plus_three.apply(1).unwrap(), 4);
    }

    #[test]
    fn test_try_transform_fn_propagates_errors() {
        let checked = try_transform_fn(|v: i64| {
            if v < 0 {
                Err(PipelineError::Generic("negative input".to_string()))
            } else {
                Ok(v * 2)
            }
        });
        assert_eq!(checked.apply(2).unwrap(), 4);
        assert!(checked.apply(-1).is_err());
    }

    #[test]
    fn test_compose_order() {
        let plus_three = transform_fn(|v: i64| v + 3);
        let times_two = transform_fn(|v: i64| v * 2);
        // (1 + 3) * 2, not 1 * 2 + 3
        assert_eq!(compose(plus_three, times_two).apply(1).unwrap(), 8);
    }

    #[test]
    fn test_then_chains() {
        let composed = transform_fn(|v: i64| v + 1)
            .then(transform_fn(|v: i64| v * 10))
            .then(transform_fn(|v: i64| v.to_string()));
        assert_eq!(composed.apply(4).unwrap(), "50");
    }
}
