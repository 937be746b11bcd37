//! Synthesis Executor - the external image model seam
//!
//! The pipeline treats synthesis as an opaque, possibly slow, possibly
//! failing async call: directive text, cleaned base image and projected
//! silhouette mask in; a new image out. Retries, timeouts and model choice
//! belong to the implementor.

use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt};

use crate::pixels::{Mask, PixelData};

/// Error raised by an executor. Forwarded to the caller without wrapping
/// its message, so it can be downcast back to the concrete type.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub trait SynthesisExecutor: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        directive: &'a str,
        base: &'a PixelData,
        mask: &'a Mask,
    ) -> BoxFuture<'a, Result<PixelData, ExecutorError>>;
}

/// Any `Fn(directive, base, mask) -> Future` closure is an executor. The
/// closure receives owned copies.
impl<F, Fut> SynthesisExecutor for F
where
    F: Fn(String, PixelData, Mask) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PixelData, ExecutorError>> + Send + 'static,
{
    fn synthesize<'a>(
        &'a self,
        directive: &'a str,
        base: &'a PixelData,
        mask: &'a Mask,
    ) -> BoxFuture<'a, Result<PixelData, ExecutorError>> {
        (self)(directive.to_string(), base.clone(), mask.clone()).boxed()
    }
}

/// Returns a prerecorded image, e.g. one generated out of band and now
/// being re-validated against its base.
#[derive(Debug, Clone)]
pub struct ReplayExecutor {
    image: PixelData,
}

impl ReplayExecutor {
    pub fn new(image: PixelData) -> Self {
        Self { image }
    }
}

impl SynthesisExecutor for ReplayExecutor {
    fn synthesize<'a>(
        &'a self,
        directive: &'a str,
        _base: &'a PixelData,
        _mask: &'a Mask,
    ) -> BoxFuture<'a, Result<PixelData, ExecutorError>> {
        tracing::debug!(directive_len = directive.len(), "replaying recorded synthesis");
        future::ready(Ok(self.image.clone())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_returns_recording() {
        let recorded = PixelData::filled(2, 2, [1, 2, 3, 255]).unwrap();
        let base = PixelData::transparent(2, 2).unwrap();
        let mask = Mask::new(2, 2, vec![0; 4]).unwrap();

        let executor = ReplayExecutor::new(recorded.clone());
        let out = executor.synthesize("paint", &base, &mask).await.unwrap();
        assert_eq!(out, recorded);
    }

    #[tokio::test]
    async fn test_closure_receives_inputs() {
        let executor = |directive: String, base: PixelData, mask: Mask| async move {
            assert_eq!(directive, "paint");
            assert_eq!(mask.len(), base.pixel_count());
            Ok::<_, ExecutorError>(base)
        };
        let base = PixelData::filled(3, 1, [9, 9, 9, 255]).unwrap();
        let mask = Mask::new(3, 1, vec![255; 3]).unwrap();

        let out = executor.synthesize("paint", &base, &mask).await.unwrap();
        assert_eq!(out, base);
    }

    #[tokio::test]
    async fn test_closure_error_passes_through() {
        let executor = |_: String, _: PixelData, _: Mask| async move {
            Err::<PixelData, ExecutorError>("model offline".into())
        };
        let base = PixelData::transparent(1, 1).unwrap();
        let mask = Mask::new(1, 1, vec![0]).unwrap();

        let err = executor.synthesize("x", &base, &mask).await.unwrap_err();
        assert_eq!(err.to_string(), "model offline");
    }
}
