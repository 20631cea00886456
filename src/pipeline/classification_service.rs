use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::task::{Context, Poll};
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{BoxError, Service, ServiceBuilder};

use crate::common::{Frame, Prediction};
use crate::error::InferenceError;
use crate::pipeline::classifier::Classifier;

pub type BoxedClassificationService = BoxCloneService<Arc<Frame>, Prediction, BoxError>;

/// Adapts a [`Classifier`] to a tower service so timeouts and concurrency
/// limits can be layered around inference.
#[derive(Clone)]
pub struct ClassificationService {
    inner: Arc<dyn Classifier>,
}

impl ClassificationService {
    pub fn new(inner: Arc<dyn Classifier>) -> Self {
        Self { inner }
    }

    pub fn layered(
        inner: Arc<dyn Classifier>,
        timeout: Option<Duration>,
        max_concurrent: Option<usize>,
    ) -> BoxedClassificationService {
        let service = ServiceBuilder::new()
            .option_layer(max_concurrent.map(ConcurrencyLimitLayer::new))
            .option_layer(timeout.map(TimeoutLayer::new))
            .service(Self::new(inner));
        BoxCloneService::new(service)
    }
}

impl Service<Arc<Frame>> for ClassificationService {
    type Response = Prediction;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Arc<Frame>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let prediction = inner.classify(&frame).await?;
            if prediction.is_empty() {
                return Err(InferenceError::NoResult.into());
            }
            tracing::trace!(
                "{} classified frame {} into {} labels",
                inner.name(),
                frame.sequence(),
                prediction.len()
            );
            Ok(prediction)
        })
    }
}
