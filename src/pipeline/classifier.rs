use std::sync::Arc;

use async_trait::async_trait;

use crate::common::{Frame, Prediction};
use crate::error::InferenceError;

/// An image classification model driven from the async runtime.
///
/// `classify` is polled on a runtime worker and must not block it. A model
/// that runs synchronously implements [`BlockingClassifier`] instead and is
/// handed to the pipeline wrapped in [`OffloadedClassifier`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<Prediction, InferenceError>;
    fn name(&self) -> &'static str;
}

/// A model whose inference is plain synchronous CPU work.
pub trait BlockingClassifier: Send + Sync {
    fn classify_blocking(&self, frame: &Frame) -> Result<Prediction, InferenceError>;
    fn name(&self) -> &'static str;
}

/// Runs a [`BlockingClassifier`] on tokio's blocking pool so inference
/// never occupies a runtime worker.
pub struct OffloadedClassifier<C> {
    inner: Arc<C>,
}

impl<C: BlockingClassifier + 'static> OffloadedClassifier<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

#[async_trait]
impl<C: BlockingClassifier + 'static> Classifier for OffloadedClassifier<C> {
    async fn classify(&self, frame: &Frame) -> Result<Prediction, InferenceError> {
        let inner = self.inner.clone();
        let frame = frame.clone();
        tokio::task::spawn_blocking(move || inner.classify_blocking(&frame))
            .await
            .map_err(|e| InferenceError::Failed(format!("{} task failed: {}", self.inner.name(), e)))?
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Labels a frame by its average colour. Stands in for a trained model.
pub struct DominantColorClassifier {
    stride: u32,
    temperature: f64,
}

impl DominantColorClassifier {
    pub const LABELS: [&'static str; 4] = ["red", "green", "blue", "gray"];

    pub fn new() -> Self {
        Self {
            stride: 4,
            temperature: 20.0,
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    fn mean_rgb(&self, frame: &Frame) -> [f64; 3] {
        let mut sum = [0f64; 3];
        let mut samples = 0f64;
        for y in (0..frame.height()).step_by(self.stride as usize) {
            for x in (0..frame.width()).step_by(self.stride as usize) {
                let px = frame.rgb_at(x, y);
                for (acc, channel) in sum.iter_mut().zip(px) {
                    *acc += channel as f64;
                }
                samples += 1.0;
            }
        }
        sum.map(|channel| channel / samples.max(1.0))
    }

    fn softmax(&self, scores: [f64; 4]) -> [f64; 4] {
        // Numerically stable softmax
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps = scores.map(|s| ((s - max) / self.temperature).exp());
        let sum: f64 = exps.iter().sum();
        exps.map(|e| e / sum)
    }
}

impl Default for DominantColorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingClassifier for DominantColorClassifier {
    fn classify_blocking(&self, frame: &Frame) -> Result<Prediction, InferenceError> {
        let [r, g, b] = self.mean_rgb(frame);
        let chroma = r.max(g).max(b) - r.min(g).min(b);
        let scores = [
            r - (g + b) / 2.0,
            g - (r + b) / 2.0,
            b - (r + g) / 2.0,
            60.0 - chroma,
        ];
        let probabilities = self.softmax(scores);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::Failed(format!(
                "non-finite scores for frame {}",
                frame.sequence()
            )));
        }
        Ok(Self::LABELS.into_iter().zip(probabilities).collect())
    }

    fn name(&self) -> &'static str {
        "dominant-color"
    }
}
