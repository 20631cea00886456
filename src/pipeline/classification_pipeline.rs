use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::capture::FrameSubscription;
use crate::common::Frame;
use crate::config::PipelineSettings;
use crate::pipeline::classification_service::{BoxedClassificationService, ClassificationService};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::confidence::ConfidenceFilter;
use crate::presentation::{DisplayImage, PresentationHandle};

pub struct ClassificationPipelineBuilder {
    classifier: Arc<dyn Classifier>,
    presentation: PresentationHandle,
    confidence_threshold: u32,
    inference_timeout: Option<Duration>,
    max_concurrent_inference: Option<usize>,
}

impl ClassificationPipelineBuilder {
    pub fn settings(mut self, settings: &PipelineSettings) -> Self {
        self.confidence_threshold = settings.confidence_threshold;
        self.inference_timeout = settings.inference_timeout();
        self.max_concurrent_inference = settings.max_concurrent_inference;
        self
    }

    pub fn confidence_threshold(mut self, threshold: u32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn inference_timeout(mut self, inference_timeout: Duration) -> Self {
        self.inference_timeout = Some(inference_timeout);
        self
    }

    pub fn max_concurrent_inference(mut self, limit: usize) -> Self {
        self.max_concurrent_inference = Some(limit);
        self
    }

    pub fn build(self) -> ClassificationPipeline {
        ClassificationPipeline {
            classifier: ClassificationService::layered(
                self.classifier,
                self.inference_timeout,
                self.max_concurrent_inference,
            ),
            filter: ConfidenceFilter::new(self.confidence_threshold),
            presentation: self.presentation,
        }
    }
}

/// Turns every frame into a preview image and, independently, into a
/// filtered label. The preview goes out before inference starts; inference
/// runs on its own task and only reports back through the presentation
/// handle.
pub struct ClassificationPipeline {
    classifier: BoxedClassificationService,
    filter: ConfidenceFilter,
    presentation: PresentationHandle,
}

impl ClassificationPipeline {
    pub fn builder(
        classifier: Arc<dyn Classifier>,
        presentation: PresentationHandle,
    ) -> ClassificationPipelineBuilder {
        ClassificationPipelineBuilder {
            classifier,
            presentation,
            confidence_threshold: ConfidenceFilter::DEFAULT_THRESHOLD,
            inference_timeout: None,
            max_concurrent_inference: None,
        }
    }

    /// Handles one frame. The returned handle resolves once the label path
    /// for this frame is done; dropping it does not cancel inference.
    pub fn on_frame(&self, frame: Frame) -> JoinHandle<()> {
        let frame = Arc::new(frame);
        let sequence = frame.sequence();

        match frame.to_rgba_image() {
            Ok(image) => {
                if !self.presentation.set_image(DisplayImage::new(sequence, image)) {
                    tracing::debug!("Presentation closed, preview for frame {} dropped", sequence);
                }
            }
            Err(e) => {
                tracing::warn!("Frame {} could not be converted for display: {}", sequence, e);
            }
        }

        let classifier = self.classifier.clone();
        let filter = self.filter;
        let presentation = self.presentation.clone();
        tokio::spawn(async move {
            let captured = frame.clone();
            let prediction = match classifier.oneshot(frame).await {
                Ok(prediction) => prediction,
                Err(e) => {
                    tracing::warn!("Inference failed for frame {}: {}", sequence, e);
                    return;
                }
            };
            let frame_age = captured.age();
            match filter.accept(&prediction) {
                Some(text) => {
                    tracing::debug!(
                        "Frame {} classified as '{}' {} ms after capture",
                        sequence,
                        text,
                        frame_age.num_milliseconds()
                    );
                    presentation.set_label(sequence, text.to_string());
                }
                None => {
                    tracing::debug!(
                        "Frame {} below confidence threshold ({:?})",
                        sequence,
                        prediction.top()
                    );
                }
            }
        })
    }

    /// Consumes frames until the subscription closes or `cancel_token` fires.
    pub async fn run(self, mut subscription: FrameSubscription, cancel_token: CancellationToken) {
        tracing::info!("Classification pipeline running");
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                frame = subscription.recv() => match frame {
                    Some(frame) => {
                        self.on_frame(frame);
                    }
                    None => {
                        tracing::info!("Frame source closed");
                        break;
                    }
                },
            }
        }
        tracing::info!("Classification pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::frame::solid_frame;
    use crate::common::Prediction;
    use crate::config::LabelOrdering;
    use crate::error::InferenceError;
    use crate::presentation::{channel, DisplayState, PresentationQueue, Presenter};
    use async_trait::async_trait;
    use image::Rgba;
    use std::collections::HashMap;
    use std::time::Instant;
    use tokio::sync::Notify;

    /// Answers per frame sequence; frames with a gate wait for it first.
    #[derive(Default)]
    struct ScriptedClassifier {
        answers: HashMap<u64, Result<Prediction, InferenceError>>,
        gates: HashMap<u64, Arc<Notify>>,
    }

    impl ScriptedClassifier {
        fn answer(mut self, sequence: u64, answer: Result<Prediction, InferenceError>) -> Self {
            self.answers.insert(sequence, answer);
            self
        }

        fn gate(mut self, sequence: u64, gate: Arc<Notify>) -> Self {
            self.gates.insert(sequence, gate);
            self
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, frame: &Frame) -> Result<Prediction, InferenceError> {
            if let Some(gate) = self.gates.get(&frame.sequence()) {
                gate.notified().await;
            }
            self.answers
                .get(&frame.sequence())
                .cloned()
                .unwrap_or(Err(InferenceError::Failed("unscripted frame".to_string())))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn frame(sequence: u64) -> Frame {
        solid_frame(sequence, 4, 4, Rgba([10, 20, 30, 255]))
    }

    fn label(name: &str, probability: f64) -> Result<Prediction, InferenceError> {
        Ok(Prediction::new().with(name, probability))
    }

    fn pipeline(
        classifier: ScriptedClassifier,
    ) -> (
        ClassificationPipeline,
        Presenter<DisplayState>,
        PresentationQueue,
    ) {
        let (handle, queue) = channel();
        let pipeline = ClassificationPipeline::builder(Arc::new(classifier), handle).build();
        let presenter = Presenter::new(DisplayState::new(), LabelOrdering::DiscardStale);
        (pipeline, presenter, queue)
    }

    #[tokio::test]
    async fn confident_prediction_updates_label() {
        let (pipeline, mut presenter, mut queue) =
            pipeline(ScriptedClassifier::default().answer(0, label("cat", 0.82)));

        pipeline.on_frame(frame(0)).await.expect("label path");
        presenter.drain(&mut queue);

        let state = presenter.display();
        assert_eq!(state.label(), Some("cat : 82"));
        assert_eq!(state.image().map(DisplayImage::sequence), Some(0));
    }

    #[tokio::test]
    async fn unconfident_prediction_leaves_label_untouched() {
        let (pipeline, mut presenter, mut queue) = pipeline(
            ScriptedClassifier::default()
                .answer(0, label("dog", 0.91))
                .answer(1, label("cat", 0.69)),
        );

        pipeline.on_frame(frame(0)).await.expect("label path");
        pipeline.on_frame(frame(1)).await.expect("label path");
        presenter.drain(&mut queue);

        let state = presenter.display();
        assert_eq!(state.label(), Some("dog : 91"));
        assert_eq!(state.image().map(DisplayImage::sequence), Some(1));
    }

    #[tokio::test]
    async fn seventy_percent_passes() {
        let (pipeline, mut presenter, mut queue) =
            pipeline(ScriptedClassifier::default().answer(0, label("cat", 0.70)));

        pipeline.on_frame(frame(0)).await.expect("label path");
        presenter.drain(&mut queue);

        assert_eq!(presenter.display().label(), Some("cat : 70"));
    }

    #[tokio::test]
    async fn failed_inference_skips_only_that_frame() {
        let (pipeline, mut presenter, mut queue) = pipeline(
            ScriptedClassifier::default()
                .answer(0, label("cat", 0.82))
                .answer(1, Err(InferenceError::Failed("model crashed".to_string())))
                .answer(2, Ok(Prediction::new()))
                .answer(3, label("owl", 0.99)),
        );

        pipeline.on_frame(frame(0)).await.expect("label path");
        pipeline.on_frame(frame(1)).await.expect("label path");
        pipeline.on_frame(frame(2)).await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().label(), Some("cat : 82"));
        assert_eq!(presenter.display().image().map(DisplayImage::sequence), Some(2));

        pipeline.on_frame(frame(3)).await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().label(), Some("owl : 99"));
    }

    #[tokio::test]
    async fn slow_inference_does_not_hold_back_preview() {
        let gate = Arc::new(Notify::new());
        let (pipeline, mut presenter, mut queue) = pipeline(
            ScriptedClassifier::default()
                .answer(0, label("cat", 0.82))
                .gate(0, gate.clone())
                .answer(1, label("cat", 0.50)),
        );

        let slow = pipeline.on_frame(frame(0));
        pipeline.on_frame(frame(1)).await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().image().map(DisplayImage::sequence), Some(1));
        assert_eq!(presenter.display().label(), None);

        gate.notify_one();
        slow.await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().label(), Some("cat : 82"));
    }

    #[tokio::test]
    async fn late_result_from_older_frame_is_discarded() {
        let gate = Arc::new(Notify::new());
        let (pipeline, mut presenter, mut queue) = pipeline(
            ScriptedClassifier::default()
                .answer(0, label("cat", 0.95))
                .gate(0, gate.clone())
                .answer(1, label("dog", 0.90)),
        );

        let slow = pipeline.on_frame(frame(0));
        pipeline.on_frame(frame(1)).await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().label(), Some("dog : 90"));

        gate.notify_one();
        slow.await.expect("label path");
        presenter.drain(&mut queue);
        assert_eq!(presenter.display().label(), Some("dog : 90"));
    }

    #[tokio::test]
    async fn timed_out_inference_leaves_label_untouched() {
        let gate = Arc::new(Notify::new());
        let (handle, mut queue) = channel();
        let classifier = ScriptedClassifier::default()
            .answer(0, label("cat", 0.95))
            .gate(0, gate);
        let pipeline = ClassificationPipeline::builder(Arc::new(classifier), handle)
            .inference_timeout(Duration::from_millis(20))
            .build();
        let mut presenter = Presenter::new(DisplayState::new(), LabelOrdering::DiscardStale);

        pipeline.on_frame(frame(0)).await.expect("label path");
        presenter.drain(&mut queue);

        assert_eq!(presenter.display().label(), None);
        assert_eq!(presenter.display().images_shown(), 1);
    }

    #[tokio::test]
    async fn unattended_presentation_holds_a_single_preview() {
        let (pipeline, mut presenter, mut queue) = pipeline(ScriptedClassifier::default());

        for sequence in 0..300 {
            let frame = solid_frame(sequence, 480, 360, Rgba([10, 20, 30, 255]));
            pipeline.on_frame(frame).await.expect("label path");
        }

        assert_eq!(presenter.drain(&mut queue), 1);
        let state = presenter.display();
        assert_eq!(state.images_shown(), 1);
        assert_eq!(state.image().map(DisplayImage::sequence), Some(299));
        assert!(queue.take_image().is_none());
    }

    #[tokio::test]
    async fn run_processes_frames_until_cancelled() {
        use crate::capture::{AlwaysAuthorized, FrameSource, SyntheticCamera};
        use crate::config::{CameraPosition, QualityPreset};
        use crate::pipeline::classifier::{DominantColorClassifier, OffloadedClassifier};

        let (mut source, subscription) = FrameSource::new(
            vec![Box::new(SyntheticCamera::new(CameraPosition::Back, 60))],
            Arc::new(AlwaysAuthorized),
            1,
        );
        source
            .configure(CameraPosition::Back, QualityPreset::Low)
            .expect("configured");
        source.start().expect("started");

        let (handle, mut queue) = channel();
        let classifier = Arc::new(OffloadedClassifier::new(DominantColorClassifier::new()));
        let pipeline = ClassificationPipeline::builder(classifier, handle).build();
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(pipeline.run(subscription, cancel_token.clone()));

        let mut presenter = Presenter::new(DisplayState::new(), LabelOrdering::DiscardStale);
        let deadline = Instant::now() + Duration::from_secs(5);
        while presenter.display().label().is_none() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
            presenter.drain(&mut queue);
        }
        cancel_token.cancel();
        task.await.expect("pipeline task");
        source.stop();

        let label = presenter.display().label().expect("a label within five seconds");
        assert!(label.starts_with("red : "), "unexpected label {}", label);
        assert!(presenter.display().images_shown() >= 1);
    }
}
