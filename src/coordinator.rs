use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    capture::{AlwaysAuthorized, CaptureAuthorizer, CaptureDevice, FrameSource},
    config::{CameraPosition, Configuration, LabelOrdering, QualityPreset},
    error::AppError,
    pipeline::{ClassificationPipeline, Classifier},
    presentation::PresentationHandle,
};

/// Wires the frame source into the classification pipeline and owns both
/// for the lifetime of the application.
pub struct Coordinator {
    frame_source: FrameSource,
    pipeline_task: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(
        configuration: &Configuration,
        devices: Vec<Box<dyn CaptureDevice>>,
        authorizer: Arc<dyn CaptureAuthorizer>,
        pipeline: ClassificationPipeline,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let (mut frame_source, subscription) = FrameSource::new(
            devices,
            authorizer,
            configuration.pipeline.frame_buffer_size,
        );
        let pipeline_task = tokio::spawn(pipeline.run(subscription, cancel_token.clone()));

        // Capture failures leave the app running without a preview.
        let camera = &configuration.camera;
        match frame_source
            .configure(camera.position, camera.quality)
            .and_then(|_| frame_source.start())
        {
            Ok(_) => tracing::info!("Capturing from the {:?} camera", camera.position),
            Err(e) => tracing::error!("Camera unavailable, no frames will be delivered: {}", e),
        }

        Self {
            frame_source,
            pipeline_task,
            cancel_token,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.frame_source.is_running()
    }

    /// Blocks until the capture thread has stopped. Prefer
    /// [`shutdown`](Self::shutdown) from async code.
    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        self.frame_source.stop();
    }

    /// Stops capture and waits for the pipeline to finish its loop, without
    /// blocking the runtime worker it is polled on.
    pub async fn shutdown(&mut self) {
        self.cancel_token.cancel();
        self.frame_source.shutdown().await;
        if let Err(e) = (&mut self.pipeline_task).await {
            tracing::error!("Pipeline task ended abnormally: {}", e);
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
        self.pipeline_task.abort();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    devices: Vec<Box<dyn CaptureDevice>>,
    authorizer: Arc<dyn CaptureAuthorizer>,
    classifier: Option<Arc<dyn Classifier>>,
    presentation: Option<PresentationHandle>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            devices: Vec::new(),
            authorizer: Arc::new(AlwaysAuthorized),
            classifier: None,
            presentation: None,
        }
    }

    // Selects the camera facing, this will override the default configuration.
    pub fn position(mut self, position: CameraPosition) -> Self {
        self.configuration.camera.position = position;
        self
    }

    // Selects the session preset, this will override the default configuration.
    pub fn quality(mut self, quality: QualityPreset) -> Self {
        self.configuration.camera.quality = quality;
        self
    }

    // Adjusts the frame buffer size, this will override the default configuration.
    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.configuration.pipeline.frame_buffer_size = frame_buffer_size;
        self
    }

    // Adjusts the label threshold, this will override the default configuration.
    pub fn confidence_threshold(mut self, confidence_threshold: u32) -> Self {
        self.configuration.pipeline.confidence_threshold = confidence_threshold;
        self
    }

    pub fn device(mut self, device: Box<dyn CaptureDevice>) -> Self {
        self.devices.push(device);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn CaptureAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn presentation(mut self, presentation: PresentationHandle) -> Self {
        self.presentation = Some(presentation);
        self
    }

    pub fn label_ordering(&self) -> LabelOrdering {
        self.configuration.pipeline.label_ordering
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let classifier = self
            .classifier
            .ok_or(AppError::Coordinator("Classifier not set".to_string()))?;
        let presentation = self
            .presentation
            .ok_or(AppError::Coordinator("Presentation not set".to_string()))?;
        let pipeline = ClassificationPipeline::builder(classifier, presentation)
            .settings(&self.configuration.pipeline)
            .build();
        Ok(Coordinator::new(
            &self.configuration,
            self.devices,
            self.authorizer,
            pipeline,
        ))
    }
}
