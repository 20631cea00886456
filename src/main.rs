use std::sync::Arc;

use frame_classifier::app::ClassifierApp;
use frame_classifier::capture::SyntheticCamera;
use frame_classifier::config::{CameraPosition, Configuration};
use frame_classifier::coordinator::CoordinatorBuilder;
use frame_classifier::error::AppError;
use frame_classifier::pipeline::{DominantColorClassifier, OffloadedClassifier};
use frame_classifier::presentation::{self, LogDisplay};
use tracing::Level;

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn main() -> Result<(), AppError> {
    let configuration = Configuration::load(None)?;
    init_logging(configuration.log_level());

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let frame_rate = configuration.camera.frame_rate;
    let ordering = configuration.pipeline.label_ordering;
    let (presentation_handle, queue) = presentation::channel();
    let coordinator = CoordinatorBuilder::new(configuration.clone())
        .device(Box::new(SyntheticCamera::new(CameraPosition::Back, frame_rate)))
        .device(Box::new(SyntheticCamera::new(CameraPosition::Front, frame_rate)))
        .classifier(Arc::new(OffloadedClassifier::new(DominantColorClassifier::new())))
        .presentation(presentation_handle)
        .build()?;

    if configuration.display.headless {
        let presentation = presentation::spawn_presentation(LogDisplay::new(), ordering, queue);
        runtime.block_on(async move {
            let mut coordinator = coordinator;
            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            coordinator.shutdown().await;
            drop(coordinator);
            if let Err(e) = presentation.await {
                tracing::error!("Presentation task ended abnormally: {}", e);
            }
            Ok::<_, AppError>(())
        })
    } else {
        let title = configuration.display.window_title.clone();
        let app = ClassifierApp::new(coordinator, queue, ordering, title);
        ClassifierApp::start_gui(&configuration.display, app)
    }
}
