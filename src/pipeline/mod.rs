pub mod classification_pipeline;
pub mod classification_service;
pub mod classifier;
pub mod confidence;

pub use classification_pipeline::{ClassificationPipeline, ClassificationPipelineBuilder};
pub use classification_service::{BoxedClassificationService, ClassificationService};
pub use classifier::{BlockingClassifier, Classifier, DominantColorClassifier, OffloadedClassifier};
pub use confidence::{percentage, ConfidenceFilter, LabelText};
