pub mod app;
pub mod capture;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod presentation;

pub use error::{AppError, CaptureError, FrameError, InferenceError};

pub use capture::{FrameSource, FrameSubscription};
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use pipeline::ClassificationPipeline;
