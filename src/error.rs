use thiserror::Error;

use crate::config::CameraPosition;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Configuration Error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Runtime Error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("UI Error: {0}")]
    Ui(String),
    #[error("Coordinator Error: {0}")]
    Coordinator(String),
}

// Capture Error Type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera access was not authorized")]
    PermissionDenied,
    #[error("No video capture device facing {0:?}")]
    DeviceUnavailable(CameraPosition),
    #[error("The frame source has not been configured")]
    NotConfigured,
    #[error("The frame source is running and cannot be reconfigured")]
    AlreadyRunning,
    #[error("Capture stream failed: {0}")]
    Stream(String),
    #[error("Capture thread panicked")]
    ThreadPanicked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("Frame has zero width or height")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Classifier failed: {0}")]
    Failed(String),
    #[error("Classifier returned no labels")]
    NoResult,
}
