use crate::common::PixelFormat;
use crate::config::{CameraPosition, QualityPreset};
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

/// Platform gate for camera access.
pub trait CaptureAuthorizer: Send + Sync {
    fn status(&self) -> AuthorizationStatus;

    /// Prompts for access and blocks until it is answered.
    fn request_access(&self) -> bool;

    fn authorize(&self) -> Result<(), CaptureError> {
        match self.status() {
            AuthorizationStatus::Authorized => Ok(()),
            AuthorizationStatus::NotDetermined => {
                if self.request_access() {
                    Ok(())
                } else {
                    Err(CaptureError::PermissionDenied)
                }
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                Err(CaptureError::PermissionDenied)
            }
        }
    }
}

/// Authorizer for platforms without a permission prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAuthorized;

impl CaptureAuthorizer for AlwaysAuthorized {
    fn status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_access(&self) -> bool {
        true
    }
}

/// A pixel buffer as handed over by the capture hardware.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

pub trait CaptureStream: Send {
    fn start_running(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop_running(&mut self) {}

    /// Blocks until the next buffer is available. `Ok(None)` ends the stream.
    fn next_buffer(&mut self) -> Result<Option<RawBuffer>, CaptureError>;
}

pub trait CaptureDevice: Send + Sync {
    fn name(&self) -> &str;

    fn position(&self) -> CameraPosition;

    fn supports_video(&self) -> bool {
        true
    }

    fn open(&self, preset: QualityPreset) -> Result<Box<dyn CaptureStream>, CaptureError>;
}
