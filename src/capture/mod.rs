pub mod device;
pub mod frame_source;
pub mod synthetic;

pub use device::{
    AlwaysAuthorized, AuthorizationStatus, CaptureAuthorizer, CaptureDevice, CaptureStream,
    RawBuffer,
};
pub use frame_source::{FrameSource, FrameSubscription};
pub use synthetic::SyntheticCamera;
