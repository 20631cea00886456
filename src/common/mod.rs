pub mod frame;
pub mod prediction;

pub use frame::{Frame, PixelFormat};
pub use prediction::Prediction;
