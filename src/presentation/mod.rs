pub mod display;
pub mod log_display;
pub mod presenter;

pub use display::{Display, DisplayImage, DisplayState};
pub use log_display::LogDisplay;
pub use presenter::{
    channel, spawn_presentation, DisplayUpdate, PresentationHandle, PresentationQueue, Presenter,
};
