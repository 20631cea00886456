use crate::presentation::display::{Display, DisplayImage};

/// Headless display: writes label changes to the log.
#[derive(Debug, Default)]
pub struct LogDisplay {
    label: Option<String>,
    images: u64,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for LogDisplay {
    fn set_image(&mut self, image: DisplayImage) {
        self.images += 1;
        tracing::trace!(
            "Preview frame {} ({}x{}), {} shown",
            image.sequence(),
            image.width(),
            image.height(),
            self.images
        );
    }

    fn set_label_text(&mut self, text: &str) {
        if self.label.as_deref() != Some(text) {
            tracing::info!("Label: {}", text);
            self.label = Some(text.to_string());
        }
    }
}
