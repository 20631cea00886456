use image::RgbaImage;
use std::sync::Arc;

/// A converted frame ready to render, tagged with the frame it came from.
#[derive(Clone)]
pub struct DisplayImage {
    sequence: u64,
    image: Arc<RgbaImage>,
}

impl DisplayImage {
    pub fn new(sequence: u64, image: RgbaImage) -> Self {
        Self {
            sequence,
            image: Arc::new(image),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for DisplayImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayImage")
            .field("sequence", &self.sequence)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// Renders the preview image and the current label. Owned by the
/// presentation context; both slots are last-write-wins.
pub trait Display: Send {
    fn set_image(&mut self, image: DisplayImage);
    fn set_label_text(&mut self, text: &str);
}

/// Most recent image and label.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    image: Option<DisplayImage>,
    label: Option<String>,
    images_shown: u64,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&DisplayImage> {
        self.image.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn images_shown(&self) -> u64 {
        self.images_shown
    }
}

impl Display for DisplayState {
    fn set_image(&mut self, image: DisplayImage) {
        self.images_shown += 1;
        self.image = Some(image);
    }

    fn set_label_text(&mut self, text: &str) {
        self.label = Some(text.to_string());
    }
}
