use egui::{ColorImage, TextureHandle, TextureOptions};

use crate::app::views::View;
use crate::presentation::{Display, DisplayImage};

/// Camera preview with the current label underneath. Images are handed
/// over by the presenter and uploaded to the GPU on the next draw.
#[derive(Default)]
pub struct PreviewView {
    pending_image: Option<DisplayImage>,
    texture: Option<TextureHandle>,
    shown_sequence: Option<u64>,
    label: Option<String>,
    images_received: u64,
    show_frame_info: bool,
}

impl PreviewView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn upload_pending(&mut self, ctx: &egui::Context) {
        let Some(image) = self.pending_image.take() else {
            return;
        };
        let color_image = ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.image().as_raw(),
        );
        match self.texture.as_mut() {
            Some(texture) => texture.set(color_image, TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("camera_preview", color_image, TextureOptions::default()));
            }
        }
        self.shown_sequence = Some(image.sequence());
    }

    fn draw_frame_info(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(format!(
                "Frame: {}",
                self.shown_sequence
                    .map(|s| s.to_string())
                    .unwrap_or("None".to_string())
            ));
            ui.label(format!("Images received: {}", self.images_received));
            if let Some(texture) = &self.texture {
                let [w, h] = texture.size();
                ui.label(format!("Size: {}x{}", w, h));
            }
        });
    }
}

impl Display for PreviewView {
    fn set_image(&mut self, image: DisplayImage) {
        self.images_received += 1;
        self.pending_image = Some(image);
    }

    fn set_label_text(&mut self, text: &str) {
        self.label = Some(text.to_string());
    }
}

impl View for PreviewView {
    fn draw(&mut self, ui: &mut egui::Ui) {
        self.upload_pending(ui.ctx());

        ui.heading(self.label.as_deref().unwrap_or(""));
        ui.checkbox(&mut self.show_frame_info, "Show Frame Info");
        ui.separator();

        if self.show_frame_info {
            self.draw_frame_info(ui);
        }

        match &self.texture {
            Some(texture) => {
                ui.image(texture);
            }
            None => {
                ui.label("Waiting for camera frames...");
            }
        }
    }
}
