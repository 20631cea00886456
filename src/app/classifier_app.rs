use std::time::Duration;

use crate::app::views::{PreviewView, View};
use crate::config::{DisplaySettings, LabelOrdering};
use crate::coordinator::Coordinator;
use crate::error::AppError;
use crate::presentation::{PresentationQueue, Presenter};

/// The eframe application. Its `update` runs on the UI thread, which makes
/// it the presentation context: every display mutation happens here.
pub struct ClassifierApp {
    presenter: Presenter<PreviewView>,
    queue: PresentationQueue,
    coordinator: Coordinator,
    title: String,
}

impl ClassifierApp {
    pub fn new(
        coordinator: Coordinator,
        queue: PresentationQueue,
        ordering: LabelOrdering,
        title: String,
    ) -> Self {
        Self {
            presenter: Presenter::new(PreviewView::new(), ordering),
            queue,
            coordinator,
            title,
        }
    }

    pub fn start_gui(settings: &DisplaySettings, app: ClassifierApp) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(settings.width, settings.height))
                .with_title(settings.window_title.clone()),
            ..Default::default()
        };

        eframe::run_native(
            &settings.window_title,
            options,
            Box::new(move |_cc| Ok(Box::new(app))),
        )
        .map_err(|e| AppError::Ui(e.to_string()))
    }
}

impl eframe::App for ClassifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let applied = self.presenter.drain(&mut self.queue);
        if applied > 0 {
            tracing::trace!("Applied {} display updates", applied);
        }

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.heading(self.title.as_str());
            if self.coordinator.is_capturing() {
                ui.label("Camera: capturing");
            } else {
                ui.label("Camera: unavailable");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.presenter.display_mut().draw(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(16));
    }
}
