pub mod preview_view;

pub use preview_view::PreviewView;

pub trait View {
    fn draw(&mut self, ui: &mut egui::Ui);
}
