pub mod classifier_app;
pub mod views;

pub use classifier_app::ClassifierApp;
pub use views::preview_view::PreviewView;
