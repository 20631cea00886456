use std::sync::Arc;

use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::LabelOrdering;
use crate::presentation::display::{Display, DisplayImage};

/// Labels waiting for the presentation context beyond this are dropped.
const LABEL_BUFFER: usize = 16;

#[derive(Debug, Clone)]
pub enum DisplayUpdate {
    Image(DisplayImage),
    Label { sequence: u64, text: String },
}

/// Sending side used by the pipeline. Sends never block.
///
/// Images go into a single latest-value slot: a new preview replaces one
/// the presentation context has not picked up yet. Labels travel on a
/// small bounded channel of their own.
#[derive(Clone)]
pub struct PresentationHandle {
    image_tx: Arc<watch::Sender<Option<DisplayImage>>>,
    label_tx: mpsc::Sender<(u64, String)>,
}

impl PresentationHandle {
    /// Returns false once the presentation context has gone away.
    pub fn set_image(&self, image: DisplayImage) -> bool {
        self.image_tx.send(Some(image)).is_ok()
    }

    pub fn set_label(&self, sequence: u64, text: String) -> bool {
        match self.label_tx.try_send((sequence, text)) {
            Ok(_) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Label queue full, label for frame {} dropped", sequence);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

pub struct PresentationQueue {
    image_rx: watch::Receiver<Option<DisplayImage>>,
    label_rx: mpsc::Receiver<(u64, String)>,
    images_closed: bool,
    labels_closed: bool,
}

impl PresentationQueue {
    /// Waits for the next update. Returns `None` once every handle is gone
    /// and nothing is left to apply.
    pub async fn recv(&mut self) -> Option<DisplayUpdate> {
        loop {
            if let Some(image) = self.take_image() {
                return Some(DisplayUpdate::Image(image));
            }
            tokio::select! {
                changed = self.image_rx.changed(), if !self.images_closed => {
                    if changed.is_err() {
                        self.images_closed = true;
                    }
                }
                label = self.label_rx.recv(), if !self.labels_closed => match label {
                    Some((sequence, text)) => return Some(DisplayUpdate::Label { sequence, text }),
                    None => self.labels_closed = true,
                },
                else => return None,
            }
        }
    }

    pub fn try_recv_label(&mut self) -> Result<DisplayUpdate, TryRecvError> {
        self.label_rx
            .try_recv()
            .map(|(sequence, text)| DisplayUpdate::Label { sequence, text })
    }

    /// Takes the newest image if it has not been taken yet.
    pub fn take_image(&mut self) -> Option<DisplayImage> {
        let latest = self.image_rx.borrow_and_update();
        if latest.has_changed() {
            (*latest).clone()
        } else {
            None
        }
    }
}

pub fn channel() -> (PresentationHandle, PresentationQueue) {
    let (image_tx, image_rx) = watch::channel(None);
    let (label_tx, label_rx) = mpsc::channel(LABEL_BUFFER);
    (
        PresentationHandle {
            image_tx: Arc::new(image_tx),
            label_tx,
        },
        PresentationQueue {
            image_rx,
            label_rx,
            images_closed: false,
            labels_closed: false,
        },
    )
}

/// Applies updates to the display it owns. Runs on whichever context owns
/// the display: the UI thread or a dedicated task.
pub struct Presenter<D: Display> {
    display: D,
    ordering: LabelOrdering,
    label_sequence: Option<u64>,
}

impl<D: Display> Presenter<D> {
    pub fn new(display: D, ordering: LabelOrdering) -> Self {
        Self {
            display,
            ordering,
            label_sequence: None,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    pub fn apply(&mut self, update: DisplayUpdate) {
        match update {
            DisplayUpdate::Image(image) => self.display.set_image(image),
            DisplayUpdate::Label { sequence, text } => self.apply_label(sequence, &text),
        }
    }

    fn apply_label(&mut self, sequence: u64, text: &str) {
        if self.ordering == LabelOrdering::DiscardStale {
            if let Some(shown) = self.label_sequence {
                if sequence < shown {
                    tracing::debug!(
                        "Discarding label from frame {}, frame {} is already shown",
                        sequence,
                        shown
                    );
                    return;
                }
            }
        }
        self.label_sequence = Some(sequence);
        self.display.set_label_text(text);
    }

    /// Applies everything pending right now: every queued label in arrival
    /// order, then the newest image if there is one.
    /// Returns the number of updates applied.
    pub fn drain(&mut self, queue: &mut PresentationQueue) -> usize {
        let mut taken = 0;
        while let Ok(update) = queue.try_recv_label() {
            self.apply(update);
            taken += 1;
        }
        if let Some(image) = queue.take_image() {
            self.display.set_image(image);
            taken += 1;
        }
        taken
    }
}

/// Runs a presenter on its own task until every handle is dropped, then
/// hands the display back.
pub fn spawn_presentation<D: Display + 'static>(
    display: D,
    ordering: LabelOrdering,
    mut queue: PresentationQueue,
) -> JoinHandle<D> {
    tokio::spawn(async move {
        let mut presenter = Presenter::new(display, ordering);
        while let Some(update) = queue.recv().await {
            presenter.apply(update);
            presenter.drain(&mut queue);
        }
        tracing::debug!("Presentation queue closed");
        presenter.into_display()
    })
}
