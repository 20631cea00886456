use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::capture::device::{CaptureAuthorizer, CaptureDevice, CaptureStream};
use crate::common::Frame;
use crate::config::{CameraPosition, QualityPreset};
use crate::error::CaptureError;

/// The receiving end of a [`FrameSource`]. There is exactly one per source.
pub struct FrameSubscription {
    frame_rx: Receiver<Frame>,
}

impl FrameSubscription {
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frame_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        self.frame_rx.try_recv()
    }
}

struct RunningCapture {
    cancel_token: CancellationToken,
    capture_thread: std::thread::JoinHandle<Box<dyn CaptureStream>>,
}

/// Owns the capture session: device selection, the capture thread, and the
/// hand-off of every frame to the subscriber.
pub struct FrameSource {
    devices: Vec<Box<dyn CaptureDevice>>,
    authorizer: Arc<dyn CaptureAuthorizer>,
    frame_tx: Sender<Frame>,
    stream: Option<Box<dyn CaptureStream>>,
    running: Option<RunningCapture>,
    next_sequence: Arc<AtomicU64>,
}

impl FrameSource {
    pub fn new(
        devices: Vec<Box<dyn CaptureDevice>>,
        authorizer: Arc<dyn CaptureAuthorizer>,
        frame_buffer_size: usize,
    ) -> (Self, FrameSubscription) {
        let (frame_tx, frame_rx) = mpsc::channel(frame_buffer_size.max(1));
        (
            Self {
                devices,
                authorizer,
                frame_tx,
                stream: None,
                running: None,
                next_sequence: Arc::new(AtomicU64::new(0)),
            },
            FrameSubscription { frame_rx },
        )
    }

    pub fn configure(
        &mut self,
        position: CameraPosition,
        quality: QualityPreset,
    ) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        self.reap();
        self.stream = None;

        self.authorizer.authorize()?;

        let device = self
            .devices
            .iter()
            .find(|device| device.supports_video() && device.position() == position)
            .ok_or(CaptureError::DeviceUnavailable(position))?;

        let stream = device.open(quality)?;
        tracing::info!(
            "Configured capture device '{}' facing {:?} at {:?}",
            device.name(),
            position,
            quality
        );
        self.stream = Some(stream);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            tracing::debug!("Frame source already running");
            return Ok(());
        }
        self.reap();

        let mut stream = self.stream.take().ok_or(CaptureError::NotConfigured)?;
        if let Err(e) = stream.start_running() {
            self.stream = Some(stream);
            return Err(e);
        }

        let cancel_token = CancellationToken::new();
        let capture = CaptureLoop {
            stream,
            frame_tx: self.frame_tx.clone(),
            next_sequence: self.next_sequence.clone(),
        };
        let thread_token = cancel_token.clone();
        let capture_thread = std::thread::spawn(move || capture.run(thread_token));

        self.running = Some(RunningCapture {
            cancel_token,
            capture_thread,
        });
        tracing::info!("Frame source started");
        Ok(())
    }

    /// Blocks the calling thread until the capture thread hands its stream
    /// back, which can take up to one `next_buffer` call. Async callers use
    /// [`shutdown`](Self::shutdown).
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel_token.cancel();
            self.join(running);
            tracing::info!("Frame source stopped");
        }
    }

    /// Stops capture and waits for the capture thread on the blocking pool.
    pub async fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel_token.cancel();
            let capture_thread = running.capture_thread;
            match tokio::task::spawn_blocking(move || capture_thread.join()).await {
                Ok(joined) => self.restore(joined),
                Err(e) => tracing::error!("Waiting for the capture thread failed: {}", e),
            }
            tracing::info!("Frame source stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.capture_thread.is_finished())
    }

    // Collects the stream back from a capture thread that ended on its own.
    fn reap(&mut self) {
        if let Some(running) = self.running.take() {
            self.join(running);
        }
    }

    fn join(&mut self, running: RunningCapture) {
        self.restore(running.capture_thread.join());
    }

    fn restore(&mut self, joined: std::thread::Result<Box<dyn CaptureStream>>) {
        match joined {
            Ok(stream) => self.stream = Some(stream),
            Err(_) => tracing::error!("{}", CaptureError::ThreadPanicked),
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureLoop {
    stream: Box<dyn CaptureStream>,
    frame_tx: Sender<Frame>,
    next_sequence: Arc<AtomicU64>,
}

impl CaptureLoop {
    fn run(mut self, cancel_token: CancellationToken) -> Box<dyn CaptureStream> {
        while !cancel_token.is_cancelled() {
            match self.stream.next_buffer() {
                Ok(Some(buffer)) => {
                    let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                    let frame = match Frame::new(
                        sequence,
                        buffer.width,
                        buffer.height,
                        buffer.format,
                        buffer.pixels,
                    ) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Discarding capture buffer {}: {}", sequence, e);
                            continue;
                        }
                    };
                    match self.frame_tx.try_send(frame) {
                        Ok(_) => {}
                        Err(TrySendError::Full(_)) => {
                            // Drop frame to keep real-time
                            tracing::trace!("Dropping frame {}: pipeline busy", sequence);
                        }
                        Err(TrySendError::Closed(_)) => {
                            tracing::info!("Frame subscriber gone, stopping capture loop");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("Capture stream ended");
                    break;
                }
                Err(e) => {
                    tracing::error!("Capture stream failed: {}", e);
                    break;
                }
            }
        }
        self.stream.stop_running();
        self.stream
    }
}
