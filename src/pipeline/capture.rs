//! The per-frame loop: read, mirror, detect, classify, draw, present.
//!
//! The loop is synchronous. A frame is fully processed and presented before
//! the next one is read, and the only waits are the camera read, the hand-off
//! to the display and a short poll for a quit request.

use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use image::{RgbaImage, imageops};
use thiserror::Error;

use super::estimator::LandmarkEstimator;
use crate::{
    gesture,
    overlay,
    types::{Frame, GestureKind, HandLandmarks},
};

/// Produces camera frames. An error ends the capture loop.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame>;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("display closed")]
pub struct DisplayClosed;

/// Receives annotated frames and reports quit requests.
pub trait FrameSink {
    fn present(&mut self, image: RgbaImage) -> Result<(), DisplayClosed>;

    /// Waits at most `timeout` for a quit request.
    fn quit_requested(&mut self, timeout: Duration) -> bool;
}

#[derive(Debug)]
pub enum ExitReason {
    QuitRequested,
    DisplayClosed,
    CameraFailed(anyhow::Error),
}

/// What one iteration produced, before it is handed to the display.
#[derive(Debug)]
pub struct ProcessedFrame {
    pub image: RgbaImage,
    pub hands: Vec<HandLandmarks>,
    pub gestures: Vec<GestureKind>,
    pub label: String,
}

/// Mirrors the frame, detects and classifies hands and draws the overlay.
///
/// Estimator errors are logged and the frame is treated as having no hand.
pub fn process_frame<E>(estimator: &mut E, frame: Frame) -> ProcessedFrame
where
    E: LandmarkEstimator + ?Sized,
{
    let mut image = frame.image;
    imageops::flip_horizontal_in_place(&mut image);

    let hands = estimator.detect(&image).unwrap_or_else(|err| {
        log::warn!("hand landmark estimation failed: {err:?}");
        Vec::new()
    });
    let gestures = gesture::classify_hands(&hands);
    let label = overlay::annotate_frame(&mut image, &hands, &gestures);

    ProcessedFrame {
        image,
        hands,
        gestures,
        label,
    }
}

pub fn run_capture_loop<S, E, K>(
    source: &mut S,
    estimator: &mut E,
    sink: &mut K,
    quit_poll: Duration,
) -> ExitReason
where
    S: FrameSource + ?Sized,
    E: LandmarkEstimator + ?Sized,
    K: FrameSink + ?Sized,
{
    let mut last_label = String::new();

    loop {
        let frame = match source.read() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("failed to read from camera: {err:?}");
                return ExitReason::CameraFailed(err);
            }
        };
        let captured_at = frame.timestamp;

        let processed = process_frame(estimator, frame);
        if processed.label != last_label {
            log::info!(
                "hands: {}, gesture: {}",
                processed.hands.len(),
                processed.label
            );
            last_label = processed.label;
        }

        if sink.present(processed.image).is_err() {
            log::info!("display closed, stopping capture");
            return ExitReason::DisplayClosed;
        }
        log::trace!("frame presented {:?} after capture", captured_at.elapsed());

        if sink.quit_requested(quit_poll) {
            log::info!("quit requested");
            return ExitReason::QuitRequested;
        }
    }
}

/// [`FrameSink`] backed by channels to and from the window.
pub struct ChannelSink {
    frame_tx: Sender<RgbaImage>,
    quit_rx: Receiver<()>,
}

impl ChannelSink {
    pub fn new(frame_tx: Sender<RgbaImage>, quit_rx: Receiver<()>) -> Self {
        Self { frame_tx, quit_rx }
    }
}

impl FrameSink for ChannelSink {
    fn present(&mut self, image: RgbaImage) -> Result<(), DisplayClosed> {
        self.frame_tx.send(image).map_err(|_| DisplayClosed)
    }

    fn quit_requested(&mut self, timeout: Duration) -> bool {
        match self.quit_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// The capture loop running on its own thread. Dropping the handle waits for
/// the loop to finish.
#[derive(Debug)]
pub struct CaptureHandle {
    handle: Option<thread::JoinHandle<ExitReason>>,
}

impl CaptureHandle {
    pub fn join(mut self) -> Option<ExitReason> {
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the capture loop. The source is opened on the capture thread since
/// camera handles are not always `Send`; an open failure ends the loop as a
/// camera failure.
pub fn start_capture<S, F, E>(
    open_source: F,
    mut estimator: E,
    mut sink: ChannelSink,
    quit_poll: Duration,
) -> CaptureHandle
where
    S: FrameSource,
    F: FnOnce() -> Result<S> + Send + 'static,
    E: LandmarkEstimator + Send + 'static,
{
    let handle = thread::spawn(move || {
        let started = Instant::now();
        let mut source = match open_source() {
            Ok(source) => source,
            Err(err) => {
                log::error!("failed to open frame source: {err:?}");
                return ExitReason::CameraFailed(err);
            }
        };
        log::debug!("frame source ready after {:?}", started.elapsed());

        let reason = run_capture_loop(&mut source, &mut estimator, &mut sink, quit_poll);
        log::info!("capture loop finished: {reason:?}");
        reason
    });

    CaptureHandle {
        handle: Some(handle),
    }
}
