#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod capture;
pub mod estimator;
pub mod rgba_converter;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::NokhwaCamera;
pub use capture::{
    CaptureHandle, ChannelSink, ExitReason, FrameSink, FrameSource, process_frame,
    run_capture_loop, start_capture,
};
pub use estimator::{EstimatorConfig, LandmarkEstimator, OrtEstimator};
