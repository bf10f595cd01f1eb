//! Live hand gesture recognition: camera frames in, annotated frames out.

pub mod config;
pub mod gesture;
pub mod model_download;
pub mod overlay;
pub mod pipeline;
pub mod types;

pub use config::DemoConfig;
pub use types::{Frame, GestureKind, HandLandmarks, Landmark};
