use std::{path::PathBuf, time::Duration};

use crate::{model_download, pipeline::EstimatorConfig};

/// Fixed settings for the live demo.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub camera_index: u32,
    pub handpose_model: PathBuf,
    pub palm_model: PathBuf,
    pub estimator: EstimatorConfig,
    /// How long the capture loop waits for a quit request after each frame.
    pub quit_poll: Duration,
    pub window_title: &'static str,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            handpose_model: model_download::default_handpose_estimator_model_path(),
            palm_model: model_download::default_palm_detector_model_path(),
            estimator: EstimatorConfig::default(),
            quit_poll: Duration::from_millis(5),
            window_title: "Hand Gesture Recognition",
        }
    }
}
