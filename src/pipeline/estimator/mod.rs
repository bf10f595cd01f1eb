//! Hand landmark estimation: the capability the capture loop depends on, and
//! its ONNX Runtime implementation.

pub mod common;
mod ort;
pub mod palm;

use anyhow::Result;
use image::RgbaImage;

use crate::types::HandLandmarks;

pub use self::ort::OrtEstimator;
pub use self::palm::PalmDetectorConfig;

/// Finds hands in an RGBA frame and returns one 21-point landmark set per
/// hand, normalized to the frame. An empty list means no hand.
pub trait LandmarkEstimator {
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<HandLandmarks>>;
}

impl<E: LandmarkEstimator + ?Sized> LandmarkEstimator for Box<E> {
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<HandLandmarks>> {
        (**self).detect(image)
    }
}

#[derive(Clone, Debug)]
pub struct EstimatorConfig {
    pub palm: PalmDetectorConfig,
    pub max_hands: usize,
    /// Minimum handpose presence score for a crop to count as a hand.
    pub min_hand_confidence: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            palm: PalmDetectorConfig {
                score_threshold: 0.7,
                ..PalmDetectorConfig::default()
            },
            max_hands: 2,
            min_hand_confidence: 0.5,
        }
    }
}
