use std::path::Path;

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use ort::session::{Session, SessionOutputs, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    EstimatorConfig, LandmarkEstimator,
    common::{self, HANDPOSE_INPUT_SIZE},
    palm::{PalmDetector, crop_from_palm},
};
use crate::types::HandLandmarks;

/// Palm detection followed by handpose regression on a rotated crop around
/// each palm.
pub struct OrtEstimator {
    handpose: Session,
    palm_detector: PalmDetector,
    cfg: EstimatorConfig,
}

impl OrtEstimator {
    pub fn new(handpose_model: &Path, palm_model: &Path, cfg: EstimatorConfig) -> Result<Self> {
        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_model)
            .with_context(|| {
                format!("failed to load ORT session from {}", handpose_model.display())
            })?;

        let palm_detector = PalmDetector::new(palm_model, cfg.palm.clone())?;

        log::info!(
            "handpose ORT backend ready using {} and palm detector {}",
            handpose_model.display(),
            palm_model.display()
        );

        Ok(Self {
            handpose,
            palm_detector,
            cfg,
        })
    }
}

impl LandmarkEstimator for OrtEstimator {
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<HandLandmarks>> {
        let palm_regions = self.palm_detector.detect(image)?;

        let mut hands = Vec::new();
        for region in palm_regions.iter().take(self.cfg.max_hands) {
            let (center, side, angle) = crop_from_palm(region);
            let (input, transform) =
                common::rotated_crop_tensor(image, center, side, angle, HANDPOSE_INPUT_SIZE)?;
            let tensor = Tensor::from_array(input)?;
            let outputs = self
                .handpose
                .run(ort::inputs![tensor])
                .context("failed to run ORT session")?;

            if outputs.len() < 1 {
                return Err(anyhow!("handpose model returned no outputs"));
            }

            let confidence = first_scalar(&outputs, 1);
            if confidence < self.cfg.min_hand_confidence {
                log::debug!(
                    "dropping palm (score {:.2}) with handpose confidence {confidence:.2}",
                    region.score
                );
                continue;
            }

            let coords = outputs[0].try_extract_array::<f32>()?;
            let flattened: Vec<f32> = coords.iter().copied().collect();
            let landmarks = common::decode_landmarks(&flattened)?;
            hands.push(common::normalized_hand(&landmarks, &transform)?);
        }

        Ok(hands)
    }
}

fn first_scalar(outputs: &SessionOutputs<'_>, index: usize) -> f32 {
    if outputs.len() <= index {
        return 0.0;
    }
    outputs[index]
        .try_extract_array::<f32>()
        .ok()
        .and_then(|arr| arr.iter().next().copied())
        .unwrap_or(0.0)
}
