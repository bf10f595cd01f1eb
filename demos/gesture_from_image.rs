//! Runs the live pipeline over still images and writes `*_annotated.png`
//! next to each input. Images are mirrored like camera frames, so the thumb
//! rule sees a right hand the way it would live.
//!
//! `cargo run --example gesture_from_image -- hand.jpg [more.png ...]`
//! With no arguments every png/jpg under `demo/` is used.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gesture_overlay::{
    DemoConfig, gesture, model_download,
    pipeline::{OrtEstimator, process_frame},
    types::Frame,
};

fn main() -> Result<()> {
    env_logger::init();

    let mut image_paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if image_paths.is_empty() {
        image_paths = demo_images()?;
    }
    if image_paths.is_empty() {
        anyhow::bail!("no test images found; pass paths or add some under demo/");
    }

    let cfg = DemoConfig::default();
    model_download::ensure_models_ready(&cfg.handpose_model, &cfg.palm_model)?;
    let mut estimator =
        OrtEstimator::new(&cfg.handpose_model, &cfg.palm_model, cfg.estimator.clone())?;

    println!(
        "classifying {} image(s) with {}",
        image_paths.len(),
        cfg.handpose_model.display()
    );

    for path in image_paths {
        let image = image::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .to_rgba8();

        let processed = process_frame(&mut estimator, Frame::new(image));
        if processed.hands.is_empty() {
            println!("{} -> no hand", path.display());
        }
        for (hand, kind) in processed.hands.iter().zip(&processed.gestures) {
            println!(
                "{} -> {}{} | fingers: {}",
                path.display(),
                kind.emoji(),
                kind,
                gesture::finger_states(hand).summary()
            );
        }

        let out_path = annotated_path(&path);
        processed
            .image
            .save(&out_path)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        println!("  saved {}", out_path.display());
    }

    Ok(())
}

fn demo_images() -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir("demo").context("failed to read demo directory")? {
        let path = entry?.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if ["png", "jpg", "jpeg"]
                .iter()
                .any(|v| ext.eq_ignore_ascii_case(v))
            {
                images.push(path);
            }
        }
    }
    images.sort();
    Ok(images)
}

fn annotated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    path.with_file_name(format!("{stem}_annotated.png"))
}
