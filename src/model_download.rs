use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

const MODEL_DIR: &str = "models";
const MODEL_BASE_URL: &str =
    "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    HandposeEstimator,
    PalmDetector,
}

impl ModelKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose_estimation_mediapipe_2023feb.onnx",
            ModelKind::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose estimator",
            ModelKind::PalmDetector => "palm detector",
        }
    }

    fn url(self) -> String {
        format!("{MODEL_BASE_URL}/{}", self.file_name())
    }

    /// A copy shipped next to the binary, tried before downloading.
    fn bundled_path(self) -> Option<PathBuf> {
        match self {
            ModelKind::PalmDetector => {
                Some(Path::new("palm_detection_mediapipe").join(self.file_name()))
            }
            ModelKind::HandposeEstimator => None,
        }
    }
}

pub fn default_handpose_estimator_model_path() -> PathBuf {
    PathBuf::from(MODEL_DIR).join(ModelKind::HandposeEstimator.file_name())
}

pub fn default_palm_detector_model_path() -> PathBuf {
    PathBuf::from(MODEL_DIR).join(ModelKind::PalmDetector.file_name())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Makes sure both models exist, showing a terminal progress bar for any
/// download.
pub fn ensure_models_ready(handpose_path: &Path, palm_path: &Path) -> anyhow::Result<()> {
    for (model, path) in [
        (ModelKind::PalmDetector, palm_path),
        (ModelKind::HandposeEstimator, handpose_path),
    ] {
        let mut progress: Option<ProgressBar> = None;
        ensure_model_ready(model, path, |event| match event {
            ModelDownloadEvent::Started { total, .. } => {
                progress = Some(create_progress_bar(total));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(downloaded);
                }
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} model ready", model.label()));
                }
            }
            ModelDownloadEvent::AlreadyPresent { model } => {
                log::debug!("{} model found at {}", model.label(), path.display());
            }
        })
        .with_context(|| format!("failed to provide {} model", model.label()))?;
    }
    Ok(())
}

pub fn ensure_model_ready<F>(model: ModelKind, model_path: &Path, mut on_event: F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model });
        on_event(ModelDownloadEvent::Finished { model });
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    if let Some(bundled) = model.bundled_path().filter(|p| p.exists()) {
        on_event(ModelDownloadEvent::Started { model, total: None });
        fs::copy(&bundled, model_path).with_context(|| {
            format!(
                "failed to copy bundled {} model from {} to {}",
                model.label(),
                bundled.display(),
                model_path.display()
            )
        })?;
        on_event(ModelDownloadEvent::Finished { model });
        return Ok(());
    }

    download_to_path(model, &model.url(), model_path, &mut on_event).with_context(|| {
        format!(
            "failed to download {} model to {}",
            model.label(),
            model_path.display()
        )
    })
}

fn download_to_path<F>(
    model: ModelKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total_size = response.content_length();
    on_event(ModelDownloadEvent::Started {
        model,
        total: total_size,
    });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total: total_size,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} fetching model")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_under_models() {
        assert_eq!(
            default_handpose_estimator_model_path(),
            Path::new("models/handpose_estimation_mediapipe_2023feb.onnx")
        );
        assert_eq!(
            default_palm_detector_model_path(),
            Path::new("models/palm_detection_mediapipe_2023feb.onnx")
        );
    }

    #[test]
    fn urls_point_at_the_model_files() {
        let url = ModelKind::PalmDetector.url();
        assert!(url.starts_with("https://"));
        assert!(url.ends_with("/palm_detection_mediapipe_2023feb.onnx"));
    }

    #[test]
    fn present_model_is_not_downloaded() {
        let path = std::env::temp_dir().join(format!(
            "gesture-overlay-present-{}.onnx",
            std::process::id()
        ));
        fs::write(&path, b"onnx").unwrap();

        let mut events = Vec::new();
        ensure_model_ready(ModelKind::HandposeEstimator, &path, |e| events.push(e)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            events,
            vec![
                ModelDownloadEvent::AlreadyPresent {
                    model: ModelKind::HandposeEstimator
                },
                ModelDownloadEvent::Finished {
                    model: ModelKind::HandposeEstimator
                },
            ]
        );
    }
}
