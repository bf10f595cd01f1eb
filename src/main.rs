#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(feature = "camera-nokhwa")]
mod ui;

use anyhow::{Context, Result};
use gesture_overlay::{
    DemoConfig, GestureKind,
    model_download,
    pipeline::{EstimatorConfig, OrtEstimator},
};

fn main() -> Result<()> {
    env_logger::init();

    let cfg = DemoConfig::default();
    print_banner();

    let estimator = build_estimator(&cfg).inspect_err(|err| {
        report_startup_failure(
            err,
            "check your network connection, or place the ONNX models under models/ manually",
        )
    })?;

    run(cfg, estimator)
}

fn print_banner() {
    println!("Hand gesture recognition");
    println!("Recognized gestures:");
    for gesture in [
        GestureKind::Peace,
        GestureKind::HiFive,
        GestureKind::Fist,
        GestureKind::ThumbsUp,
        GestureKind::Ok,
    ] {
        println!("  {} {gesture}", gesture.emoji());
    }
    println!("Press 'q' in the window to quit");
}

fn build_estimator(cfg: &DemoConfig) -> Result<OrtEstimator> {
    model_download::ensure_models_ready(&cfg.handpose_model, &cfg.palm_model)?;
    let estimator_cfg: EstimatorConfig = cfg.estimator.clone();
    OrtEstimator::new(&cfg.handpose_model, &cfg.palm_model, estimator_cfg)
        .context("failed to start ONNX Runtime hand landmark estimator")
}

fn report_startup_failure(err: &anyhow::Error, hint: &str) {
    log::error!("startup failed: {err:?}");
    eprintln!("error: {err:#}");
    eprintln!("hint: {hint}");
}

#[cfg(feature = "camera-nokhwa")]
fn run(cfg: DemoConfig, estimator: OrtEstimator) -> Result<()> {
    use crossbeam_channel::{bounded, unbounded};
    use gesture_overlay::pipeline::{ChannelSink, NokhwaCamera, start_capture};
    use gpui::Application;

    let (frame_tx, frame_rx) = bounded(1);
    let (quit_tx, quit_rx) = unbounded();
    let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);

    let camera_index = cfg.camera_index;
    let capture = start_capture(
        move || {
            let opened = NokhwaCamera::open(camera_index);
            let _ = ready_tx.send(opened.as_ref().map(|_| ()).map_err(|err| format!("{err:#}")));
            opened
        },
        estimator,
        ChannelSink::new(frame_tx, quit_rx),
        cfg.quit_poll,
    );

    let opened = ready_rx
        .recv()
        .context("capture thread exited before opening the camera")
        .and_then(|res| res.map_err(anyhow::Error::msg))
        .inspect_err(|err| {
            report_startup_failure(err, "make sure a camera is connected and not used by another app")
        });
    if let Err(err) = opened {
        drop(capture);
        return Err(err);
    }

    let title = cfg.window_title;
    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, title, frame_rx, quit_tx) {
                log::error!("failed to launch ui: {err:?}");
                eprintln!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    if let Some(reason) = capture.join() {
        log::info!("exiting: {reason:?}");
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run(_cfg: DemoConfig, _estimator: OrtEstimator) -> Result<()> {
    let err = anyhow::anyhow!("built without camera support");
    report_startup_failure(&err, "rebuild with the `camera-nokhwa` feature enabled");
    Err(err)
}
