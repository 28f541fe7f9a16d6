//! Gesture Control - Main Entry Point
//!
//! Maps webcam hand gestures to scrolling, zooming and file opening. Ctrl+C
//! leaves the active mode, or quits from Detection.

use anyhow::Context;

use gesture_control::actions::automation::EnigoSink;
use gesture_control::app::CameraOpener;
use gesture_control::browser::DirectoryBrowser;
use gesture_control::camera::{CameraCapture, FrameSource};
use gesture_control::ml::HandLandmarker;
use gesture_control::{Config, Controller, InterruptFlag};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Gesture Control v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::load();

    let interrupt = InterruptFlag::install().context("Failed to install Ctrl+C handler")?;

    let cameras = CameraCapture::list_cameras();
    for camera in &cameras {
        log::info!("Found camera {}: {}", camera.index, camera.name);
    }

    let landmarks = HandLandmarker::new(&config.detector).context("Failed to load hand landmark model")?;
    let sink = EnigoSink::new().context("Failed to initialize input automation")?;
    let browser = DirectoryBrowser::new(&config.browser);

    let camera_settings = config.camera.clone();
    let open_camera: CameraOpener = Box::new(move || {
        let camera = CameraCapture::open(
            camera_settings.index,
            camera_settings.mirror,
            camera_settings.max_consecutive_failures,
        )?;
        Ok(Box::new(camera) as Box<dyn FrameSource>)
    });

    let mut controller = Controller::new(
        config,
        open_camera,
        Box::new(landmarks),
        Box::new(sink),
        Box::new(browser),
        interrupt,
    );

    controller.run().context("Camera failure")?;

    log::info!("Processed {} frames, exiting", controller.frame_count());
    Ok(())
}
