//! Camera capture module
//!
//! Provides cross-platform camera capture using the nokhwa crate. The device is
//! owned by exactly one `CameraCapture`; dropping it stops the stream and frees
//! the device for the next owner. Frame reads block until the camera delivers.

use std::time::{Duration, Instant};

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use thiserror::Error;

/// Camera errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Failed to open camera {0}: {1}")]
    Open(u32, String),
    #[error("Failed to open camera stream: {0}")]
    Stream(String),
    #[error("Failed to capture frame: {0}")]
    Capture(String),
    #[error("Camera lost after {0} consecutive failed reads")]
    Lost(u32),
}

/// Camera frame data
#[derive(Clone, Debug)]
pub struct CameraFrame {
    /// RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame number
    pub frame_number: u64,
    /// Frame timestamp
    pub timestamp: Instant,
}

impl CameraFrame {
    /// Create a downscaled copy of the frame for ML inference
    pub fn downscale(&self, target_width: u32, target_height: u32) -> Vec<u8> {
        if self.width == target_width && self.height == target_height {
            return self.data.clone();
        }

        let mut output = vec![0u8; (target_width * target_height * 4) as usize];
        let x_ratio = self.width as f32 / target_width as f32;
        let y_ratio = self.height as f32 / target_height as f32;

        for y in 0..target_height {
            for x in 0..target_width {
                let src_x = (x as f32 * x_ratio) as u32;
                let src_y = (y as f32 * y_ratio) as u32;
                let src_idx = ((src_y * self.width + src_x) * 4) as usize;
                let dst_idx = ((y * target_width + x) * 4) as usize;

                if src_idx + 3 < self.data.len() && dst_idx + 3 < output.len() {
                    output[dst_idx..dst_idx + 4].copy_from_slice(&self.data[src_idx..src_idx + 4]);
                }
            }
        }

        output
    }

    /// Flip the frame horizontally in place (selfie view)
    pub fn mirror(&mut self) {
        let row_len = (self.width * 4) as usize;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let pixels = self.width as usize;
            for x in 0..pixels / 2 {
                let left = x * 4;
                let right = (pixels - 1 - x) * 4;
                for c in 0..4 {
                    row.swap(left + c, right + c);
                }
            }
        }
    }

    /// Width / height ratio
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Anything that yields camera frames
pub trait FrameSource {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<CameraFrame, CameraError>;
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// Exclusive, synchronous camera capture
pub struct CameraCapture {
    camera: Camera,
    index: u32,
    mirror: bool,
    frame_count: u64,
    max_consecutive_failures: u32,
}

impl CameraCapture {
    /// List available cameras
    pub fn list_cameras() -> Vec<CameraInfo> {
        let mut cameras = Vec::new();

        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(camera_list) => {
                for (idx, info) in camera_list.iter().enumerate() {
                    cameras.push(CameraInfo {
                        index: idx as u32,
                        name: info.human_name().to_string(),
                    });
                }
            }
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {:?}", e);
            }
        }

        cameras
    }

    /// Open a camera and start streaming
    ///
    /// # Arguments
    /// * `camera_index` - The camera index to use (0 for default)
    /// * `mirror` - Flip frames horizontally
    /// * `max_consecutive_failures` - Failed reads tolerated before the camera is lost
    pub fn open(
        camera_index: u32,
        mirror: bool,
        max_consecutive_failures: u32,
    ) -> Result<Self, CameraError> {
        log::info!("Opening camera {}", camera_index);

        let mut camera = Self::open_device(camera_index)?;

        camera
            .open_stream()
            .map_err(|e| CameraError::Stream(format!("{:?}", e)))?;

        log::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(Self {
            camera,
            index: camera_index,
            mirror,
            frame_count: 0,
            max_consecutive_failures: max_consecutive_failures.max(1),
        })
    }

    /// Try progressively less demanding formats until the device opens
    fn open_device(camera_index: u32) -> Result<Camera, CameraError> {
        let index = CameraIndex::Index(camera_index);

        // First try with AbsoluteHighestResolution
        let requested =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let e = match Camera::new(index.clone(), requested) {
            Ok(c) => return Ok(c),
            Err(e) => e,
        };
        log::warn!("Failed to open camera with highest resolution: {:?}", e);

        // Try with HighestResolution near 640x480 instead
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::HighestResolution(
            nokhwa::utils::Resolution::new(640, 480),
        ));

        let e = match Camera::new(index.clone(), requested) {
            Ok(c) => return Ok(c),
            Err(e) => e,
        };
        log::warn!("Failed with HighestResolution: {:?}", e);

        // Last resort: let the backend pick
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
        Camera::new(index, requested).map_err(|e| CameraError::Open(camera_index, format!("{:?}", e)))
    }

    /// Read and decode a single frame
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::Capture(format!("{:?}", e)))?;
        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CameraError::Capture(format!("decode: {:?}", e)))?;

        let frame_number = self.frame_count;
        self.frame_count += 1;

        let mut frame = CameraFrame {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
            frame_number,
            timestamp: Instant::now(),
        };
        if self.mirror {
            frame.mirror();
        }
        Ok(frame)
    }
}

impl FrameSource for CameraCapture {
    fn next_frame(&mut self) -> Result<CameraFrame, CameraError> {
        let mut failures = 0;
        loop {
            match self.read_frame() {
                Ok(frame) => return Ok(frame),
                Err(e) => {
                    failures += 1;
                    log::warn!("{}", e);
                    if failures >= self.max_consecutive_failures {
                        return Err(CameraError::Lost(failures));
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Failed to stop camera stream: {:?}", e);
        }
        log::info!("Camera {} released", self.index);
    }
}
