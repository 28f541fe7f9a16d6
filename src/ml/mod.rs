//! ML inference module
//!
//! Provides hand landmark detection using ONNX Runtime. Uses the single-hand
//! landmark model from the PINTO Model Zoo compatible with MediaPipe pipelines.

use std::path::{Path, PathBuf};

use ndarray::Array4;
use thiserror::Error;

use crate::camera::CameraFrame;
use crate::config::DetectorSettings;

/// Landmark indices (MediaPipe hand topology)
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    /// Number of landmarks per hand
    pub const COUNT: usize = 21;
}

/// ML errors
#[derive(Error, Debug)]
pub enum MlError {
    #[error("Models directory not found. Create a 'models' directory with hand_landmark.onnx")]
    ModelDirNotFound,
    #[error("Hand landmark model not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("Failed to initialize ONNX Runtime: {0}")]
    Init(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Hand landmark (normalized frame coordinates, y grows downward)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HandLandmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Detected hand
#[derive(Clone, Debug)]
pub struct Hand {
    /// 21 landmarks
    pub landmarks: [HandLandmark; landmarks::COUNT],
    /// Confidence score
    pub confidence: f32,
    /// Is right hand
    pub is_right: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [HandLandmark::default(); landmarks::COUNT],
            confidence: 0.0,
            is_right: false,
        }
    }
}

/// Source of per-frame hand landmarks
pub trait LandmarkSource {
    /// Detect zero or more hands in a frame
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<Hand>, MlError>;
}

const INPUT_SIZE: u32 = 224;
const MODEL_FILE: &str = "hand_landmark.onnx";

/// ONNX hand landmark model
pub struct HandLandmarker {
    session: ort::session::Session,
    min_confidence: f32,
}

impl HandLandmarker {
    /// Initialize ONNX Runtime and load the model
    pub fn new(settings: &DetectorSettings) -> Result<Self, MlError> {
        let model_path = match &settings.model_path {
            Some(path) => path.clone(),
            None => Self::find_model_dir()?.join(MODEL_FILE),
        };
        if !model_path.exists() {
            return Err(MlError::ModelNotFound(model_path));
        }

        ort::init()
            .with_name("GestureControl")
            .commit()
            .map_err(|e| MlError::Init(e.to_string()))?;

        let session = Self::load_session(&model_path, settings.threads)?;
        log::info!("Loaded hand landmark model from {:?}", model_path);

        Ok(Self {
            session,
            min_confidence: settings.min_confidence,
        })
    }

    fn load_session(path: &Path, threads: usize) -> Result<ort::session::Session, MlError> {
        ort::session::Session::builder()
            .map_err(|e| MlError::Init(format!("Failed to create session builder: {}", e)))?
            .with_intra_threads(threads)
            .map_err(|e| MlError::Init(format!("Failed to set threads: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| MlError::Init(format!("Failed to load model: {}", e)))
    }

    /// Find the models directory
    fn find_model_dir() -> Result<PathBuf, MlError> {
        // Try relative to executable first, walking up for target/{debug,release}
        if let Ok(exe_path) = std::env::current_exe() {
            for dir in exe_path.ancestors().skip(1).take(3) {
                let model_dir = dir.join("models");
                if model_dir.exists() {
                    return Ok(model_dir);
                }
            }
        }

        // Try current directory
        if let Ok(cwd) = std::env::current_dir() {
            let model_dir = cwd.join("models");
            if model_dir.exists() {
                return Ok(model_dir);
            }
        }

        Err(MlError::ModelDirNotFound)
    }

    /// Preprocess frame to NHWC RGB float [0, 1].
    ///
    /// The whole frame is stretched to the square input; there is no palm
    /// detection or crop, so small or distant hands lose accuracy.
    fn preprocess(frame: &CameraFrame) -> Vec<f32> {
        let rgba = frame.downscale(INPUT_SIZE, INPUT_SIZE);
        rgba.chunks_exact(4)
            .flat_map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]
            })
            .collect()
    }

    /// Run the landmark model on a frame
    fn run(&mut self, frame: &CameraFrame) -> Result<Option<Hand>, MlError> {
        let input = Self::preprocess(frame);

        let input_array = Array4::from_shape_vec(
            (1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3),
            input,
        )
        .map_err(|e| MlError::Inference(format!("Failed to create input array: {}", e)))?;

        let input_tensor = ort::value::Tensor::from_array(input_array)
            .map_err(|e| MlError::Inference(format!("Failed to create tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| MlError::Inference(e.to_string()))?;

        // Outputs: landmarks (1, 63), presence (1, 1), handedness (1, 1)
        let mut tensors = Vec::with_capacity(3);
        for (_name, value) in outputs.iter().take(3) {
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| MlError::Inference(format!("Failed to extract output: {}", e)))?;
            tensors.push(data.to_vec());
        }
        if tensors.len() < 3 {
            return Err(MlError::Inference(format!(
                "Expected 3 outputs, got {}",
                tensors.len()
            )));
        }

        let presence = tensors[1].first().copied().unwrap_or(0.0);
        let handedness = tensors[2].first().copied().unwrap_or(0.0);

        Ok(decode_hand(&tensors[0], presence, handedness, self.min_confidence))
    }
}

/// Build a hand from raw model outputs, or None below the confidence threshold
fn decode_hand(coords: &[f32], presence: f32, handedness: f32, min_confidence: f32) -> Option<Hand> {
    if presence < min_confidence || coords.len() < landmarks::COUNT * 3 {
        return None;
    }

    let scale = INPUT_SIZE as f32;
    let mut hand = Hand {
        confidence: presence,
        is_right: handedness >= 0.5,
        ..Hand::default()
    };
    for (i, point) in coords.chunks_exact(3).take(landmarks::COUNT).enumerate() {
        hand.landmarks[i] = HandLandmark {
            x: point[0] / scale,
            y: point[1] / scale,
            z: point[2] / scale,
        };
    }
    Some(hand)
}

impl LandmarkSource for HandLandmarker {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<Hand>, MlError> {
        Ok(self.run(frame)?.into_iter().collect())
    }
}
