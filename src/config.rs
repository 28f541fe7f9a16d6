//! Startup configuration
//!
//! All tunables are read once at startup from `config.json` in the platform
//! config directory. Missing fields fall back to defaults, so a partial file is
//! enough to override a single value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gesture::ConfirmPolicy;

/// Upper bound for any configured hold or cooldown, in seconds
pub const MAX_SECONDS: f32 = 3600.0;

/// Convert configured seconds to a whole-millisecond `Duration`, clamped to
/// `0..=MAX_SECONDS`
pub fn seconds(value: f32) -> Duration {
    if !value.is_finite() {
        return Duration::ZERO;
    }
    let millis = (value.clamp(0.0, MAX_SECONDS) * 1000.0).round();
    Duration::from_millis(millis as u64)
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not find config directory")]
    NoConfigDir,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub gestures: GestureSettings,
    pub confirmation: ConfirmationSettings,
    pub cooldowns: CooldownSettings,
    pub actions: ActionSettings,
    pub browser: BrowserSettings,
}

/// Camera device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera index (0 for the default device)
    pub index: u32,
    /// Mirror frames horizontally (selfie view)
    pub mirror: bool,
    /// Release and reacquire the device on every mode switch
    pub reacquire_on_mode_switch: bool,
    /// Pause between releasing and reacquiring the device
    pub settle_delay_ms: u64,
    /// Consecutive failed reads before the camera counts as lost
    pub max_consecutive_failures: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            mirror: true,
            reacquire_on_mode_switch: true,
            settle_delay_ms: 500,
            max_consecutive_failures: 30,
        }
    }
}

/// Hand landmark detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Explicit path to the hand landmark ONNX model
    pub model_path: Option<PathBuf>,
    /// Minimum hand presence score (0.0 - 1.0)
    pub min_confidence: f32,
    /// Intra-op threads for the inference session
    pub threads: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            min_confidence: 0.7,
            threads: 2,
        }
    }
}

/// Finger and pinch geometry thresholds (normalized frame units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    /// How far a fingertip must sit above its PIP joint to count as extended
    pub finger_margin: f32,
    /// How much farther from the palm centre line the thumb tip must be than its IP joint
    pub thumb_margin: f32,
    /// Pinch fires below this fraction of the hand size
    pub pinch_scale: f32,
    /// Lower bound for the hand size estimate
    pub min_hand_size: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            finger_margin: 0.02,
            thumb_margin: 0.01,
            pinch_scale: 0.28,
            min_hand_size: 0.03,
        }
    }
}

/// Serializable confirmation policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ConfirmSetting {
    /// Hold the gesture for a number of seconds
    Duration { seconds: f32 },
    /// Hold the gesture for a number of consecutive frames
    Frames { count: u32 },
}

impl ConfirmSetting {
    /// Convert into the runtime policy
    pub fn policy(&self) -> ConfirmPolicy {
        match *self {
            ConfirmSetting::Duration { seconds: s } => ConfirmPolicy::Duration(seconds(s)),
            ConfirmSetting::Frames { count } => ConfirmPolicy::Frames(count.max(1)),
        }
    }

    fn sanitize(&mut self) {
        match self {
            ConfirmSetting::Duration { seconds } => in_seconds_range(seconds),
            ConfirmSetting::Frames { count } => *count = (*count).max(1),
        }
    }
}

/// Per-mode confirmation policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationSettings {
    pub detection: ConfirmSetting,
    pub scroll: ConfirmSetting,
    pub zoom: ConfirmSetting,
    pub file_opening: ConfirmSetting,
    /// Thumb+index+pinky hold that leaves any child mode (None disables)
    pub master_exit_seconds: Option<f32>,
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            detection: ConfirmSetting::Duration { seconds: 1.0 },
            scroll: ConfirmSetting::Frames { count: 5 },
            zoom: ConfirmSetting::Frames { count: 8 },
            file_opening: ConfirmSetting::Duration { seconds: 0.35 },
            master_exit_seconds: Some(2.0),
        }
    }
}

impl ConfirmationSettings {
    /// Master-exit hold as a duration
    pub fn master_exit(&self) -> Option<Duration> {
        self.master_exit_seconds.map(seconds)
    }
}

/// Cooldown per action class, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownSettings {
    pub scroll: f32,
    pub zoom: f32,
    pub file_browse: f32,
    pub file_close: f32,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self {
            scroll: 0.8,
            zoom: 0.5,
            file_browse: 0.3,
            file_close: 1.0,
        }
    }
}

/// Magnitudes of the automation calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Wheel notches for a normal scroll
    pub scroll_lines: i32,
    /// Wheel notches for a fast scroll
    pub fast_scroll_lines: i32,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            scroll_lines: 3,
            fast_scroll_lines: 25,
        }
    }
}

/// File browser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Directory scanned for documents (defaults to the working directory)
    pub root: Option<PathBuf>,
    /// Number of file rows shown
    pub per_page: usize,
    /// Cursor smoothing factor (0..1, higher follows faster)
    pub cursor_smoothing: f32,
    /// Drive the OS pointer with the fingertip; a pinch off the rows clicks
    pub move_os_cursor: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            root: None,
            per_page: 8,
            cursor_smoothing: 0.35,
            move_os_cursor: false,
        }
    }
}

impl BrowserSettings {
    /// Resolve the browse root
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn non_negative(value: &mut f32) {
    if !value.is_finite() || *value < 0.0 {
        *value = 0.0;
    }
}

fn in_seconds_range(value: &mut f32) {
    non_negative(value);
    *value = value.min(MAX_SECONDS);
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("gesture-control");
            p.push("config.json");
            p
        })
    }

    /// Load config from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        config.sanitize();
        Ok(config)
    }

    /// Save config as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamp every value into its valid range
    pub fn sanitize(&mut self) {
        self.camera.max_consecutive_failures = self.camera.max_consecutive_failures.max(1);

        self.detector.min_confidence = if self.detector.min_confidence.is_finite() {
            self.detector.min_confidence.clamp(0.0, 1.0)
        } else {
            DetectorSettings::default().min_confidence
        };
        self.detector.threads = self.detector.threads.max(1);

        non_negative(&mut self.gestures.finger_margin);
        non_negative(&mut self.gestures.thumb_margin);
        non_negative(&mut self.gestures.pinch_scale);
        non_negative(&mut self.gestures.min_hand_size);
        if self.gestures.min_hand_size == 0.0 {
            self.gestures.min_hand_size = f32::EPSILON;
        }

        self.confirmation.detection.sanitize();
        self.confirmation.scroll.sanitize();
        self.confirmation.zoom.sanitize();
        self.confirmation.file_opening.sanitize();
        if let Some(seconds) = self.confirmation.master_exit_seconds.as_mut() {
            in_seconds_range(seconds);
        }

        in_seconds_range(&mut self.cooldowns.scroll);
        in_seconds_range(&mut self.cooldowns.zoom);
        in_seconds_range(&mut self.cooldowns.file_browse);
        in_seconds_range(&mut self.cooldowns.file_close);

        self.browser.per_page = self.browser.per_page.max(1);
        if !self.browser.cursor_smoothing.is_finite() || self.browser.cursor_smoothing <= 0.0 {
            self.browser.cursor_smoothing = BrowserSettings::default().cursor_smoothing;
        }
        self.browser.cursor_smoothing = self.browser.cursor_smoothing.min(1.0);
    }
}
