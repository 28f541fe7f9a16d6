//! Gesture Control - webcam hand gestures mapped to desktop actions
//!
//! Captures camera frames, extracts a hand skeleton with an ONNX landmark model,
//! classifies the finger pose, debounces it into discrete gestures and drives
//! scrolling, zooming and a small document browser through OS input automation.

pub mod actions;
pub mod app;
pub mod browser;
pub mod camera;
pub mod config;
pub mod gesture;
pub mod ml;
pub mod modes;

pub use app::{Controller, InterruptFlag};
pub use config::Config;
