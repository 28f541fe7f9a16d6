//! Gesture recognition pipeline
//!
//! Landmarks are reduced to a `HandPose` (finger states, pinch ratio, cursor),
//! classified against the active mode's vocabulary, and debounced by a
//! `Confirmer` into discrete gesture events.

pub mod classifier;
pub mod confirm;
pub mod fingers;

pub use classifier::GestureLabel;
pub use confirm::{ConfirmPolicy, Confirmer};
pub use fingers::{FingerState, HandPose, Point};
