//! Confirmation (debounce) filter
//!
//! Turns a stream of per-frame labels into discrete events. Exactly one label
//! is tracked at a time, and each continuous hold fires at most once.

use std::time::{Duration, Instant};

use super::classifier::GestureLabel;

/// How long a label must persist before it is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Wall-clock hold time
    Duration(Duration),
    /// Consecutive identical frames
    Frames(u32),
}

/// Per-mode confirmation state
#[derive(Debug, Clone)]
pub struct Confirmer {
    policy: ConfirmPolicy,
    /// Label currently being timed
    current: GestureLabel,
    /// When `current` was first seen
    started_at: Option<Instant>,
    /// Consecutive frames of `current`
    frames: u32,
    /// Whether this hold has already fired
    fired: bool,
}

impl Confirmer {
    pub fn new(policy: ConfirmPolicy) -> Self {
        let policy = match policy {
            ConfirmPolicy::Frames(n) => ConfirmPolicy::Frames(n.max(1)),
            other => other,
        };
        Self {
            policy,
            current: GestureLabel::None,
            started_at: None,
            frames: 0,
            fired: false,
        }
    }

    /// Feed one frame's label; returns the label when its hold is confirmed
    pub fn observe(&mut self, label: GestureLabel, now: Instant) -> Option<GestureLabel> {
        if label != self.current || self.started_at.is_none() {
            self.current = label;
            self.started_at = Some(now);
            self.frames = 0;
            self.fired = false;
        }
        self.frames = self.frames.saturating_add(1);

        if label == GestureLabel::None || self.fired {
            return None;
        }

        if self.is_satisfied(now) {
            self.fired = true;
            Some(label)
        } else {
            None
        }
    }

    fn is_satisfied(&self, now: Instant) -> bool {
        match self.policy {
            ConfirmPolicy::Duration(required) => self
                .started_at
                .map(|start| now.saturating_duration_since(start) >= required)
                .unwrap_or(false),
            ConfirmPolicy::Frames(required) => self.frames >= required,
        }
    }

    /// Progress of the current hold toward confirmation (0.0 - 1.0)
    pub fn progress(&self, now: Instant) -> f32 {
        if self.current == GestureLabel::None {
            return 0.0;
        }
        if self.fired {
            return 1.0;
        }
        let ratio = match self.policy {
            ConfirmPolicy::Duration(required) => {
                if required.is_zero() {
                    1.0
                } else {
                    let held = self
                        .started_at
                        .map(|start| now.saturating_duration_since(start))
                        .unwrap_or_default();
                    held.as_secs_f32() / required.as_secs_f32()
                }
            }
            ConfirmPolicy::Frames(required) => self.frames as f32 / required as f32,
        };
        ratio.clamp(0.0, 1.0)
    }

    /// Clear all tracking
    pub fn reset(&mut self) {
        *self = Self::new(self.policy);
    }

    pub fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Label currently being timed
    pub fn current(&self) -> GestureLabel {
        self.current
    }

    /// Consecutive frames of the current label
    pub fn streak(&self) -> u32 {
        self.frames
    }

    /// Whether no label is being timed
    pub fn is_idle(&self) -> bool {
        self.started_at.is_none() && self.frames == 0
    }
}
