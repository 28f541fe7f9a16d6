//! Finger-state extraction
//!
//! Every frame is judged on its own; there is no smoothing across frames here.

use std::fmt;

use crate::config::GestureSettings;
use crate::ml::landmarks::*;
use crate::ml::{Hand, HandLandmark};

/// 2D point in normalized frame coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Extended (true) / curled (false) state of each finger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub const fn new(thumb: bool, index: bool, middle: bool, ring: bool, pinky: bool) -> Self {
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    /// Derive finger states from 21 landmarks.
    ///
    /// The four long fingers are extended when the tip sits above the PIP joint
    /// by more than `finger_margin`. The thumb is extended when its tip is
    /// farther from the palm centre line than its IP joint, which holds for
    /// either hand without consulting the handedness label.
    pub fn from_landmarks(lm: &[HandLandmark; COUNT], settings: &GestureSettings) -> Self {
        let long_finger = |tip: usize, pip: usize| lm[tip].y < lm[pip].y - settings.finger_margin;

        let centre_x = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP]
            .iter()
            .map(|&i| lm[i].x)
            .sum::<f32>()
            / 5.0;
        let tip_offset = (lm[THUMB_TIP].x - centre_x).abs();
        let ip_offset = (lm[THUMB_IP].x - centre_x).abs();

        Self {
            thumb: tip_offset > ip_offset + settings.thumb_margin,
            index: long_finger(INDEX_TIP, INDEX_PIP),
            middle: long_finger(MIDDLE_TIP, MIDDLE_PIP),
            ring: long_finger(RING_TIP, RING_PIP),
            pinky: long_finger(PINKY_TIP, PINKY_PIP),
        }
    }
}

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[T:{} I:{} M:{} R:{} P:{}]",
            self.thumb as u8, self.index as u8, self.middle as u8, self.ring as u8, self.pinky as u8
        )
    }
}

/// Everything the classifier needs from one hand in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub fingers: FingerState,
    /// Thumb-tip to index-tip distance divided by hand size
    pub pinch_ratio: f32,
    /// Index fingertip, used as the pointing cursor
    pub cursor: Point,
    pub is_right: bool,
}

impl HandPose {
    /// Build a pose from a single hand.
    ///
    /// `aspect` is the frame's width / height so distances are measured in
    /// square units.
    pub fn from_hand(hand: &Hand, aspect: f32, settings: &GestureSettings) -> Self {
        let lm = &hand.landmarks;
        let distance = |a: usize, b: usize| {
            let dx = (lm[a].x - lm[b].x) * aspect;
            let dy = lm[a].y - lm[b].y;
            (dx * dx + dy * dy).sqrt()
        };

        let hand_size = distance(WRIST, MIDDLE_MCP).max(settings.min_hand_size);
        let pinch_ratio = distance(THUMB_TIP, INDEX_TIP) / hand_size;

        Self {
            fingers: FingerState::from_landmarks(lm, settings),
            pinch_ratio,
            cursor: Point::new(lm[INDEX_TIP].x, lm[INDEX_TIP].y),
            is_right: hand.is_right,
        }
    }

    /// Build a pose only when exactly one hand is present
    pub fn from_hands(hands: &[Hand], aspect: f32, settings: &GestureSettings) -> Option<Self> {
        match hands {
            [hand] => Some(Self::from_hand(hand, aspect, settings)),
            _ => None,
        }
    }

    /// Whether thumb and index tips touch, relative to hand size
    pub fn is_pinching(&self, pinch_scale: f32) -> bool {
        self.pinch_ratio < pinch_scale
    }
}


#[cfg(test)]
mod tests {
    use super::test_hands::*;
    use super::*;

    fn settings() -> GestureSettings {
        GestureSettings::default()
    }

    #[test]
    fn test_all_patterns_round_trip_through_landmarks() {
        for bits in 0..32u8 {
            let expected = FingerState::new(
                bits & 1 != 0,
                bits & 2 != 0,
                bits & 4 != 0,
                bits & 8 != 0,
                bits & 16 != 0,
            );
            let detected = FingerState::from_landmarks(&hand(expected).landmarks, &settings());
            assert_eq!(detected, expected, "pattern {}", expected);
        }
    }

    #[test]
    fn test_thumb_rule_is_mirror_symmetric() {
        let fingers = FingerState::new(true, false, false, false, false);
        let mut left = hand(fingers);
        for lm in left.landmarks.iter_mut() {
            lm.x = 1.0 - lm.x;
        }
        left.is_right = false;

        assert!(FingerState::from_landmarks(&left.landmarks, &settings()).thumb);
    }

    #[test]
    fn test_finger_margin() {
        let mut h = hand(FingerState::new(false, true, false, false, false));
        // Tip only barely above the PIP joint
        h.landmarks[INDEX_TIP].y = 0.49;
        assert!(!FingerState::from_landmarks(&h.landmarks, &settings()).index);
    }

    #[test]
    fn test_pose_requires_exactly_one_hand() {
        let one = hand(FingerState::default());
        assert!(HandPose::from_hands(&[], 1.0, &settings()).is_none());
        assert!(HandPose::from_hands(&[one.clone(), one.clone()], 1.0, &settings()).is_none());
        assert!(HandPose::from_hands(&[one], 1.0, &settings()).is_some());
    }

    #[test]
    fn test_pinch_ratio_scales_with_hand_size() {
        let pose = HandPose::from_hand(&pinching_hand(), 1.0, &settings());
        assert!(pose.is_pinching(0.28));

        let open = HandPose::from_hand(
            &hand(FingerState::new(true, true, false, false, false)),
            1.0,
            &settings(),
        );
        assert!(!open.is_pinching(0.28));

        // Same pose, half the size: ratio is unchanged
        let mut small = pinching_hand();
        for lm in small.landmarks.iter_mut() {
            lm.x *= 0.5;
            lm.y *= 0.5;
        }
        let small_pose = HandPose::from_hand(&small, 1.0, &settings());
        assert!((small_pose.pinch_ratio - pose.pinch_ratio).abs() < 1e-4);
    }

    #[test]
    fn test_cursor_is_index_tip() {
        let h = hand(FingerState::new(false, true, false, false, false));
        let pose = HandPose::from_hand(&h, 1.0, &settings());
        assert_eq!(pose.cursor, Point::new(0.44, 0.40));
        assert!(pose.is_right);
    }

    #[test]
    fn test_display() {
        let f = FingerState::new(true, true, false, false, true);
        assert_eq!(f.to_string(), "[T:1 I:1 M:0 R:0 P:1]");
    }
}
