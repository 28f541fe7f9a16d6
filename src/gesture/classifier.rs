//! Gesture classification
//!
//! Labels are matched as exact patterns against the full finger state, in the
//! order the active vocabulary lists them. First match wins; no match is `None`.

use super::fingers::{FingerState, HandPose};

/// Symbolic gesture label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// No hand, or a pose outside the active vocabulary
    #[default]
    None,
    /// All fingers curled
    Fist,
    /// Index finger only
    IndexOnly,
    /// Index and middle fingers
    IndexMiddle,
    /// Thumb only
    ThumbOnly,
    /// Thumb and index fingers
    ThumbIndex,
    /// All five fingers
    OpenPalm,
    /// Thumb tip touching index tip
    Pinch,
    /// Thumb, index and pinky ("rock" sign), used to leave a mode
    ThumbIndexPinky,
}

/// What a label matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Exact finger state
    Fingers(FingerState),
    /// Thumb/index distance below the pinch threshold
    Pinch,
}

impl GestureLabel {
    /// String representation for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fist => "fist",
            Self::IndexOnly => "index_only",
            Self::IndexMiddle => "index_middle",
            Self::ThumbOnly => "thumb_only",
            Self::ThumbIndex => "thumb_index",
            Self::OpenPalm => "open_palm",
            Self::Pinch => "thumb_index_pinch",
            Self::ThumbIndexPinky => "thumb_index_pinky",
        }
    }

    /// Pattern this label matches, if any
    pub fn pattern(&self) -> Option<Pattern> {
        let fingers = |t, i, m, r, p| Some(Pattern::Fingers(FingerState::new(t, i, m, r, p)));
        match self {
            Self::None => None,
            Self::Fist => fingers(false, false, false, false, false),
            Self::IndexOnly => fingers(false, true, false, false, false),
            Self::IndexMiddle => fingers(false, true, true, false, false),
            Self::ThumbOnly => fingers(true, false, false, false, false),
            Self::ThumbIndex => fingers(true, true, false, false, false),
            Self::OpenPalm => fingers(true, true, true, true, true),
            Self::ThumbIndexPinky => fingers(true, true, false, false, true),
            Self::Pinch => Some(Pattern::Pinch),
        }
    }

    /// Whether a pose matches this label
    pub fn matches(&self, pose: &HandPose, pinch_scale: f32) -> bool {
        match self.pattern() {
            Some(Pattern::Fingers(fingers)) => pose.fingers == fingers,
            Some(Pattern::Pinch) => pose.is_pinching(pinch_scale),
            None => false,
        }
    }
}

impl std::fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a pose against an ordered vocabulary
pub fn classify(pose: Option<&HandPose>, vocabulary: &[GestureLabel], pinch_scale: f32) -> GestureLabel {
    let Some(pose) = pose else {
        return GestureLabel::None;
    };
    vocabulary
        .iter()
        .copied()
        .find(|label| label.matches(pose, pinch_scale))
        .unwrap_or(GestureLabel::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::fingers::Point;

    const ALL: [GestureLabel; 7] = [
        GestureLabel::Fist,
        GestureLabel::IndexOnly,
        GestureLabel::IndexMiddle,
        GestureLabel::ThumbOnly,
        GestureLabel::ThumbIndex,
        GestureLabel::OpenPalm,
        GestureLabel::ThumbIndexPinky,
    ];

    fn pose(fingers: FingerState, pinch_ratio: f32) -> HandPose {
        HandPose {
            fingers,
            pinch_ratio,
            cursor: Point::default(),
            is_right: true,
        }
    }

    #[test]
    fn test_each_pattern_classifies_to_itself() {
        for label in ALL {
            let Some(Pattern::Fingers(fingers)) = label.pattern() else {
                panic!("{} has no finger pattern", label);
            };
            assert_eq!(classify(Some(&pose(fingers, 1.0)), &ALL, 0.28), label);
        }
    }

    #[test]
    fn test_unmatched_pattern_is_none() {
        // Middle finger alone appears in no vocabulary
        let p = pose(FingerState::new(false, false, true, false, false), 1.0);
        assert_eq!(classify(Some(&p), &ALL, 0.28), GestureLabel::None);
    }

    #[test]
    fn test_no_pose_is_none() {
        assert_eq!(classify(None, &ALL, 0.28), GestureLabel::None);
    }

    #[test]
    fn test_vocabulary_limits_labels() {
        let p = pose(FingerState::new(true, true, true, true, true), 1.0);
        let zoom = [GestureLabel::IndexOnly, GestureLabel::IndexMiddle, GestureLabel::Fist];
        assert_eq!(classify(Some(&p), &zoom, 0.28), GestureLabel::None);
    }

    #[test]
    fn test_first_match_wins_for_pinch() {
        // A pinching hand also reads as thumb+index; the vocabulary order decides
        let p = pose(FingerState::new(true, true, false, false, false), 0.1);
        let pinch_first = [GestureLabel::Pinch, GestureLabel::ThumbIndex];
        let fingers_first = [GestureLabel::ThumbIndex, GestureLabel::Pinch];
        assert_eq!(classify(Some(&p), &pinch_first, 0.28), GestureLabel::Pinch);
        assert_eq!(classify(Some(&p), &fingers_first, 0.28), GestureLabel::ThumbIndex);
    }

    #[test]
    fn test_pinch_threshold() {
        let p = pose(FingerState::default(), 0.3);
        assert!(!GestureLabel::Pinch.matches(&p, 0.28));
        assert!(GestureLabel::Pinch.matches(&p, 0.35));
        assert!(!GestureLabel::None.matches(&p, 1.0));
    }

    #[test]
    fn test_label_as_str() {
        assert_eq!(GestureLabel::Pinch.as_str(), "thumb_index_pinch");
        assert_eq!(GestureLabel::IndexMiddle.to_string(), "index_middle");
    }
}
