//! Mode state machine
//!
//! Detection is the hub: a confirmed entry gesture switches to one child mode,
//! and a confirmed fist in a child mode returns to Detection. Every entry gets a
//! fresh `Confirmer`, so no hold survives a transition.

use std::fmt;
use std::time::Instant;

use crate::actions::Action;
use crate::browser::FileIntent;
use crate::config::{Config, ConfirmationSettings};
use crate::gesture::classifier::classify;
use crate::gesture::{ConfirmPolicy, Confirmer, GestureLabel, HandPose};

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Detection,
    Scroll,
    Zoom,
    FileOpening,
}

/// What a confirmed label means in a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch from Detection into a child mode
    Enter(Mode),
    /// Return to Detection, optionally running an action first
    Exit { on_exit: Option<Action> },
    /// Run an action and stay
    Act(Action),
    /// Recognised but has no effect
    Ignore,
}

const DETECTION_VOCABULARY: &[GestureLabel] = &[
    GestureLabel::ThumbIndex,
    GestureLabel::OpenPalm,
    GestureLabel::IndexOnly,
    GestureLabel::Fist,
];

const SCROLL_VOCABULARY: &[GestureLabel] = &[
    GestureLabel::IndexOnly,
    GestureLabel::IndexMiddle,
    GestureLabel::ThumbOnly,
    GestureLabel::OpenPalm,
    GestureLabel::Fist,
];

const ZOOM_VOCABULARY: &[GestureLabel] = &[
    GestureLabel::IndexOnly,
    GestureLabel::IndexMiddle,
    GestureLabel::Fist,
];

// Fist is tested before pinch: a curled thumb can rest near a curled index tip
const FILE_OPENING_VOCABULARY: &[GestureLabel] = &[
    GestureLabel::Fist,
    GestureLabel::Pinch,
    GestureLabel::IndexMiddle,
];

const MASTER_EXIT_VOCABULARY: &[GestureLabel] = &[GestureLabel::ThumbIndexPinky];

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Detection => "Detection",
            Mode::Scroll => "Scroll",
            Mode::Zoom => "Zoom",
            Mode::FileOpening => "File Opening",
        }
    }

    pub fn is_child(&self) -> bool {
        *self != Mode::Detection
    }

    /// Labels this mode recognises, in match order
    pub fn vocabulary(&self) -> &'static [GestureLabel] {
        match self {
            Mode::Detection => DETECTION_VOCABULARY,
            Mode::Scroll => SCROLL_VOCABULARY,
            Mode::Zoom => ZOOM_VOCABULARY,
            Mode::FileOpening => FILE_OPENING_VOCABULARY,
        }
    }

    /// Confirmation policy for this mode
    pub fn policy(&self, settings: &ConfirmationSettings) -> ConfirmPolicy {
        match self {
            Mode::Detection => settings.detection.policy(),
            Mode::Scroll => settings.scroll.policy(),
            Mode::Zoom => settings.zoom.policy(),
            Mode::FileOpening => settings.file_opening.policy(),
        }
    }

    /// Meaning of a confirmed label
    pub fn command(&self, label: GestureLabel) -> Command {
        use crate::gesture::GestureLabel as G;

        match (self, label) {
            (Mode::Detection, G::ThumbIndex) => Command::Enter(Mode::FileOpening),
            (Mode::Detection, G::OpenPalm) => Command::Enter(Mode::Scroll),
            (Mode::Detection, G::IndexOnly) => Command::Enter(Mode::Zoom),

            (Mode::Scroll, G::IndexOnly) => Command::Act(Action::ScrollUp),
            (Mode::Scroll, G::IndexMiddle) => Command::Act(Action::ScrollDown),
            (Mode::Scroll, G::ThumbOnly) => Command::Act(Action::FastScrollUp),
            (Mode::Scroll, G::OpenPalm) => Command::Act(Action::FastScrollDown),

            (Mode::Zoom, G::IndexOnly) => Command::Act(Action::ZoomIn),
            (Mode::Zoom, G::IndexMiddle) => Command::Act(Action::ZoomOut),

            (Mode::FileOpening, G::Pinch) => Command::Act(Action::File(FileIntent::Select)),
            (Mode::FileOpening, G::IndexMiddle) => Command::Act(Action::File(FileIntent::Back)),
            (Mode::FileOpening, G::Fist) => Command::Exit {
                on_exit: Some(Action::File(FileIntent::Close)),
            },

            (Mode::Scroll | Mode::Zoom, G::Fist) => Command::Exit { on_exit: None },

            _ => Command::Ignore,
        }
    }

    /// Gesture guide shown on entry
    pub fn guide(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Mode::Detection => &[
                ("thumb + index", "file opening mode"),
                ("open palm", "scroll mode"),
                ("index finger", "zoom mode"),
                ("Ctrl+C", "quit"),
            ],
            Mode::Scroll => &[
                ("index finger", "scroll up"),
                ("index + middle", "scroll down"),
                ("thumb", "fast scroll up"),
                ("open palm", "fast scroll down"),
                ("fist", "back to detection"),
            ],
            Mode::Zoom => &[
                ("index finger", "zoom in"),
                ("index + middle", "zoom out"),
                ("fist", "back to detection"),
            ],
            Mode::FileOpening => &[
                ("point", "move the cursor"),
                ("pinch", "select"),
                ("index + middle", "back to categories"),
                ("fist", "close last file and leave"),
            ],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode change produced by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enter(Mode),
    Exit { from: Mode },
}

impl Transition {
    /// Mode left by this transition
    pub fn from(&self) -> Mode {
        match self {
            Transition::Enter(_) => Mode::Detection,
            Transition::Exit { from } => *from,
        }
    }

    /// Mode entered by this transition
    pub fn to(&self) -> Mode {
        match self {
            Transition::Enter(mode) => *mode,
            Transition::Exit { .. } => Mode::Detection,
        }
    }
}

/// Result of feeding one frame to the machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Frame label in the active vocabulary
    pub label: GestureLabel,
    /// Label confirmed on this frame
    pub confirmed: Option<GestureLabel>,
    /// Action to dispatch, before any transition is applied
    pub action: Option<Action>,
    pub transition: Option<Transition>,
}

/// Result of a cancel signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    ReturnedToDetection(Mode),
    Quit,
}

/// Active mode plus its confirmation state
pub struct ModeMachine {
    mode: Mode,
    confirmer: Confirmer,
    /// Thumb+index+pinky hold, only armed in child modes
    master_exit: Option<Confirmer>,
    settings: ConfirmationSettings,
    pinch_scale: f32,
}

impl ModeMachine {
    pub fn new(config: &Config) -> Self {
        let settings = config.confirmation.clone();
        let mode = Mode::Detection;
        Self {
            mode,
            confirmer: Confirmer::new(mode.policy(&settings)),
            master_exit: None,
            settings,
            pinch_scale: config.gestures.pinch_scale,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn confirmer(&self) -> &Confirmer {
        &self.confirmer
    }

    /// Progress of the current hold toward confirmation (0.0 - 1.0)
    pub fn progress(&self, now: Instant) -> f32 {
        self.confirmer.progress(now)
    }

    /// Switch modes with fresh confirmation state
    fn enter(&mut self, mode: Mode) {
        self.mode = mode;
        self.confirmer = Confirmer::new(mode.policy(&self.settings));
        self.master_exit = match self.settings.master_exit() {
            Some(hold) if mode.is_child() => Some(Confirmer::new(ConfirmPolicy::Duration(hold))),
            _ => None,
        };
        log_banner(mode);
    }

    /// Feed one frame's pose
    pub fn step(&mut self, pose: Option<&HandPose>, now: Instant) -> StepOutcome {
        let from = self.mode;

        if let Some(master) = self.master_exit.as_mut() {
            let label = classify(pose, MASTER_EXIT_VOCABULARY, self.pinch_scale);
            if let Some(confirmed) = master.observe(label, now) {
                log::info!("Master exit from {}", from);
                self.enter(Mode::Detection);
                return StepOutcome {
                    label,
                    confirmed: Some(confirmed),
                    action: None,
                    transition: Some(Transition::Exit { from }),
                };
            }
            if label != GestureLabel::None {
                log::debug!("Hold to exit: {:.0}%", master.progress(now) * 100.0);
            }
        }

        let label = classify(pose, from.vocabulary(), self.pinch_scale);
        let mut outcome = StepOutcome {
            label,
            ..StepOutcome::default()
        };

        let Some(confirmed) = self.confirmer.observe(label, now) else {
            if label != GestureLabel::None && self.confirmer.current() == label {
                log::debug!("{}: hold {} {:.0}%", from, label, self.progress(now) * 100.0);
            }
            return outcome;
        };
        outcome.confirmed = Some(confirmed);
        log::debug!("{}: confirmed {}", from, confirmed);

        match from.command(confirmed) {
            Command::Enter(mode) => {
                log::info!("{} -> {}", from, mode);
                self.enter(mode);
                outcome.transition = Some(Transition::Enter(mode));
            }
            Command::Exit { on_exit } => {
                log::info!("{} -> {}", from, Mode::Detection);
                outcome.action = on_exit;
                self.enter(Mode::Detection);
                outcome.transition = Some(Transition::Exit { from });
            }
            Command::Act(action) => outcome.action = Some(action),
            Command::Ignore => log::debug!("{} has no effect in {}", confirmed, from),
        }
        outcome
    }

    /// Apply the cancel signal
    pub fn cancel(&mut self) -> CancelOutcome {
        match self.mode {
            Mode::Detection => CancelOutcome::Quit,
            from => {
                log::info!("Cancelled {}", from);
                self.enter(Mode::Detection);
                CancelOutcome::ReturnedToDetection(from)
            }
        }
    }
}

/// Log the mode banner and its gesture guide
pub fn log_banner(mode: Mode) {
    log::info!("=== {} mode ===", mode);
    for (gesture, effect) in mode.guide() {
        log::info!("  {:<16} {}", gesture, effect);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ConfirmSetting;
    use crate::gesture::fingers::test_hands::{hand, pinching_hand};
    use crate::gesture::FingerState;

    const FRAME: Duration = Duration::from_millis(33);

    fn pose_of(fingers: FingerState) -> HandPose {
        HandPose::from_hand(&hand(fingers), 1.0, &Default::default())
    }

    fn fist() -> HandPose {
        pose_of(FingerState::new(false, false, false, false, false))
    }
    fn index_only() -> HandPose {
        pose_of(FingerState::new(false, true, false, false, false))
    }
    fn index_middle() -> HandPose {
        pose_of(FingerState::new(false, true, true, false, false))
    }
    fn thumb_index() -> HandPose {
        pose_of(FingerState::new(true, true, false, false, false))
    }
    fn open_palm() -> HandPose {
        pose_of(FingerState::new(true, true, true, true, true))
    }
    fn rock() -> HandPose {
        pose_of(FingerState::new(true, true, false, false, true))
    }

    /// Machine with frame-count confirmation everywhere, for compact tests
    fn machine(frames: u32) -> ModeMachine {
        let mut config = Config::default();
        let setting = ConfirmSetting::Frames { count: frames };
        config.confirmation.detection = setting;
        config.confirmation.scroll = setting;
        config.confirmation.zoom = setting;
        config.confirmation.file_opening = setting;
        ModeMachine::new(&config)
    }

    /// Feed `n` frames of one pose, collecting the outcomes
    fn feed(m: &mut ModeMachine, pose: &HandPose, n: u32, t0: Instant) -> Vec<StepOutcome> {
        (0..n).map(|i| m.step(Some(pose), t0 + FRAME * i)).collect()
    }

    #[test]
    fn test_vocabularies() {
        let p = open_palm();
        assert_eq!(classify(Some(&p), Mode::Detection.vocabulary(), 0.28), GestureLabel::OpenPalm);
        assert_eq!(classify(Some(&p), Mode::Zoom.vocabulary(), 0.28), GestureLabel::None);

        let pinch = HandPose::from_hand(&pinching_hand(), 1.0, &Default::default());
        assert_eq!(
            classify(Some(&pinch), Mode::FileOpening.vocabulary(), 0.28),
            GestureLabel::Pinch
        );
        assert_eq!(
            classify(Some(&fist()), Mode::FileOpening.vocabulary(), 0.28),
            GestureLabel::Fist
        );
    }

    #[test]
    fn test_entry_gestures() {
        let t0 = Instant::now();
        for (pose, target) in [
            (thumb_index(), Mode::FileOpening),
            (open_palm(), Mode::Scroll),
            (index_only(), Mode::Zoom),
        ] {
            let mut m = machine(1);
            let out = m.step(Some(&pose), t0);
            assert_eq!(out.transition, Some(Transition::Enter(target)));
            assert_eq!(m.mode(), target);
        }
    }

    #[test]
    fn test_fist_in_detection_is_idempotent() {
        let mut m = machine(2);
        let outcomes = feed(&mut m, &fist(), 10, Instant::now());

        assert_eq!(m.mode(), Mode::Detection);
        assert!(outcomes.iter().all(|o| o.transition.is_none() && o.action.is_none()));
        assert_eq!(
            outcomes.iter().filter(|o| o.confirmed.is_some()).count(),
            1
        );
    }

    #[test]
    fn test_fist_exits_child_mode_with_fresh_state() {
        let mut m = machine(3);
        let t0 = Instant::now();
        feed(&mut m, &open_palm(), 3, t0);
        assert_eq!(m.mode(), Mode::Scroll);

        // Partial index hold, then a fist
        feed(&mut m, &index_only(), 2, t0);
        let out = feed(&mut m, &fist(), 3, t0);
        assert_eq!(out[2].transition, Some(Transition::Exit { from: Mode::Scroll }));
        assert_eq!(out[2].action, None);
        assert_eq!(m.mode(), Mode::Detection);
        assert!(m.confirmer().is_idle());
    }

    #[test]
    fn test_scroll_actions() {
        let mut m = machine(1);
        let t0 = Instant::now();
        m.step(Some(&open_palm()), t0);

        let cases = [
            (index_only(), Action::ScrollUp),
            (index_middle(), Action::ScrollDown),
            (pose_of(FingerState::new(true, false, false, false, false)), Action::FastScrollUp),
            (open_palm(), Action::FastScrollDown),
        ];
        for (pose, action) in cases {
            assert_eq!(m.step(Some(&pose), t0).action, Some(action));
        }
    }

    #[test]
    fn test_zoom_scenario_fires_once() {
        // [IndexOnly] x 9 then [Fist] with an 8-frame policy
        let mut m = ModeMachine::new(&Config::default());
        m.enter(Mode::Zoom);
        let t0 = Instant::now();

        let mut actions: Vec<_> = feed(&mut m, &index_only(), 9, t0)
            .into_iter()
            .filter_map(|o| o.action)
            .collect();
        let last = m.step(Some(&fist()), t0 + FRAME * 9);
        actions.extend(last.action);

        assert_eq!(actions, vec![Action::ZoomIn]);
        // One fist frame is not enough to leave
        assert_eq!(m.mode(), Mode::Zoom);
    }

    #[test]
    fn test_detection_hold_exactly_one_second() {
        let mut m = ModeMachine::new(&Config::default());
        let t0 = Instant::now();
        let pose = thumb_index();

        assert!(m.step(Some(&pose), t0).transition.is_none());
        assert!(m.step(Some(&pose), t0 + Duration::from_millis(500)).transition.is_none());
        let out = m.step(Some(&pose), t0 + Duration::from_secs(1));

        assert_eq!(out.transition, Some(Transition::Enter(Mode::FileOpening)));
        assert_eq!(m.mode(), Mode::FileOpening);
        assert!(m.confirmer().is_idle());
        assert_eq!(
            m.confirmer().policy(),
            ConfirmPolicy::Duration(Duration::from_millis(350))
        );

        // The entry hold does not leak into the new mode
        let next = m.step(Some(&pose), t0 + Duration::from_millis(1033));
        assert_eq!(next.confirmed, None);
    }

    #[test]
    fn test_file_opening_fist_closes_then_exits() {
        let mut m = machine(1);
        let t0 = Instant::now();
        m.step(Some(&thumb_index()), t0);

        let out = m.step(Some(&fist()), t0);
        assert_eq!(out.action, Some(Action::File(FileIntent::Close)));
        assert_eq!(out.transition, Some(Transition::Exit { from: Mode::FileOpening }));
    }

    #[test]
    fn test_master_exit_after_hold() {
        let mut m = machine(1);
        let t0 = Instant::now();
        m.step(Some(&index_only()), t0);
        assert_eq!(m.mode(), Mode::Zoom);

        let pose = rock();
        assert!(m.step(Some(&pose), t0 + Duration::from_millis(100)).transition.is_none());
        assert!(m.step(Some(&pose), t0 + Duration::from_millis(1500)).transition.is_none());
        let out = m.step(Some(&pose), t0 + Duration::from_millis(2100));

        assert_eq!(out.transition, Some(Transition::Exit { from: Mode::Zoom }));
        assert_eq!(m.mode(), Mode::Detection);
    }

    #[test]
    fn test_master_exit_disabled() {
        let mut config = Config::default();
        config.confirmation.zoom = ConfirmSetting::Frames { count: 1 };
        config.confirmation.master_exit_seconds = None;
        let mut m = ModeMachine::new(&config);
        m.enter(Mode::Zoom);

        let t0 = Instant::now();
        m.step(Some(&rock()), t0);
        assert!(m.step(Some(&rock()), t0 + Duration::from_secs(10)).transition.is_none());
        assert_eq!(m.mode(), Mode::Zoom);
    }

    #[test]
    fn test_progress_tracks_partial_hold() {
        let mut m = ModeMachine::new(&Config::default());
        m.enter(Mode::Zoom);
        let t0 = Instant::now();

        assert_eq!(m.progress(t0), 0.0);
        feed(&mut m, &index_only(), 4, t0);
        assert!((m.progress(t0) - 0.5).abs() < 1e-6);

        // Switching label restarts the hold
        m.step(Some(&index_middle()), t0);
        assert!((m.progress(t0) - 0.125).abs() < 1e-6);

        // Once fired the hold reads as complete
        feed(&mut m, &index_middle(), 7, t0);
        assert_eq!(m.progress(t0), 1.0);
    }

    #[test]
    fn test_no_hand_never_confirms() {
        let mut m = machine(1);
        let t0 = Instant::now();
        for i in 0..5 {
            let out = m.step(None, t0 + FRAME * i);
            assert_eq!(out.label, GestureLabel::None);
            assert_eq!(out.confirmed, None);
        }
    }

    #[test]
    fn test_cancel() {
        let mut m = machine(1);
        assert_eq!(m.cancel(), CancelOutcome::Quit);

        m.step(Some(&open_palm()), Instant::now());
        assert_eq!(m.cancel(), CancelOutcome::ReturnedToDetection(Mode::Scroll));
        assert_eq!(m.mode(), Mode::Detection);
        assert_eq!(m.cancel(), CancelOutcome::Quit);
    }

    #[test]
    fn test_transition_endpoints() {
        let t = Transition::Exit { from: Mode::Zoom };
        assert_eq!((t.from(), t.to()), (Mode::Zoom, Mode::Detection));
        let t = Transition::Enter(Mode::Scroll);
        assert_eq!((t.from(), t.to()), (Mode::Detection, Mode::Scroll));
    }
}
