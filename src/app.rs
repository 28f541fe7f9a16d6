//! Main application controller
//!
//! Owns the camera, the landmark source, the mode machine, the dispatcher and
//! the file browser, and runs the capture loop on the calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::actions::automation::AutomationSink;
use crate::actions::ActionDispatcher;
use crate::browser::FileBrowser;
use crate::camera::{CameraError, CameraFrame, FrameSource};
use crate::config::Config;
use crate::gesture::HandPose;
use crate::ml::LandmarkSource;
use crate::modes::{log_banner, CancelOutcome, Mode, ModeMachine, StepOutcome, Transition};

/// Ctrl+C flag shared with the signal handler
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag raised by Ctrl+C
    pub fn install() -> Result<Self, ctrlc::Error> {
        let flag = Self::new();
        let handler = flag.clone();
        ctrlc::set_handler(move || handler.trigger())?;
        Ok(flag)
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was raised
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Opens the camera device; called again after every release
pub type CameraOpener = Box<dyn FnMut() -> Result<Box<dyn FrameSource>, CameraError>>;

/// Gesture controller
pub struct Controller {
    config: Config,
    open_camera: CameraOpener,
    landmarks: Box<dyn LandmarkSource>,
    machine: ModeMachine,
    dispatcher: ActionDispatcher,
    browser: Box<dyn FileBrowser>,
    interrupt: InterruptFlag,
    /// Whether the last detection call failed, to avoid repeating the warning
    detect_failing: bool,
    /// Frames processed since start
    frame_count: u64,
}

impl Controller {
    pub fn new(
        config: Config,
        open_camera: CameraOpener,
        landmarks: Box<dyn LandmarkSource>,
        sink: Box<dyn AutomationSink>,
        browser: Box<dyn FileBrowser>,
        interrupt: InterruptFlag,
    ) -> Self {
        let machine = ModeMachine::new(&config);
        let dispatcher = ActionDispatcher::new(sink, &config.cooldowns, &config.actions);
        Self {
            config,
            open_camera,
            landmarks,
            machine,
            dispatcher,
            browser,
            interrupt,
            detect_failing: false,
            frame_count: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run until Ctrl+C in Detection or a fatal camera error
    pub fn run(&mut self) -> Result<(), CameraError> {
        let mut camera = (self.open_camera)()?;
        log_banner(self.machine.mode());

        loop {
            if self.interrupt.take() {
                match self.machine.cancel() {
                    CancelOutcome::Quit => {
                        log::info!("Quit requested");
                        break;
                    }
                    CancelOutcome::ReturnedToDetection(from) => {
                        let transition = Transition::Exit { from };
                        self.apply_transition(transition);
                        if self.config.camera.reacquire_on_mode_switch {
                            drop(camera);
                            camera = self.reacquire_camera()?;
                        }
                        continue;
                    }
                }
            }

            let frame = camera.next_frame()?;
            // A Ctrl+C during the blocking read is handled before this frame
            if self.interrupt.is_raised() {
                continue;
            }

            let outcome = self.process_frame(&frame, frame.timestamp);
            if outcome.transition.is_some() && self.config.camera.reacquire_on_mode_switch {
                drop(camera);
                camera = self.reacquire_camera()?;
            }
        }

        Ok(())
    }

    /// Wait out the settle delay, then open the camera again
    fn reacquire_camera(&mut self) -> Result<Box<dyn FrameSource>, CameraError> {
        let delay = Duration::from_millis(self.config.camera.settle_delay_ms);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let camera = (self.open_camera)()?;
        log::debug!("Camera reacquired for {} mode", self.machine.mode());
        Ok(camera)
    }

    /// Run one frame through detection, classification and dispatch.
    ///
    /// `now` is the capture time; holds and cooldowns are measured against it.
    pub fn process_frame(&mut self, frame: &CameraFrame, now: Instant) -> StepOutcome {
        self.frame_count += 1;

        let hands = match self.landmarks.detect(frame) {
            Ok(hands) => {
                if self.detect_failing {
                    log::info!("Hand detection recovered");
                    self.detect_failing = false;
                }
                hands
            }
            Err(e) => {
                if !self.detect_failing {
                    log::warn!("Hand detection failed: {}", e);
                    self.detect_failing = true;
                }
                Vec::new()
            }
        };

        let pose = HandPose::from_hands(&hands, frame.aspect(), &self.config.gestures);
        if let Some(pose) = &pose {
            if self.machine.mode() == Mode::FileOpening {
                self.dispatcher.point(pose.cursor, self.browser.as_mut());
            }
        }

        let outcome = self.machine.step(pose.as_ref(), now);
        if let (Some(pose), Some(hand)) = (&pose, hands.first()) {
            log::debug!(
                "Frame {}: {} hand ({:.2}) {} pinch {:.2} -> {}",
                frame.frame_number,
                if pose.is_right { "right" } else { "left" },
                hand.confidence,
                pose.fingers,
                pose.pinch_ratio,
                outcome.label
            );
        }

        if let Some(action) = outcome.action {
            self.dispatcher.dispatch(action, now, self.browser.as_mut());
        }
        if let Some(transition) = outcome.transition {
            self.apply_transition(transition);
        }
        outcome
    }

    /// Start or stop the browser around FileOpening
    fn apply_transition(&mut self, transition: Transition) {
        if transition.from() == Mode::FileOpening {
            self.browser.stop();
        }
        if transition.to() == Mode::FileOpening {
            self.browser.start(&self.config.browser.root_dir());
        }
    }
}
