//! Action dispatch
//!
//! Confirmed gestures become `Action`s. Each action belongs to a class with
//! its own cooldown; an action arriving during its class cooldown is dropped.

pub mod automation;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::browser::{FileBrowser, FileIntent};
use crate::config::{self, ActionSettings, CooldownSettings};
use crate::gesture::Point;
use automation::{AutomationSink, Key};

/// Action bound to a confirmed gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ScrollUp,
    ScrollDown,
    FastScrollUp,
    FastScrollDown,
    ZoomIn,
    ZoomOut,
    File(FileIntent),
}

/// Cooldown group an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    Scroll,
    Zoom,
    FileBrowse,
    FileClose,
}

impl Action {
    pub fn class(&self) -> ActionClass {
        match self {
            Action::ScrollUp | Action::ScrollDown | Action::FastScrollUp | Action::FastScrollDown => {
                ActionClass::Scroll
            }
            Action::ZoomIn | Action::ZoomOut => ActionClass::Zoom,
            Action::File(FileIntent::Select) | Action::File(FileIntent::Back) => ActionClass::FileBrowse,
            Action::File(FileIntent::Close) => ActionClass::FileClose,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ScrollUp => "scroll_up",
            Action::ScrollDown => "scroll_down",
            Action::FastScrollUp => "fast_scroll_up",
            Action::FastScrollDown => "fast_scroll_down",
            Action::ZoomIn => "zoom_in",
            Action::ZoomOut => "zoom_out",
            Action::File(FileIntent::Select) => "select",
            Action::File(FileIntent::Back) => "back",
            Action::File(FileIntent::Close) => "close_file",
        }
    }
}

/// Last-fired instant per action class
#[derive(Debug, Clone)]
pub struct CooldownClock {
    cooldowns: HashMap<ActionClass, Duration>,
    last_fired: HashMap<ActionClass, Instant>,
}

impl CooldownClock {
    pub fn new(settings: &CooldownSettings) -> Self {
        let cooldowns = HashMap::from([
            (ActionClass::Scroll, config::seconds(settings.scroll)),
            (ActionClass::Zoom, config::seconds(settings.zoom)),
            (ActionClass::FileBrowse, config::seconds(settings.file_browse)),
            (ActionClass::FileClose, config::seconds(settings.file_close)),
        ]);
        Self {
            cooldowns,
            last_fired: HashMap::new(),
        }
    }

    /// Cooldown configured for a class
    pub fn cooldown(&self, class: ActionClass) -> Duration {
        self.cooldowns.get(&class).copied().unwrap_or_default()
    }

    /// Whether the class may fire at `now`
    pub fn is_ready(&self, class: ActionClass, now: Instant) -> bool {
        match self.last_fired.get(&class) {
            Some(last) => now.saturating_duration_since(*last) >= self.cooldown(class),
            None => true,
        }
    }

    /// Record a firing if the class is ready; returns whether it fired
    pub fn try_fire(&mut self, class: ActionClass, now: Instant) -> bool {
        if !self.is_ready(class, now) {
            return false;
        }
        self.last_fired.insert(class, now);
        true
    }
}

/// Result of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The external call was made (its own failure is not reported)
    Fired,
    /// Dropped because the class is cooling down
    CoolingDown,
}

/// Executes actions against the automation sink and file browser
pub struct ActionDispatcher {
    sink: Box<dyn AutomationSink>,
    clock: CooldownClock,
    settings: ActionSettings,
}

impl ActionDispatcher {
    pub fn new(
        sink: Box<dyn AutomationSink>,
        cooldowns: &CooldownSettings,
        settings: &ActionSettings,
    ) -> Self {
        Self {
            sink,
            clock: CooldownClock::new(cooldowns),
            settings: settings.clone(),
        }
    }

    /// Run an action unless its class is cooling down
    pub fn dispatch(&mut self, action: Action, now: Instant, browser: &mut dyn FileBrowser) -> Dispatch {
        if !self.clock.try_fire(action.class(), now) {
            log::debug!("Dropped {} (cooling down)", action.as_str());
            return Dispatch::CoolingDown;
        }

        log::info!("Action: {}", action.as_str());

        let result = match action {
            Action::ScrollUp => self.sink.scroll(self.settings.scroll_lines),
            Action::ScrollDown => self.sink.scroll(-self.settings.scroll_lines),
            Action::FastScrollUp => self.sink.scroll(self.settings.fast_scroll_lines),
            Action::FastScrollDown => self.sink.scroll(-self.settings.fast_scroll_lines),
            Action::ZoomIn => self.sink.key_chord(&[Key::Control], Key::Char('=')),
            Action::ZoomOut => self.sink.key_chord(&[Key::Control], Key::Char('-')),
            Action::File(intent) => {
                browser.handle(intent, self.sink.as_mut());
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("{} had no effect: {}", action.as_str(), e);
        }
        Dispatch::Fired
    }

    /// Forward a cursor update to the browser; pointer moves have no cooldown
    pub fn point(&mut self, cursor: Point, browser: &mut dyn FileBrowser) {
        browser.point(cursor, self.sink.as_mut());
    }

    pub fn clock(&self) -> &CooldownClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::automation::recording::{Command, RecordingSink};
    use super::*;
    use crate::browser::test_browser::ScriptedBrowser;

    fn dispatcher(sink: &RecordingSink) -> ActionDispatcher {
        ActionDispatcher::new(
            Box::new(sink.clone()),
            &CooldownSettings::default(),
            &ActionSettings::default(),
        )
    }

    #[test]
    fn test_cooldown_drops_close_actions() {
        let mut clock = CooldownClock::new(&CooldownSettings::default());
        let t0 = Instant::now();

        assert!(clock.try_fire(ActionClass::Zoom, t0));
        assert!(!clock.try_fire(ActionClass::Zoom, t0 + Duration::from_millis(499)));
        assert!(clock.try_fire(ActionClass::Zoom, t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_cooldown_is_per_class() {
        let mut clock = CooldownClock::new(&CooldownSettings::default());
        let t0 = Instant::now();

        assert!(clock.try_fire(ActionClass::Scroll, t0));
        assert!(clock.try_fire(ActionClass::Zoom, t0));
        assert!(!clock.try_fire(ActionClass::Scroll, t0));
        assert!(clock.is_ready(ActionClass::FileClose, t0));
    }

    #[test]
    fn test_huge_cooldown_is_capped() {
        let settings = CooldownSettings {
            scroll: 1e30,
            ..CooldownSettings::default()
        };
        let mut clock = CooldownClock::new(&settings);
        let t0 = Instant::now();

        assert_eq!(clock.cooldown(ActionClass::Scroll), Duration::from_secs(3600));
        assert!(clock.try_fire(ActionClass::Scroll, t0));
        assert!(!clock.try_fire(ActionClass::Scroll, t0 + Duration::from_secs(3599)));
    }

    #[test]
    fn test_dispatch_within_cooldown_fires_once() {
        let sink = RecordingSink::default();
        let mut d = dispatcher(&sink);
        let mut browser = ScriptedBrowser::default();
        let t0 = Instant::now();

        assert_eq!(d.dispatch(Action::ZoomIn, t0, &mut browser), Dispatch::Fired);
        assert_eq!(
            d.dispatch(Action::ZoomOut, t0 + Duration::from_millis(200), &mut browser),
            Dispatch::CoolingDown
        );

        assert_eq!(
            sink.commands(),
            vec![Command::Chord(vec![Key::Control], Key::Char('='))]
        );
    }

    #[test]
    fn test_dispatch_after_cooldown_fires_both() {
        let sink = RecordingSink::default();
        let mut d = dispatcher(&sink);
        let mut browser = ScriptedBrowser::default();
        let t0 = Instant::now();

        assert_eq!(d.dispatch(Action::ScrollUp, t0, &mut browser), Dispatch::Fired);
        assert_eq!(
            d.dispatch(Action::FastScrollDown, t0 + Duration::from_millis(800), &mut browser),
            Dispatch::Fired
        );

        assert_eq!(sink.commands(), vec![Command::Scroll(3), Command::Scroll(-25)]);
    }

    #[test]
    fn test_zoom_out_chord() {
        let sink = RecordingSink::default();
        let mut d = dispatcher(&sink);
        let mut browser = ScriptedBrowser::default();

        d.dispatch(Action::ZoomOut, Instant::now(), &mut browser);
        assert_eq!(
            sink.commands(),
            vec![Command::Chord(vec![Key::Control], Key::Char('-'))]
        );
    }

    #[test]
    fn test_file_intents_reach_browser() {
        let sink = RecordingSink::default();
        let mut d = dispatcher(&sink);
        let mut browser = ScriptedBrowser::default();
        let t0 = Instant::now();

        d.dispatch(Action::File(FileIntent::Select), t0, &mut browser);
        d.dispatch(Action::File(FileIntent::Close), t0, &mut browser);
        // Back shares the browse cooldown with select
        d.dispatch(Action::File(FileIntent::Back), t0, &mut browser);

        assert_eq!(browser.log().intents, vec![FileIntent::Select, FileIntent::Close]);
    }

    #[test]
    fn test_automation_failure_is_swallowed() {
        let sink = RecordingSink::failing();
        let mut d = dispatcher(&sink);
        let mut browser = ScriptedBrowser::default();

        assert_eq!(d.dispatch(Action::ScrollDown, Instant::now(), &mut browser), Dispatch::Fired);
        assert!(sink.commands().is_empty());
        // The failed call still starts the cooldown
        assert!(!d.clock().is_ready(ActionClass::Scroll, Instant::now()));
    }

    #[test]
    fn test_point_moves_os_cursor_without_cooldown() {
        use crate::browser::DirectoryBrowser;
        use crate::config::BrowserSettings;
        use std::path::Path;

        let sink = RecordingSink::default();
        let mut d = dispatcher(&sink);
        let settings = BrowserSettings {
            cursor_smoothing: 1.0,
            move_os_cursor: true,
            ..BrowserSettings::default()
        };
        let mut browser = DirectoryBrowser::with_opener(&settings, Box::new(|_: &Path| Ok(())));

        d.point(Point::new(0.0, 0.0), &mut browser);
        d.point(Point::new(0.5, 0.5), &mut browser);

        assert_eq!(sink.commands(), vec![Command::Move(0, 0), Command::Move(960, 540)]);
        assert!(d.clock().is_ready(ActionClass::FileBrowse, Instant::now()));
    }
}
