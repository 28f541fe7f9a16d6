//! OS input automation
//!
//! The sink accepts discrete input commands. Callers log failures and carry on;
//! nothing is retried.

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use thiserror::Error;

/// Automation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutomationError {
    #[error("Failed to connect to the input system: {0}")]
    Connect(String),
    #[error("Input command failed: {0}")]
    Input(String),
}

/// Keys used by gesture actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Control,
    Alt,
    F4,
    Char(char),
}

impl Key {
    fn to_enigo(self) -> enigo::Key {
        match self {
            Key::Control => enigo::Key::Control,
            Key::Alt => enigo::Key::Alt,
            Key::F4 => enigo::Key::F4,
            Key::Char(c) => enigo::Key::Unicode(c),
        }
    }
}

/// Destination for input commands
pub trait AutomationSink {
    /// Scroll vertically by wheel notches (positive scrolls up)
    fn scroll(&mut self, notches: i32) -> Result<(), AutomationError>;

    /// Hold `modifiers`, tap `key`, then release the modifiers in reverse order
    fn key_chord(&mut self, modifiers: &[Key], key: Key) -> Result<(), AutomationError>;

    /// Move the pointer to absolute screen pixels
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), AutomationError>;

    /// Left click at the current pointer position
    fn click(&mut self) -> Result<(), AutomationError>;

    /// Size of the main display in pixels
    fn screen_size(&mut self) -> Result<(i32, i32), AutomationError>;
}

fn input_error(e: enigo::InputError) -> AutomationError {
    AutomationError::Input(format!("{:?}", e))
}

/// Automation through enigo
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    pub fn new() -> Result<Self, AutomationError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| AutomationError::Connect(format!("{:?}", e)))?;
        Ok(Self { enigo })
    }
}

impl AutomationSink for EnigoSink {
    fn scroll(&mut self, notches: i32) -> Result<(), AutomationError> {
        // enigo scrolls down for positive lengths
        self.enigo.scroll(-notches, Axis::Vertical).map_err(input_error)
    }

    fn key_chord(&mut self, modifiers: &[Key], key: Key) -> Result<(), AutomationError> {
        for m in modifiers {
            self.enigo.key(m.to_enigo(), Direction::Press).map_err(input_error)?;
        }
        let result = self.enigo.key(key.to_enigo(), Direction::Click).map_err(input_error);

        // Always release modifiers, even when the tap failed
        for m in modifiers.iter().rev() {
            if let Err(e) = self.enigo.key(m.to_enigo(), Direction::Release) {
                log::warn!("Failed to release {:?}: {:?}", m, e);
            }
        }
        result
    }

    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), AutomationError> {
        self.enigo.move_mouse(x, y, Coordinate::Abs).map_err(input_error)
    }

    fn click(&mut self) -> Result<(), AutomationError> {
        self.enigo.button(Button::Left, Direction::Click).map_err(input_error)
    }

    fn screen_size(&mut self) -> Result<(i32, i32), AutomationError> {
        self.enigo.main_display().map_err(input_error)
    }
}
