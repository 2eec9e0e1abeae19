// Trait-based interfaces for the digital outputs driving the activity LEDs

use std::fmt;

/// Electrical level of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level that lights an LED wired with the given polarity.
    pub fn active(active_low: bool) -> Self {
        if active_low { Level::Low } else { Level::High }
    }

    pub fn inactive(active_low: bool) -> Self {
        !Self::active(active_low)
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

pub trait OutputPin {
    fn set_level(&mut self, level: Level);
    fn level(&self) -> Level;
}
