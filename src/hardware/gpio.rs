// src/hardware/gpio.rs - Digital outputs for hosts without GPIO
use pipeline_shared::{Level, OutputPin};

/// Output pin that only exists in memory and in the trace log.
#[derive(Debug, Clone)]
pub struct VirtualPin {
    number: u8,
    level: Level,
    transitions: u64,
}

impl VirtualPin {
    /// A fresh pin reads low until it is first driven.
    pub fn new(number: u8) -> Self {
        Self {
            number,
            level: Level::Low,
            transitions: 0,
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Number of level changes since construction.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl OutputPin for VirtualPin {
    fn set_level(&mut self, level: Level) {
        if level != self.level {
            self.transitions += 1;
        }
        self.level = level;
        tracing::trace!(pin = self.number, %level, "pin write");
    }

    fn level(&self) -> Level {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_only_changes() {
        let mut pin = VirtualPin::new(8);
        pin.set_level(Level::High);
        pin.set_level(Level::High);
        pin.set_level(Level::Low);
        assert_eq!(pin.level(), Level::Low);
        assert_eq!(pin.transitions(), 2);
        assert_eq!(pin.number(), 8);
    }
}
