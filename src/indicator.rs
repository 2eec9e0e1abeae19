//! RX/TX activity LEDs.
//!
//! Each indicator owns its pin and its on/off state. A trigger from OFF lights
//! the LED and asks the timer for a wakeup one pulse width later; the wakeup
//! turns it back off. Timers are fire-once and cannot be cancelled.

use std::time::Duration;

use pipeline_shared::config::{IndicatorConfig, PulseMode};
use pipeline_shared::{Level, OutputPin, TimerInterface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorId {
    Rx,
    Tx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Off,
    On,
}

/// Scheduled reversion of one indicator's pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub indicator: IndicatorId,
    pub generation: u64,
}

pub struct ActivityIndicator<P> {
    id: IndicatorId,
    pin: P,
    state: IndicatorState,
    pulse: Duration,
    mode: PulseMode,
    active_low: bool,
    generation: u64,
    triggers: u64,
}

impl<P: OutputPin> ActivityIndicator<P> {
    /// Takes ownership of the pin and drives it to the inactive level.
    pub fn new(id: IndicatorId, mut pin: P, pulse: Duration, mode: PulseMode, active_low: bool) -> Self {
        pin.set_level(Level::inactive(active_low));
        Self {
            id,
            pin,
            state: IndicatorState::Off,
            pulse,
            mode,
            active_low,
            generation: 0,
            triggers: 0,
        }
    }

    pub fn from_config(id: IndicatorId, pin: P, config: &IndicatorConfig) -> Self {
        Self::new(id, pin, config.pulse(), config.pulse_mode, config.active_low)
    }

    pub fn trigger<T>(&mut self, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        self.triggers += 1;
        match (self.mode, self.state) {
            (PulseMode::Retrigger, IndicatorState::On) => {
                self.generation += 1;
                self.schedule(timers);
            }
            _ => self.toggle(timers),
        }
    }

    /// Handles an expired pulse timer.
    pub fn on_wakeup<T>(&mut self, generation: u64, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        match self.mode {
            // uncancellable timer: always flips, even if a trigger already did
            PulseMode::Toggle => self.toggle(timers),
            PulseMode::Retrigger => {
                if generation == self.generation && self.state == IndicatorState::On {
                    self.toggle(timers);
                } else {
                    tracing::trace!(indicator = ?self.id, generation, "stale wakeup ignored");
                }
            }
        }
    }

    fn toggle<T>(&mut self, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        self.state = match self.state {
            IndicatorState::Off => IndicatorState::On,
            IndicatorState::On => IndicatorState::Off,
        };
        if self.state == IndicatorState::On {
            self.generation += 1;
            self.schedule(timers);
        }
        let level = match self.state {
            IndicatorState::On => Level::active(self.active_low),
            IndicatorState::Off => Level::inactive(self.active_low),
        };
        self.pin.set_level(level);
    }

    fn schedule<T>(&self, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        timers.wakeup(
            self.pulse,
            Wakeup {
                indicator: self.id,
                generation: self.generation,
            },
        );
    }

    pub fn id(&self) -> IndicatorId {
        self.id
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Number of `trigger` calls since construction.
    pub fn trigger_count(&self) -> u64 {
        self.triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::gpio::VirtualPin;

    #[derive(Default)]
    struct ManualTimers {
        pending: Vec<(Duration, Wakeup)>,
    }

    impl TimerInterface for ManualTimers {
        type Token = Wakeup;

        fn wakeup(&mut self, after: Duration, token: Wakeup) {
            self.pending.push((after, token));
        }
    }

    impl ManualTimers {
        fn fire_next(&mut self, led: &mut ActivityIndicator<VirtualPin>) {
            let (_, wakeup) = self.pending.remove(0);
            led.on_wakeup(wakeup.generation, self);
        }
    }

    fn indicator(mode: PulseMode) -> ActivityIndicator<VirtualPin> {
        ActivityIndicator::new(IndicatorId::Rx, VirtualPin::new(8), Duration::from_millis(50), mode, true)
    }

    #[test]
    fn test_starts_off_with_pin_inactive() {
        let led = indicator(PulseMode::Toggle);
        assert_eq!(led.state(), IndicatorState::Off);
        assert_eq!(led.pin().level(), Level::High);
    }

    #[test]
    fn test_single_trigger_pulses_and_reverts() {
        let mut timers = ManualTimers::default();
        let mut led = indicator(PulseMode::Toggle);

        led.trigger(&mut timers);
        assert_eq!(led.state(), IndicatorState::On);
        assert_eq!(led.pin().level(), Level::Low);
        assert_eq!(timers.pending.len(), 1);
        assert_eq!(timers.pending[0].0, Duration::from_millis(50));

        timers.fire_next(&mut led);
        assert_eq!(led.state(), IndicatorState::Off);
        assert_eq!(led.pin().level(), Level::High);
        assert!(timers.pending.is_empty());
    }

    #[test]
    fn test_toggle_mode_retrigger_turns_off_early() {
        let mut timers = ManualTimers::default();
        let mut led = indicator(PulseMode::Toggle);

        led.trigger(&mut timers);
        led.trigger(&mut timers);
        assert_eq!(led.state(), IndicatorState::Off);
        assert_eq!(timers.pending.len(), 1);

        // the first wakeup still fires and starts one more pulse
        timers.fire_next(&mut led);
        assert_eq!(led.state(), IndicatorState::On);
        assert_eq!(timers.pending.len(), 1);

        timers.fire_next(&mut led);
        assert_eq!(led.state(), IndicatorState::Off);
        assert!(timers.pending.is_empty());
    }

    #[test]
    fn test_retrigger_mode_extends_pulse() {
        let mut timers = ManualTimers::default();
        let mut led = indicator(PulseMode::Retrigger);

        led.trigger(&mut timers);
        led.trigger(&mut timers);
        assert_eq!(led.state(), IndicatorState::On);
        assert_eq!(timers.pending.len(), 2);

        // first wakeup is stale
        timers.fire_next(&mut led);
        assert_eq!(led.state(), IndicatorState::On);

        timers.fire_next(&mut led);
        assert_eq!(led.state(), IndicatorState::Off);
        assert_eq!(led.pin().level(), Level::High);
        assert!(timers.pending.is_empty());
    }

    #[test]
    fn test_active_high_polarity() {
        let mut timers = ManualTimers::default();
        let mut led = ActivityIndicator::new(
            IndicatorId::Tx,
            VirtualPin::new(9),
            Duration::from_millis(10),
            PulseMode::Toggle,
            false,
        );
        assert_eq!(led.pin().level(), Level::Low);
        led.trigger(&mut timers);
        assert_eq!(led.pin().level(), Level::High);
        assert_eq!(led.trigger_count(), 1);
    }
}
