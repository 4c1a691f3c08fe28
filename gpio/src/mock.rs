//! Simulated clock and pins. Time only moves when something sleeps or samples a pin, which makes
//! edge timings exact and reproducible.

use crate::{AnalogPin, Clock, DigitalPin, Level};
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_us: Rc<Cell<u32>>,
    sleeps_ms: Rc<RefCell<Vec<u32>>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_us: u32) -> Self {
        let clock = Self::default();
        clock.now_us.set(now_us);
        clock
    }

    pub fn advance(&self, us: u32) {
        self.now_us.set(self.now_us.get().wrapping_add(us));
    }

    /// Every `sleep_ms` call so far, in order.
    pub fn sleeps_ms(&self) -> Vec<u32> {
        self.sleeps_ms.borrow().clone()
    }
}

impl Clock for MockClock {
    fn ticks_us(&self) -> u32 {
        self.now_us.get()
    }

    fn ticks_ms(&self) -> u32 {
        self.now_us.get() / 1000
    }

    fn sleep_ms(&self, ms: u32) {
        self.sleeps_ms.borrow_mut().push(ms);
        self.advance(ms.wrapping_mul(1000));
    }

    fn sleep_us(&self, us: u32) {
        self.advance(us);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl fmt::Display for MockPinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulated pin failure")
    }
}

impl std::error::Error for MockPinError {}

/// Records what was written to it.
#[derive(Debug, Default)]
pub struct MockAnalogPin {
    pub period_ms: Option<u32>,
    pub duties: Vec<u16>,
    pub failing: bool,
}

impl MockAnalogPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn last_duty(&self) -> Option<u16> {
        self.duties.last().copied()
    }
}

impl AnalogPin for MockAnalogPin {
    type Error = MockPinError;

    fn set_analog_period(&mut self, period_ms: u32) -> Result<(), MockPinError> {
        if self.failing {
            return Err(MockPinError);
        }
        self.period_ms = Some(period_ms);
        Ok(())
    }

    fn write_analog(&mut self, duty: u16) -> Result<(), MockPinError> {
        if self.failing {
            return Err(MockPinError);
        }
        self.duties.push(duty);
        Ok(())
    }
}

/// Simulated single-pin ultrasonic sensor.
///
/// The echo goes high `rise_after_us` after the trigger pulse ends and stays high for `width_us`
/// (forever when `None`). Each read costs `read_cost_us` of simulated time.
#[derive(Debug)]
pub struct EchoPin {
    clock: MockClock,
    rise_after_us: Option<u32>,
    width_us: Option<u32>,
    read_cost_us: u32,
    level: Level,
    trigger_end: Option<u32>,
    pub writes: Vec<Level>,
    pub reads: usize,
    pub failing: bool,
}

impl EchoPin {
    pub fn echo(clock: &MockClock, rise_after_us: u32, width_us: u32) -> Self {
        Self::new(clock, Some(rise_after_us), Some(width_us))
    }

    pub fn stuck_low(clock: &MockClock) -> Self {
        Self::new(clock, None, None)
    }

    pub fn stuck_high(clock: &MockClock) -> Self {
        Self::new(clock, Some(0), None)
    }

    fn new(clock: &MockClock, rise_after_us: Option<u32>, width_us: Option<u32>) -> Self {
        Self {
            clock: clock.clone(),
            rise_after_us,
            width_us,
            read_cost_us: 1,
            level: Level::Low,
            trigger_end: None,
            writes: Vec::new(),
            reads: 0,
            failing: false,
        }
    }

    pub fn with_read_cost(mut self, read_cost_us: u32) -> Self {
        self.read_cost_us = read_cost_us;
        self
    }

    fn echo_level(&self) -> Level {
        let (trigger_end, rise_after_us) = match (self.trigger_end, self.rise_after_us) {
            (Some(trigger_end), Some(rise_after_us)) => (trigger_end, rise_after_us),
            _ => return Level::Low,
        };

        let elapsed = self.clock.ticks_us().wrapping_sub(trigger_end);
        let risen = elapsed >= rise_after_us;
        let fallen = self
            .width_us
            .map_or(false, |width_us| elapsed >= rise_after_us.saturating_add(width_us));

        Level::from(risen && !fallen)
    }
}

impl DigitalPin for EchoPin {
    type Error = MockPinError;

    fn write_digital(&mut self, level: Level) -> Result<(), MockPinError> {
        if self.failing {
            return Err(MockPinError);
        }
        if self.level == Level::High && level == Level::Low {
            self.trigger_end = Some(self.clock.ticks_us());
        }
        self.level = level;
        self.writes.push(level);
        Ok(())
    }

    fn read_digital(&mut self) -> Result<Level, MockPinError> {
        if self.failing {
            return Err(MockPinError);
        }
        self.reads += 1;
        self.clock.advance(self.read_cost_us);
        Ok(self.echo_level())
    }
}
