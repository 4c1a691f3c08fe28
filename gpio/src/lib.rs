//! Pin and timer capabilities shared by the servo driver and the ultrasonic sensor.
//!
//! The drivers only ever talk to hardware through these traits, so the same driver code runs on
//! a Raspberry Pi (rppal pins, sysfs PWM) and against the simulated pins of the `mock` feature.

use embedded_hal::digital::v2::{InputPin, OutputPin};
use std::{
    thread,
    time::{Duration, Instant},
};

#[cfg(feature = "mock")]
pub mod mock;

/// Largest duty value accepted by `AnalogPin::write_analog` (10-bit resolution).
pub const ANALOG_DUTY_MAX: u16 = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Signed difference `end - start` of two wrapping tick counts, correct across a single
/// wraparound.
pub fn ticks_diff(end: u32, start: u32) -> i32 {
    end.wrapping_sub(start) as i32
}

/// A pin emitting a periodic signal whose duty cycle is set with a 10-bit value.
pub trait AnalogPin {
    type Error;

    /// Sets the period of the emitted signal, in milliseconds.
    fn set_analog_period(&mut self, period_ms: u32) -> Result<(), Self::Error>;

    /// Sets the duty cycle, `0` being always low and `ANALOG_DUTY_MAX` always high.
    fn write_analog(&mut self, duty: u16) -> Result<(), Self::Error>;
}

/// A pin that can be both driven and sampled.
///
/// Reading takes `&mut self` because some pins have to switch direction first.
pub trait DigitalPin {
    type Error;

    fn write_digital(&mut self, level: Level) -> Result<(), Self::Error>;

    fn read_digital(&mut self) -> Result<Level, Self::Error>;
}

/// Monotonic tick sources and blocking sleeps.
///
/// Ticks are `u32` and wrap around, so they must only be compared through `ticks_diff`.
pub trait Clock {
    fn ticks_us(&self) -> u32;

    fn ticks_ms(&self) -> u32;

    fn ticks_diff(&self, end: u32, start: u32) -> i32 {
        ticks_diff(end, start)
    }

    fn sleep_ms(&self, ms: u32);

    fn sleep_us(&self, us: u32);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn ticks_us(&self) -> u32 {
        (**self).ticks_us()
    }

    fn ticks_ms(&self) -> u32 {
        (**self).ticks_ms()
    }

    fn ticks_diff(&self, end: u32, start: u32) -> i32 {
        (**self).ticks_diff(end, start)
    }

    fn sleep_ms(&self, ms: u32) {
        (**self).sleep_ms(ms)
    }

    fn sleep_us(&self, us: u32) {
        (**self).sleep_us(us)
    }
}

/// `Clock` backed by `std::time::Instant`, counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start_instant: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn ticks_us(&self) -> u32 {
        // Truncation is the wraparound.
        self.start_instant.elapsed().as_micros() as u32
    }

    fn ticks_ms(&self) -> u32 {
        self.start_instant.elapsed().as_millis() as u32
    }

    fn sleep_ms(&self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }

    fn sleep_us(&self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }
}

/// Presents a separate output pin and input pin as one `DigitalPin`, e.g. the trigger and echo
/// lines of a 4-pin HC-SR04.
#[derive(Debug)]
pub struct SplitPin<T, I> {
    output: T,
    input: I,
}

impl<T, I> SplitPin<T, I> {
    pub fn new(output: T, input: I) -> Self {
        Self { output, input }
    }

    pub fn release(self) -> (T, I) {
        (self.output, self.input)
    }
}

impl<T, I, E> DigitalPin for SplitPin<T, I>
where
    T: OutputPin<Error = E>,
    I: InputPin<Error = E>,
{
    type Error = E;

    fn write_digital(&mut self, level: Level) -> Result<(), E> {
        match level {
            Level::Low => self.output.set_low(),
            Level::High => self.output.set_high(),
        }
    }

    fn read_digital(&mut self) -> Result<Level, E> {
        self.input.is_high().map(Level::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, convert::Infallible};

    struct Clock0;

    impl Clock for Clock0 {
        fn ticks_us(&self) -> u32 {
            0
        }

        fn ticks_ms(&self) -> u32 {
            0
        }

        fn sleep_ms(&self, _: u32) {}

        fn sleep_us(&self, _: u32) {}
    }

    #[test]
    fn ticks_diff_test() {
        let clock = Clock0;
        assert_eq!(clock.ticks_diff(1500, 1000), 500);
        assert_eq!(clock.ticks_diff(1000, 1500), -500);
        assert_eq!(clock.ticks_diff(99, u32::MAX - 100), 200);
        assert_eq!(clock.ticks_diff(u32::MAX - 100, 99), -200);
    }

    struct Line<'a>(&'a Cell<bool>);

    impl OutputPin for Line<'_> {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set(true);
            Ok(())
        }
    }

    impl InputPin for Line<'_> {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    #[test]
    fn split_pin_test() {
        let trigger = Cell::new(false);
        let echo = Cell::new(false);
        let mut pin = SplitPin::new(Line(&trigger), Line(&echo));

        pin.write_digital(Level::High).unwrap();
        assert!(trigger.get());
        assert_eq!(pin.read_digital().unwrap(), Level::Low);

        echo.set(true);
        assert_eq!(pin.read_digital().unwrap(), Level::High);

        pin.write_digital(Level::Low).unwrap();
        assert!(!trigger.get());
    }

    #[test]
    fn system_clock_test() {
        let clock = SystemClock::new();
        let start = clock.ticks_us();
        clock.sleep_ms(2);
        assert!(clock.ticks_diff(clock.ticks_us(), start) >= 2000);
    }
}
