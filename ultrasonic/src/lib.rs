//! Single-echo ultrasonic ranging (HC-SR04 and compatible sensors).
//!
//! A 10 µs trigger pulse makes the sensor emit a burst, then raise its echo line for as long as
//! the sound takes to come back. Edges are timed by polling the pin against wall-clock deadlines.

#[macro_use]
extern crate log;

use gpio::{Clock, DigitalPin, Level};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Returned by `DistanceSensor::measure` when no distance could be read.
pub const NO_READING: f32 = -1.;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Deadline for the echo line to go high after the trigger pulse.
    pub rising_timeout_us: u32,
    /// Deadline for the echo line to go low once high.
    pub echo_timeout_us: u32,
    /// A sensor answering later than this is considered faulty.
    pub max_rising_delay_us: u32,
    /// Microseconds of round trip per centimeter.
    pub speed_of_sound_divisor: f32,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            rising_timeout_us: 10_000,
            echo_timeout_us: 30_000,
            max_rising_delay_us: 5300,
            speed_of_sound_divisor: 29.,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum EchoError<E> {
    /// The echo line never went high: the sensor did not answer the trigger.
    NoEcho,
    /// The echo line never went low: the object is out of range or the echo was lost.
    EchoTimeout,
    /// The sensor answered too late for the echo to be trusted.
    InvalidEcho { rising_delay_us: i32 },
    Pin(E),
}

impl<E: fmt::Display> fmt::Display for EchoError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoError::NoEcho => write!(f, "No echo received"),
            EchoError::EchoTimeout => write!(f, "Echo did not end before timeout"),
            EchoError::InvalidEcho { rising_delay_us } => {
                write!(f, "Invalid echo (answered after {} us)", rising_delay_us)
            }
            EchoError::Pin(e) => write!(f, "Pin error: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> Error for EchoError<E> {}

pub struct DistanceSensor<C: Clock> {
    clock: C,
    config: EchoConfig,
}

impl<C: Clock> DistanceSensor<C> {
    pub fn new(clock: C, config: EchoConfig) -> Self {
        Self { clock, config }
    }

    pub fn with_defaults(clock: C) -> Self {
        Self::new(clock, EchoConfig::default())
    }

    pub fn config(&self) -> &EchoConfig {
        &self.config
    }

    /// Distance in centimeters, or `NO_READING` whatever went wrong.
    pub fn measure<P: DigitalPin>(&self, pin: &mut P) -> f32 {
        self.try_measure(pin).unwrap_or_else(|e| {
            if let EchoError::InvalidEcho { rising_delay_us } = e {
                debug!("Invalid echo, sensor answered after {} us", rising_delay_us);
            }
            NO_READING
        })
    }

    pub fn try_measure<P: DigitalPin>(&self, pin: &mut P) -> Result<f32, EchoError<P::Error>> {
        self.trigger(pin).map_err(EchoError::Pin)?;

        let t0 = self.clock.ticks_us();
        let risen = self
            .wait_for(pin, Level::High, t0, self.config.rising_timeout_us)
            .map_err(EchoError::Pin)?;
        if !risen {
            return Err(EchoError::NoEcho);
        }

        let t1 = self.clock.ticks_us();
        let fallen = self
            .wait_for(pin, Level::Low, t1, self.config.echo_timeout_us)
            .map_err(EchoError::Pin)?;
        if !fallen {
            return Err(EchoError::EchoTimeout);
        }

        let t2 = self.clock.ticks_us();

        let rising_delay_us = self.clock.ticks_diff(t1, t0);
        if rising_delay_us > self.config.max_rising_delay_us as i32 {
            return Err(EchoError::InvalidEcho { rising_delay_us });
        }

        let echo_us = self.clock.ticks_diff(t2, t1);
        trace!("Echo: answered after {} us, lasted {} us", rising_delay_us, echo_us);

        // Halved because the sound travels to the object and back
        Ok(echo_us as f32 / self.config.speed_of_sound_divisor / 2.)
    }

    fn trigger<P: DigitalPin>(&self, pin: &mut P) -> Result<(), P::Error> {
        // A short low first so the sensor sees a clean rising edge
        pin.write_digital(Level::Low)?;
        self.clock.sleep_us(2);
        pin.write_digital(Level::High)?;
        self.clock.sleep_us(10);
        pin.write_digital(Level::Low)
    }

    /// Polls until `pin` reads `level`. Returns `false` if `timeout_us` elapsed since `start`.
    fn wait_for<P: DigitalPin>(
        &self,
        pin: &mut P,
        level: Level,
        start: u32,
        timeout_us: u32,
    ) -> Result<bool, P::Error> {
        loop {
            if pin.read_digital()? == level {
                return Ok(true);
            }

            // A negative difference means the clock is not monotonic; treat it as a timeout.
            let elapsed_us = self.clock.ticks_diff(self.clock.ticks_us(), start);
            if elapsed_us < 0 || elapsed_us as u32 >= timeout_us {
                return Ok(false);
            }
        }
    }
}
