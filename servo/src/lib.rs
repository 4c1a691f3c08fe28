//! Hobby servo driven by a periodic analog signal whose duty cycle encodes the pulse width.

#[macro_use]
extern crate log;

use gpio::{AnalogPin, Clock};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

pub mod specifications;

/// Time given to the servo to reach its position after each command.
pub const SETTLE_DELAY_MS: u32 = 100;

/// Calibration of a servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub frequency_hz: u32,
    /// Shortest pulse supported by the servo, reached at 0°.
    pub min_pulse_us: u32,
    /// Longest pulse supported by the servo, reached at `angle_range_deg`.
    pub max_pulse_us: u32,
    /// Angle between the minimum and maximum positions.
    pub angle_range_deg: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        specifications::SG90
    }
}

impl ServoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.frequency_hz == 0 {
            return Err(String::from("frequency must be strictly positive"));
        }
        if self.period_ms() == 0 {
            return Err(format!(
                "frequency ({} Hz) is too high for a period of at least 1 ms",
                self.frequency_hz
            ));
        }
        if self.min_pulse_us > self.max_pulse_us {
            return Err(format!(
                "minimum pulse width ({} us) exceeds maximum pulse width ({} us)",
                self.min_pulse_us, self.max_pulse_us
            ));
        }
        if self.angle_range_deg == 0 {
            return Err(String::from("angle range must be strictly positive"));
        }
        Ok(())
    }

    /// Signal period in milliseconds, rounded to the nearest integer with halves going to the
    /// even one (16 Hz gives 62 ms, 400 Hz gives 2 ms). 0 for a zero frequency.
    pub fn period_ms(&self) -> u32 {
        const MS_PER_S: u32 = 1000;
        if self.frequency_hz == 0 {
            return 0;
        }

        let (period, remainder) = (MS_PER_S / self.frequency_hz, MS_PER_S % self.frequency_hz);
        let twice_remainder = 2 * remainder as u64;
        let frequency = self.frequency_hz as u64;
        if twice_remainder > frequency || (twice_remainder == frequency && period % 2 == 1) {
            period + 1
        } else {
            period
        }
    }

    pub fn clamp_pulse(&self, us: i32) -> u32 {
        (us as i64).clamp(self.min_pulse_us as i64, self.max_pulse_us as i64) as u32
    }

    /// 10-bit duty value of a pulse of `us` microseconds, scaled by the frequency.
    pub fn duty_for(&self, us: u32) -> u16 {
        const US_PER_S: u64 = 1_000_000;
        let scaled = us as u64 * 1024 * self.frequency_hz as u64;
        let duty = (scaled + US_PER_S / 2) / US_PER_S;
        duty.min(u16::MAX as u64) as u16
    }

    /// Pulse width for an angle. The angle is taken modulo 360, then limited to the calibrated
    /// range so that angles past `angle_range_deg` hold the maximum position.
    pub fn pulse_for_angle(&self, degrees: i32) -> u32 {
        let degrees = (degrees.rem_euclid(360) as u32).min(self.angle_range_deg);
        let total_range = (self.max_pulse_us - self.min_pulse_us) as u64;
        self.min_pulse_us + (total_range * degrees as u64 / self.angle_range_deg as u64) as u32
    }
}

#[derive(Debug)]
pub enum ServoError<E> {
    Config(String),
    Pin(E),
}

impl<E: fmt::Display> fmt::Display for ServoError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoError::Config(reason) => write!(f, "Invalid servo configuration: {}", reason),
            ServoError::Pin(e) => write!(f, "Failed to configure servo pin: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> Error for ServoError<E> {}

pub struct Servo<P: AnalogPin, C: Clock> {
    pin: P,
    clock: C,
    config: ServoConfig,
    current_us: u32,
}

impl<P: AnalogPin, C: Clock> Servo<P, C> {
    pub fn new(mut pin: P, clock: C, config: ServoConfig) -> Result<Self, ServoError<P::Error>> {
        config.validate().map_err(ServoError::Config)?;

        pin.set_analog_period(config.period_ms())
            .map_err(ServoError::Pin)?;

        Ok(Self {
            pin,
            clock,
            config,
            current_us: 0,
        })
    }

    pub fn with_defaults(pin: P, clock: C) -> Result<Self, ServoError<P::Error>> {
        Self::new(pin, clock, ServoConfig::default())
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    /// Last commanded pulse width, 0 before the first command.
    pub fn pulse_width_us(&self) -> u32 {
        self.current_us
    }

    /// Commands a pulse width, clamped to the calibrated range, then waits for the servo to
    /// settle.
    pub fn write_us(&mut self, us: i32) -> Result<(), P::Error> {
        let us = self.config.clamp_pulse(us);
        let duty = self.config.duty_for(us);

        trace!("Servo: {} us (duty {})", us, duty);

        self.pin.write_analog(duty)?;
        self.current_us = us;

        self.clock.sleep_ms(SETTLE_DELAY_MS);

        Ok(())
    }

    pub fn write_angle(&mut self, degrees: i32) -> Result<(), P::Error> {
        let us = self.config.pulse_for_angle(degrees);
        self.write_us(us as i32)
    }

    /// Gives the pin back. The signal keeps its last duty cycle.
    pub fn release(self) -> P {
        self.pin
    }
}
