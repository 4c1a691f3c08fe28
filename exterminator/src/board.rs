//! Raspberry Pi wiring: rppal GPIO for the ultrasonic sensor, sysfs PWM for the servo.

use gpio::{DigitalPin, Level, SplitPin};
use pwm::PwmPin;
use rppal::gpio::{Gpio, InputPin, IoPin, Mode, OutputPin};
use serde::{Deserialize, Serialize};
use std::io;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmOutput {
	pub chip: u32,
	pub channel: u32,
}

impl Default for PwmOutput {
	fn default() -> Self {
		PwmOutput { chip: 0, channel: 0 }
	}
}

/// How the sensor is connected, with BCM pin numbers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "wiring")]
pub enum SensorWiring {
	/// Trigger and echo on the same pin (3-pin sensors, or HC-SR04 with joined lines).
	Shared { pin: u8 },
	Split { trigger: u8, echo: u8 },
}

impl Default for SensorWiring {
	fn default() -> Self {
		SensorWiring::Shared { pin: 24 }
	}
}

/// A GPIO switched to output for writes and to input for reads. Errors are `()` like rppal's
/// embedded-hal pins, so that both wirings share one error type.
pub struct RppalPin {
	pin: IoPin,
	mode: Mode,
}

impl RppalPin {
	pub fn new(gpio: &Gpio, bcm_pin: u8) -> rppal::gpio::Result<Self> {
		Ok(RppalPin {
			pin: gpio.get(bcm_pin)?.into_io(Mode::Output),
			mode: Mode::Output,
		})
	}

	fn switch_to(&mut self, mode: Mode) {
		if self.mode != mode {
			self.pin.set_mode(mode);
			self.mode = mode;
		}
	}
}

impl DigitalPin for RppalPin {
	type Error = ();

	fn write_digital(&mut self, level: Level) -> Result<(), ()> {
		self.switch_to(Mode::Output);
		match level {
			Level::Low => self.pin.set_low(),
			Level::High => self.pin.set_high(),
		}
		Ok(())
	}

	fn read_digital(&mut self) -> Result<Level, ()> {
		self.switch_to(Mode::Input);
		Ok(Level::from(self.pin.is_high()))
	}
}

pub enum SensorPin {
	Shared(RppalPin),
	Split(SplitPin<OutputPin, InputPin>),
}

impl DigitalPin for SensorPin {
	type Error = ();

	fn write_digital(&mut self, level: Level) -> Result<(), ()> {
		match self {
			SensorPin::Shared(pin) => pin.write_digital(level),
			SensorPin::Split(pin) => pin.write_digital(level),
		}
	}

	fn read_digital(&mut self) -> Result<Level, ()> {
		match self {
			SensorPin::Shared(pin) => pin.read_digital(),
			SensorPin::Split(pin) => pin.read_digital(),
		}
	}
}

pub fn open_sensor_pin(wiring: SensorWiring) -> rppal::gpio::Result<SensorPin> {
	let gpio = Gpio::new()?;

	Ok(match wiring {
		SensorWiring::Shared { pin } => {
			info!("Ultrasonic sensor on GPIO{}", pin);
			SensorPin::Shared(RppalPin::new(&gpio, pin)?)
		}
		SensorWiring::Split { trigger, echo } => {
			info!("Ultrasonic sensor trigger on GPIO{}, echo on GPIO{}", trigger, echo);
			let mut trigger = gpio.get(trigger)?.into_output();
			trigger.set_low();
			SensorPin::Split(SplitPin::new(trigger, gpio.get(echo)?.into_input()))
		}
	})
}

pub fn open_servo_pin(output: PwmOutput) -> io::Result<PwmPin> {
	info!("Servo on pwmchip{}/pwm{}", output.chip, output.channel);
	PwmPin::new(output.chip, output.channel)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_sensor_pin<P: DigitalPin<Error = ()>>() {}

	#[test]
	fn pin_error_types_test() {
		assert_sensor_pin::<RppalPin>();
		assert_sensor_pin::<SplitPin<OutputPin, InputPin>>();
		assert_sensor_pin::<SensorPin>();
	}

	#[test]
	fn sensor_wiring_test() {
		assert_eq!(SensorWiring::default(), SensorWiring::Shared { pin: 24 });

		let wiring: SensorWiring = serde_json::from_str(r#"{ "wiring": "shared", "pin": 17 }"#).unwrap();
		assert_eq!(wiring, SensorWiring::Shared { pin: 17 });
	}
}
