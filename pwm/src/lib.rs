// Adapted from libraries `rppal` by Rene van der Meer and `sysfs-pwm` by the Rust Embedded team

#[macro_use]
extern crate log;

use gpio::{AnalogPin, ANALOG_DUTY_MAX};
use std::fs::{self, File};
use std::io::{self, prelude::*, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const PWM_PATH: &'static str = "/sys/class/pwm";

const NS_PER_MS: u64 = 1_000_000;

#[derive(Debug)]
pub struct PwmChip {
	root: PathBuf,
	pub number: u32,
}

impl PwmChip {
	/// A chip under the sysfs PWM class directory `root`, usually `/sys/class/pwm`.
	pub fn with_root<P: AsRef<Path>>(root: P, number: u32) -> io::Result<PwmChip> {
		let root = root.as_ref().to_path_buf();
		fs::metadata(root.join(format!("pwmchip{}", number)))?;
		Ok(PwmChip { root, number })
	}

	fn path(&self) -> PathBuf {
		self.root.join(format!("pwmchip{}", self.number))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
	Normal,
	Inverse,
}

/// One channel of a sysfs PWM chip. Durations are in nanoseconds, as in sysfs.
#[derive(Debug)]
pub struct PwmPin {
	chip: PwmChip,
	channel: u32,
	period_ns: Option<u64>,
	unexport_on_drop: bool,
}

impl PwmPin {
	pub fn new(chip: u32, channel: u32) -> io::Result<PwmPin> {
		PwmPin::with_root(PWM_PATH, chip, channel)
	}

	pub fn with_root<P: AsRef<Path>>(root: P, chip: u32, channel: u32) -> io::Result<PwmPin> {
		let chip: PwmChip = PwmChip::with_root(root, chip)?;

		Ok(PwmPin {
			chip,
			channel,
			period_ns: None,
			unexport_on_drop: true,
		})
	}

	fn channel_path(&self) -> PathBuf {
		self.chip.path().join(format!("pwm{}", self.channel))
	}

	fn write_attribute<T: std::fmt::Display>(&self, attribute: &str, value: T) -> io::Result<()> {
		File::create(self.channel_path().join(attribute))?.write_fmt(format_args!("{}", value))
	}

	pub fn export(&self) -> io::Result<()> {
		// Exporting a PWM pin takes a significant time, that is also unpredictable.
		let pwm_path = self.channel_path();
		if !pwm_path.exists() {
			File::create(self.chip.path().join("export"))?
				.write_fmt(format_args!("{}", self.channel))?;

			const MAX_RETRY: usize = 25;
			const EXPORT_DELAY: Duration = Duration::from_millis(30);
			for _ in 0..MAX_RETRY {
				if pwm_path.exists() {
					break;
				}
				thread::sleep(EXPORT_DELAY);
			}
		}

		fs::metadata(pwm_path).map(|_| ())
	}

	pub fn unexport(&self) -> io::Result<()> {
		// Only unexport if the channel is actually exported
		if self.channel_path().exists() {
			File::create(self.chip.path().join("unexport"))?
				.write_fmt(format_args!("{}", self.channel))?;
		}

		Ok(())
	}

	pub fn set_period(&mut self, period_ns: u64) -> io::Result<()> {
		self.write_attribute("period", period_ns)?;
		self.period_ns = Some(period_ns);
		Ok(())
	}

	pub fn set_pulse_width(&mut self, pulse_width_ns: u64) -> io::Result<()> {
		// The sysfs PWM interface calls the pulse width `duty_cycle`.
		self.write_attribute("duty_cycle", pulse_width_ns)
	}

	pub fn set_polarity(&mut self, polarity: Polarity) -> io::Result<()> {
		let polarity = match polarity {
			Polarity::Normal => "normal",
			Polarity::Inverse => "inversed",
		};

		self.write_attribute("polarity", polarity)
	}

	pub fn set_enabled(&mut self, enabled: bool) -> io::Result<()> {
		self.write_attribute("enable", enabled as u8)
	}
}

/// Pulse width produced by a 10-bit duty value over `period_ns`.
pub fn duty_to_pulse_width_ns(duty: u16, period_ns: u64) -> u64 {
	period_ns * duty.min(ANALOG_DUTY_MAX) as u64 / (ANALOG_DUTY_MAX as u64 + 1)
}

impl AnalogPin for PwmPin {
	type Error = io::Error;

	fn set_analog_period(&mut self, period_ms: u32) -> io::Result<()> {
		self.export()?;

		// The kernel rejects a period shorter than the current pulse width.
		self.set_pulse_width(0)?;
		self.set_period(period_ms as u64 * NS_PER_MS)?;
		self.set_polarity(Polarity::Normal)?;
		self.set_enabled(true)?;

		debug!("pwmchip{}/pwm{}: period set to {} ms", self.chip.number, self.channel, period_ms);
		Ok(())
	}

	fn write_analog(&mut self, duty: u16) -> io::Result<()> {
		let period_ns = self.period_ns.ok_or_else(|| {
			io::Error::new(ErrorKind::InvalidInput, "PWM period has not been configured")
		})?;

		self.set_pulse_width(duty_to_pulse_width_ns(duty, period_ns))
	}
}

impl Drop for PwmPin {
	fn drop(&mut self) {
		if self.unexport_on_drop {
			self.unexport().unwrap_or_default()
		}
	}
}
