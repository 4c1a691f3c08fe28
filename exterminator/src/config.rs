use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use servo::ServoConfig;
use ultrasonic::EchoConfig;

use crate::board::{PwmOutput, SensorWiring};
use crate::routine::RoutineConfig;
use crate::speaker::{SpeechCommand, Voice};

pub const DEFAULT_CONFIG_PATH: &'static str = "exterminator.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExterminatorConfig {
	pub log_level_filter: String,
	pub servo: ServoConfig,
	pub servo_pwm: PwmOutput,
	pub sensor: SensorWiring,
	pub echo: EchoConfig,
	pub routine: RoutineConfig,
	pub voice: Voice,
	/// Phrases are only logged when no command is set.
	pub speech_command: Option<SpeechCommand>,
}

pub trait TryIntoLevelFilter {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()>;
}

impl TryIntoLevelFilter for String {
	fn try_into_level_filter(&self) -> Result<LevelFilter, ()> {
		Ok(match self.as_str() {
			"none" => LevelFilter::Off,
			"error" => LevelFilter::Error,
			"warn" => LevelFilter::Warn,
			"info" => LevelFilter::Info,
			"debug" => LevelFilter::Debug,
			"all" => LevelFilter::Trace,
			_ => return Err(()),
		})
	}
}

impl Default for ExterminatorConfig {
	fn default() -> Self {
		ExterminatorConfig {
			log_level_filter: String::from("info"),
			servo: ServoConfig::default(),
			servo_pwm: PwmOutput::default(),
			sensor: SensorWiring::default(),
			echo: EchoConfig::default(),
			routine: RoutineConfig::default(),
			voice: Voice::default(),
			speech_command: None,
		}
	}
}

pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<ExterminatorConfig> {
	let path = path.as_ref();
	let config_file = File::open(path)
		.map_err(|e| anyhow!("Failed to open configuration file {}: {}", path.display(), e))?;

	let config: ExterminatorConfig = serde_json::from_reader(config_file)?;

	config.servo.validate()
		.map_err(|reason| anyhow!("Invalid servo configuration: {}", reason))?;

	Ok(config)
}

pub fn save<P: AsRef<Path>>(path: P, config: &ExterminatorConfig) -> anyhow::Result<()> {
	let mut config_file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(path)?;

	writeln!(config_file, "{}", serde_json::to_string_pretty(config)?)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn level_filter_test() {
		assert_eq!(String::from("none").try_into_level_filter(), Ok(LevelFilter::Off));
		assert_eq!(String::from("all").try_into_level_filter(), Ok(LevelFilter::Trace));
		assert_eq!(String::from("verbose").try_into_level_filter(), Err(()));
	}

	#[test]
	fn partial_config_test() {
		let config: ExterminatorConfig = serde_json::from_str(r#"{
			"log_level_filter": "debug",
			"servo": { "min_pulse_us": 500, "max_pulse_us": 2500 },
			"sensor": { "wiring": "split", "trigger": 23, "echo": 24 },
			"speech_command": { "program": "espeak" }
		}"#).unwrap();

		assert_eq!(config.log_level_filter, "debug");
		assert_eq!(config.servo, ServoConfig { min_pulse_us: 500, max_pulse_us: 2500, ..ServoConfig::default() });
		assert_eq!(config.sensor, SensorWiring::Split { trigger: 23, echo: 24 });
		assert_eq!(config.echo, EchoConfig::default());
		assert_eq!(config.routine, RoutineConfig::default());
		assert_eq!(config.speech_command.unwrap().args, Vec::<String>::new());
	}

	#[test]
	fn save_then_read_test() {
		let path = std::env::temp_dir().join(format!("exterminator_{}.json", std::process::id()));

		let mut config = ExterminatorConfig::default();
		config.sensor = SensorWiring::Shared { pin: 17 };
		config.speech_command = Some(SpeechCommand::default());

		save(&path, &config).unwrap();
		let read_config = read(&path);
		std::fs::remove_file(&path).unwrap();

		assert_eq!(read_config.unwrap(), config);
	}

	#[test]
	fn invalid_servo_config_test() {
		let path = std::env::temp_dir().join(format!("exterminator_invalid_{}.json", std::process::id()));
		std::fs::write(&path, r#"{ "servo": { "frequency_hz": 0 } }"#).unwrap();

		let result = read(&path);
		std::fs::remove_file(&path).unwrap();

		assert!(result.is_err());
	}
}
