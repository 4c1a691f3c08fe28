#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use black_box::BlackBox;
use gpio::SystemClock;
use servo::Servo;
use ultrasonic::DistanceSensor;

use crate::config::TryIntoLevelFilter;
use crate::exterminator::Exterminator;
use crate::speaker::{CommandSpeaker, LogSpeaker, Speaker};

mod board;
mod config;
mod exterminator;
mod routine;
mod speaker;

fn main() -> anyhow::Result<()> {
	// Command line arguments
	const CONFIG_ARG: &'static str = "config";
	const WRITE_DEFAULT_CONFIG_ARG: &'static str = "write-default-config";
	const DRY_RUN_ARG: &'static str = "dry-run";

	let args = clap::App::new("Exterminator")
		.version(env!("CARGO_PKG_VERSION"))
		.author("Vincent Leporcher <vincent.leporcher@telecom-paris.fr>")
		.about("Turns a servo and talks while something stays in front of an ultrasonic sensor")
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.value_name("FILE")
			.help("Configuration file")
			.takes_value(true)
			.default_value(config::DEFAULT_CONFIG_PATH))
		.arg(clap::Arg::new(WRITE_DEFAULT_CONFIG_ARG)
			.long("write-default-config")
			.help("Write the default configuration to the configuration file and exit")
			.takes_value(false))
		.arg(clap::Arg::new(DRY_RUN_ARG)
			.long("dry-run")
			.help("Log phrases instead of saying them")
			.takes_value(false))
		.get_matches();

	let config_path = args.value_of(CONFIG_ARG).unwrap_or(config::DEFAULT_CONFIG_PATH);

	if args.is_present(WRITE_DEFAULT_CONFIG_ARG) {
		config::save(config_path, &config::ExterminatorConfig::default())?;
		println!("Default configuration written to {}", config_path);
		return Ok(());
	}

	// Configuration
	let config = config::read(config_path)?;

	// Log
	let level_filter = config.log_level_filter
		.try_into_level_filter()
		.map_err(|_| anyhow!("Failed to parse log level filter"))?;

	BlackBox::new("exterminator")?.spawn(level_filter)?;

	info!("Exterminator {}", env!("CARGO_PKG_VERSION"));

	let clock = SystemClock::new();

	let servo = Servo::new(board::open_servo_pin(config.servo_pwm)?, clock, config.servo)?;
	let sensor = DistanceSensor::new(clock, config.echo);
	let sensor_pin = board::open_sensor_pin(config.sensor)?;

	let speaker: Box<dyn Speaker> = match config.speech_command {
		Some(command) if !args.is_present(DRY_RUN_ARG) => Box::new(CommandSpeaker::new(command)),
		_ => Box::new(LogSpeaker),
	};

	let mut exterminator = Exterminator::new(servo,
											 sensor,
											 sensor_pin,
											 speaker,
											 clock,
											 config.voice,
											 config.routine);

	exterminator.start()?;

	exterminator.run()
}
