use gpio::{AnalogPin, Clock, DigitalPin};
use servo::Servo;
use std::error::Error;
use ultrasonic::DistanceSensor;

use crate::routine::{self, Cue, RoutineConfig, RoutineState};
use crate::speaker::{Speaker, Voice};

/// The control loop: one distance reading, one routine step, then the cue is played.
pub struct Exterminator<A: AnalogPin, D: DigitalPin, C: Clock + Clone, S: Speaker> {
	servo: Servo<A, C>,
	sensor: DistanceSensor<C>,
	sensor_pin: D,
	speaker: S,
	clock: C,
	voice: Voice,
	config: RoutineConfig,
	state: RoutineState,
}

impl<A, D, C, S> Exterminator<A, D, C, S>
	where A: AnalogPin,
		  A::Error: Error + Send + Sync + 'static,
		  D: DigitalPin,
		  C: Clock + Clone,
		  S: Speaker {
	pub fn new(servo: Servo<A, C>,
			   sensor: DistanceSensor<C>,
			   sensor_pin: D,
			   speaker: S,
			   clock: C,
			   voice: Voice,
			   config: RoutineConfig) -> Self {
		Self {
			servo,
			sensor,
			sensor_pin,
			speaker,
			clock,
			voice,
			config,
			state: RoutineState::default(),
		}
	}

	/// Moves the servo to its home position.
	pub fn start(&mut self) -> anyhow::Result<()> {
		info!("Moving servo to {} degrees", self.config.home_angle);
		self.servo.write_angle(self.config.home_angle)?;
		Ok(())
	}

	pub fn cycle(&mut self) -> anyhow::Result<()> {
		let distance_cm = self.sensor.measure(&mut self.sensor_pin);
		trace!("Distance: {:.1} cm", distance_cm);

		let (state, cue) = routine::step(self.state, distance_cm, self.clock.ticks_ms(), &self.config);
		if state.stage != self.state.stage {
			debug!("Stage {} -> {}", self.state.stage, state.stage);
		}
		self.state = state;

		self.play(cue)
	}

	fn play(&mut self, cue: Cue) -> anyhow::Result<()> {
		if let Some(phrase) = cue.phrase {
			// The routine goes on without speech
			if let Err(e) = self.speaker.say(phrase, &self.voice) {
				error!("Failed to say \"{}\": {}", phrase, e);
			}
		}

		if let Some(angle) = cue.angle {
			self.servo.write_angle(angle)?;
		}

		if cue.pause_ms > 0 {
			self.clock.sleep_ms(cue.pause_ms);
		}

		Ok(())
	}

	pub fn run(mut self) -> ! {
		loop {
			if let Err(e) = self.cycle() {
				error!("Cycle failed: {}", e);
			}
		}
	}
}
