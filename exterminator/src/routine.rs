//! Staged routine played while an object stays in front of the sensor.
//!
//! Every second spent close to the sensor moves the routine one stage further. Each stage turns
//! the servo a little more and says its line; leaving early is commented on and resets the
//! routine.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RoutineConfig {
	/// An object at this distance or closer counts as present.
	pub trigger_distance_cm: f32,
	pub stage_interval_ms: u32,
	/// Servo position when nothing is happening.
	pub home_angle: i32,
	/// Pause after the last stage.
	pub final_pause_ms: u32,
}

impl Default for RoutineConfig {
	fn default() -> Self {
		RoutineConfig {
			trigger_distance_cm: 10.,
			stage_interval_ms: 1000,
			home_angle: 90,
			final_pause_ms: 1000,
		}
	}
}

struct Stage {
	angle: i32,
	phrase: &'static str,
}

const STAGES: [Stage; 5] = [
	Stage { angle: 80, phrase: "COMMENCING EXTERMINATION OF CORONA-VIRUS" },
	Stage { angle: 70, phrase: "CORONA-VIRUS WILL BE EXTER-MI-NATED" },
	Stage { angle: 60, phrase: "CORONA-VIRUS WILL BE EXTER-MI-NATED" },
	Stage { angle: 50, phrase: "VICTORY OVER CORONA-VIRUS IS NEAR" },
	Stage { angle: 40, phrase: "CORONA-VIRUS HAS BEEN EXTER-MI-NATED" },
];

pub const ESCAPE_PHRASE: &'static str = "CORONA-VIRUS IS ESCAPING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutineState {
	/// 0 when idle, then 1 to 5.
	pub stage: u8,
	pub stage_started_ms: u32,
}

/// What the control loop has to do after a step, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cue {
	pub phrase: Option<&'static str>,
	pub angle: Option<i32>,
	pub pause_ms: u32,
}

/// Advances the routine with a new distance reading (`ultrasonic::NO_READING` counts as absent).
pub fn step(state: RoutineState, distance_cm: f32, now_ms: u32, config: &RoutineConfig) -> (RoutineState, Cue) {
	let present = distance_cm > 0. && distance_cm <= config.trigger_distance_cm;

	if !present {
		let cue = Cue {
			phrase: if state.stage == 0 { None } else { Some(ESCAPE_PHRASE) },
			angle: Some(config.home_angle),
			pause_ms: 0,
		};
		return (RoutineState { stage: 0, ..state }, cue);
	}

	let mut state = state;
	// A negative difference is a stage started in the future, which never elapses
	let elapsed_ms = gpio::ticks_diff(now_ms, state.stage_started_ms);
	if elapsed_ms >= 0 && elapsed_ms as u32 >= config.stage_interval_ms {
		state.stage += 1;
		state.stage_started_ms = now_ms;
	}

	if state.stage == 0 {
		return (state, Cue::default());
	}

	let stage = &STAGES[(state.stage as usize - 1).min(STAGES.len() - 1)];
	let mut cue = Cue {
		phrase: Some(stage.phrase),
		angle: Some(stage.angle),
		pause_ms: 0,
	};

	if state.stage as usize >= STAGES.len() {
		state.stage = 0;
		cue.pause_ms = config.final_pause_ms;
	}

	(state, cue)
}
