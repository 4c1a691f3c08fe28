use serde::{Deserialize, Serialize};
use std::process::Command;

/// Voice settings of the speech synthesizer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Voice {
	pub speed: u8,
	pub pitch: u8,
	pub throat: u8,
	pub mouth: u8,
}

impl Default for Voice {
	fn default() -> Self {
		Voice {
			speed: 120,
			pitch: 100,
			throat: 100,
			mouth: 200,
		}
	}
}

pub trait Speaker {
	/// Says `phrase`, blocking until done.
	fn say(&mut self, phrase: &str, voice: &Voice) -> anyhow::Result<()>;
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
	fn say(&mut self, phrase: &str, voice: &Voice) -> anyhow::Result<()> {
		(**self).say(phrase, voice)
	}
}

/// Writes phrases to the log instead of saying them.
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
	fn say(&mut self, phrase: &str, _: &Voice) -> anyhow::Result<()> {
		info!("Saying \"{}\"", phrase);
		Ok(())
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpeechCommand {
	pub program: String,
	/// `{speed}`, `{pitch}`, `{throat}` and `{mouth}` are replaced by the voice settings.
	#[serde(default)]
	pub args: Vec<String>,
}

impl Default for SpeechCommand {
	fn default() -> Self {
		SpeechCommand {
			program: String::from("espeak"),
			args: vec![
				String::from("-s"),
				String::from("{speed}"),
				String::from("-p"),
				String::from("{pitch}"),
			],
		}
	}
}

impl SpeechCommand {
	pub fn expand_args(&self, voice: &Voice) -> Vec<String> {
		self.args
			.iter()
			.map(|arg| arg
				.replace("{speed}", &voice.speed.to_string())
				.replace("{pitch}", &voice.pitch.to_string())
				.replace("{throat}", &voice.throat.to_string())
				.replace("{mouth}", &voice.mouth.to_string()))
			.collect()
	}
}

/// Runs an external speech synthesizer with the phrase as last argument.
pub struct CommandSpeaker {
	command: SpeechCommand,
}

impl CommandSpeaker {
	pub fn new(command: SpeechCommand) -> Self {
		CommandSpeaker { command }
	}
}

impl Speaker for CommandSpeaker {
	fn say(&mut self, phrase: &str, voice: &Voice) -> anyhow::Result<()> {
		debug!("Saying \"{}\" with {}", phrase, self.command.program);

		let status = Command::new(&self.command.program)
			.args(self.command.expand_args(voice))
			.arg(phrase)
			.status()
			.map_err(|e| anyhow!("Failed to run \"{}\": {}", self.command.program, e))?;

		if !status.success() {
			return Err(anyhow!("\"{}\" exited with {}", self.command.program, status));
		}

		Ok(())
	}
}
