//! Logger copying every record to stdout and to a log file named after the start time.
//!
//! Records are formatted on the logging thread and written by a background thread, so a slow SD
//! card never stalls the control loop.

#[macro_use]
extern crate lazy_static;

use chrono::NaiveDateTime;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{File, OpenOptions},
	io::{self, Write},
	thread,
	thread::JoinHandle,
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	Flush,
}

pub struct BlackBox {
	file: File,
	buffer: VecDeque<String>,
	last_flush_instant: Instant,
}

pub fn log_file_name(prefix: &str, start: &NaiveDateTime) -> String {
	format!("{}_{}.log", prefix, start.format("%Y-%m-%d_%H-%M-%S"))
}

impl BlackBox {
	/// Creates the log file `<prefix>_<date>_<time>.log` in the working directory.
	pub fn new(prefix: &str) -> io::Result<Self> {
		let now = chrono::offset::Local::now().naive_local();

		Ok(BlackBox {
			file: OpenOptions::new()
				.write(true)
				.create(true)
				.truncate(true)
				.open(log_file_name(prefix, &now))?,
			buffer: VecDeque::<String>::new(),
			last_flush_instant: Instant::now(),
		})
	}

	fn try_flush(&mut self) {
		if let Err(e) = self.flush() {
			self.buffer
				.push_back(format!("Failed to flush black box: {}", e));
		}
		self.last_flush_instant = Instant::now();
	}

	fn flush(&mut self) -> io::Result<()> {
		while let Some(message) = self.buffer.pop_front() {
			println!("{}", message);
			writeln!(self.file, "{}", message)?;
		}
		self.file.flush()
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);
		const MAX_BUFFER_LEN: usize = 8;
		const MAX_FLUSH_PERIOD: Duration = Duration::from_secs(2);

		while let Ok(message) = BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
			match message {
				Message::Log(content) => self.buffer.push_back(content),
				Message::Flush => self.try_flush(),
			}

			if self.buffer.len() > MAX_BUFFER_LEN
				|| self.last_flush_instant.elapsed() > MAX_FLUSH_PERIOD {
				self.try_flush();
			}
		}

		if !self.buffer.is_empty() {
			self.try_flush();
		}
	}

	/// Installs the logger and starts the writer thread. Fails if a logger is already installed.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)?;
		log::set_max_level(level_filter);

		Ok(thread::spawn(move || loop {
			self.receive_loop()
		}))
	}
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl BlackBoxLogger {
	fn format(&self, record: &Record) -> String {
		let elapsed = self.start_instant.elapsed().as_secs_f32();
		let module = record.module_path().unwrap_or("unknown");

		if record.level() == Level::Error {
			format!(
				"[{:.3}][{:?}][{}] {} ({}:{})",
				elapsed,
				record.level(),
				module,
				record.args(),
				record.file().unwrap_or("unknown"),
				record.line().unwrap_or(0)
			)
		} else {
			format!("[{:.3}][{:?}][{}] {}", elapsed, record.level(), module, record.args())
		}
	}
}

impl Log for BlackBoxLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			// The receiver lives in a static, sending cannot fail
			let _ = BLACK_BOX_CHANNEL.0.send(Message::Log(self.format(record)));
		}
	}

	fn flush(&self) {
		let _ = BLACK_BOX_CHANNEL.0.send(Message::Flush);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	#[test]
	fn log_file_name_test() {
		let start = NaiveDate::from_ymd_opt(2020, 10, 19)
			.and_then(|date| date.and_hms_opt(14, 3, 7))
			.unwrap();

		assert_eq!(log_file_name("exterminator", &start), "exterminator_2020-10-19_14-03-07.log");
	}

	#[test]
	fn format_test() {
		let logger = BlackBoxLogger { start_instant: Instant::now() };

		let info = logger.format(&Record::builder()
			.args(format_args!("Servo at {} degrees", 90))
			.level(Level::Info)
			.module_path(Some("exterminator::routine"))
			.build());
		assert!(info.starts_with("[0."));
		assert!(info.ends_with("][Info][exterminator::routine] Servo at 90 degrees"));

		let error = logger.format(&Record::builder()
			.args(format_args!("No echo"))
			.level(Level::Error)
			.file(Some("src/main.rs"))
			.line(Some(42))
			.build());
		assert!(error.ends_with("][Error][unknown] No echo (src/main.rs:42)"));
	}
}
