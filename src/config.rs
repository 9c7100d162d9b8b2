use std::path::PathBuf;

use argh::FromArgs;
use log::LevelFilter;

/// A minimal line-oriented command interpreter.
#[derive(FromArgs, Debug)]
pub struct Options {
	/// run COMMAND instead of reading lines interactively
	#[argh(option, short = 'c')]
	pub command: Option<String>,

	/// load and save line history in FILE
	#[argh(option)]
	pub history: Option<PathBuf>,

	/// write logs to FILE instead of stderr
	#[argh(option)]
	pub log_file: Option<PathBuf>,

	/// enable debug logging
	#[argh(switch, short = 'v')]
	pub verbose: bool,

	/// capacity of the job table
	#[argh(option, default = "DEFAULT_MAX_JOBS")]
	pub max_jobs: usize,
}

impl Options {
	pub fn log_level(&self) -> LevelFilter {
		if self.verbose { LevelFilter::Debug } else { LevelFilter::Warn }
	}

	pub fn limits(&self) -> Limits {
		Limits { max_jobs: self.max_jobs, ..Limits::default() }
	}
}

const DEFAULT_MAX_JOBS: usize = 16;

/// Bounds on every fixed-size container. Anything over a bound is truncated
/// or dropped, never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
	/// Bytes in an expanded line, an argument, or a job's command text, counting the terminator.
	pub max_line: usize,
	/// Arguments per stage, counting the terminator.
	pub max_args: usize,
	/// `&&` segments per line and `|` stages per segment.
	pub max_segments: usize,
	pub max_jobs: usize,
	/// Characters in a `$NAME` reference, counting the terminator.
	pub max_var_name: usize,
}

impl Default for Limits {
	fn default() -> Limits {
		Limits {
			max_line: 256,
			max_args: 32,
			max_segments: 8,
			max_jobs: DEFAULT_MAX_JOBS,
			max_var_name: 64,
		}
	}
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub fn truncate_to(s: &mut String, max: usize) -> bool {
	if s.len() <= max {
		return false;
	}
	let mut end = max;
	while !s.is_char_boundary(end) {
		end -= 1;
	}
	s.truncate(end);
	true
}
