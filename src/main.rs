mod builtin;
mod cond;
mod config;
mod env;
mod error;
mod eval;
mod expand;
mod global;
mod job;
mod parser;
mod signal;
mod types;

use std::fs::OpenOptions;
use std::path::Path;
use std::process;

use log::{debug, info, warn};
use nix::unistd;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};

use config::Options;
use env::{Environment, ProcessEnv};
use global::{Flow, State};
use signal::Notifier;

fn init_logging(opts: &Options) {
	let level = opts.log_level();
	let r = match opts.log_file {
		Some(ref path) => match OpenOptions::new().create(true).append(true).open(path) {
			Ok(file) => WriteLogger::init(level, Config::default(), file),
			Err(e) => {
				eprintln!("ish: {}: {}", path.display(), e);
				return;
			},
		},
		None => TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto),
	};
	if let Err(e) = r {
		eprintln!("ish: cannot set up logging: {}", e);
	}
}

fn prompt(env: &dyn Environment) -> String {
	let user = env.get_var("USER").unwrap_or_default();
	let host = unistd::gethostname()
		.map(|h| h.to_string_lossy().into_owned())
		.unwrap_or_default();
	format!(" \x1b[1;34m[{}]\x1b[0m \x1b[1;35m({})\x1b[0m $ ", user, host)
}

fn repl(state: &mut State, history: Option<&Path>) -> rustyline::Result<()> {
	let mut rl = DefaultEditor::new()?;
	if let Some(path) = history {
		if let Err(e) = rl.load_history(path) {
			debug!("no history loaded from {}: {}", path.display(), e);
		}
	}
	loop {
		state.poll_signals();
		match rl.readline(&prompt(state.env.as_ref())) {
			Ok(line) => {
				if line.is_empty() {
					continue;
				}
				rl.add_history_entry(line.as_str())?;
				if eval::eval_line(state, &line) == Flow::Exit {
					break;
				}
			},
			Err(ReadlineError::Interrupted) => println!("Caught Ctrl+C - shell remains active"),
			Err(ReadlineError::Eof) => break,
			Err(err) => return Err(err),
		}
	}
	if let Some(path) = history {
		if let Err(e) = rl.save_history(path) {
			warn!("cannot save history to {}: {}", path.display(), e);
		}
	}
	Ok(())
}

/// Run the lines of a `-c` argument; the status is that of the last command run.
fn run_command(state: &mut State, command: &str) -> i32 {
	for line in command.lines().filter(|line| !line.is_empty()) {
		state.poll_signals();
		if eval::eval_line(state, line) == Flow::Exit {
			return 0;
		}
	}
	state.last_status
}

fn main() {
	let opts: Options = argh::from_env();
	init_logging(&opts);

	let mut state = State::new(Box::new(ProcessEnv), opts.limits());
	match Notifier::install() {
		Ok(notifier) => state.set_notifier(notifier),
		Err(e) => warn!("signal handlers not installed: {}", e),
	}
	info!("ish started, pid {}", unistd::getpid());

	let code = match opts.command {
		Some(ref command) => run_command(&mut state, command),
		None => match repl(&mut state, opts.history.as_deref()) {
			Ok(()) => 0,
			Err(e) => {
				eprintln!("ish: {}", e);
				1
			},
		},
	};
	info!("ish exiting with status {}", code);
	process::exit(code)
}
