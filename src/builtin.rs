use std::env;

use crate::error::{Result, ShellError};
use crate::global::{Flow, State};

pub type Builtin = fn(&mut State, &[String]) -> Result<Flow>;

pub fn builtin_exit(_: &mut State, _: &[String]) -> Result<Flow> {
	Ok(Flow::Exit)
}

pub fn builtin_cd(state: &mut State, argv: &[String]) -> Result<Flow> {
	let target = match argv.get(1) {
		Some(dir) => dir.clone(),
		None => state.env.get_var("HOME").ok_or(ShellError::NoHome)?,
	};
	env::set_current_dir(&target).map_err(|e| ShellError::ChangeDir { path: target, source: e })?;
	state.last_status = 0;
	Ok(Flow::Continue)
}

pub fn builtin_jobs(state: &mut State, _: &[String]) -> Result<Flow> {
	state.poll_signals();
	for line in state.jobs.list() {
		println!("{}", line);
	}
	state.last_status = 0;
	Ok(Flow::Continue)
}

fn job_index(argv: &[String]) -> Result<usize> {
	match argv.get(1) {
		None => Ok(1),
		Some(arg) => arg.trim_start_matches('%').parse().map_err(|_| ShellError::JobIndex),
	}
}

pub fn builtin_fg(state: &mut State, argv: &[String]) -> Result<Flow> {
	let index = job_index(argv)?;
	state.poll_signals();
	if let Some(job) = state.jobs.get(index).filter(|job| job.is_active()) {
		println!("{}", job.command);
	}
	state.last_status = state.jobs.bring_to_foreground(index)?;
	Ok(Flow::Continue)
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"exit" => Some(builtin_exit),
		"cd" => Some(builtin_cd),
		"jobs" => Some(builtin_jobs),
		"fg" => Some(builtin_fg),
		_ => None,
	}
}
