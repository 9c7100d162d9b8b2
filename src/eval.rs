use std::convert::Infallible;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin;
use crate::cond::{self, Control};
use crate::error::{Result, ShellError};
use crate::expand;
use crate::global::{Flow, State};
use crate::job::{self, WaitStatusExt};
use crate::parser;
use crate::signal;
use crate::types::{RedirectType, Stage};

fn open_redirect(typ: RedirectType, path: &str) -> Result<File> {
	let mut oopt = OpenOptions::new();
	let _ = match typ {
		RedirectType::Input => oopt.read(true),
		RedirectType::Output => oopt.write(true).create(true).truncate(true).mode(0o644),
	};
	oopt.open(path).map_err(|e| ShellError::Redirect { path: path.to_string(), source: e })
}

fn do_exec_stage(stage: &Stage, argv: &[CString], input: Option<RawFd>, output: Option<RawFd>) -> Result<Infallible> {
	signal::restore_defaults()?;
	if let Some(fd) = input {
		unistd::dup2(fd, libc::STDIN_FILENO)?;
	}
	if let Some(fd) = output {
		unistd::dup2(fd, libc::STDOUT_FILENO)?;
	}
	for &(typ, target) in [(RedirectType::Input, libc::STDIN_FILENO), (RedirectType::Output, libc::STDOUT_FILENO)].iter() {
		if let Some(path) = stage.redirect(typ) {
			let file = open_redirect(typ, path)?;
			unistd::dup2(file.as_raw_fd(), target)?;
		}
	}
	if stage.background {
		unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))?;
	}
	let name = &argv[0];
	match unistd::execvp(name, argv) {
		Ok(never) => match never {},
		Err(Errno::ENOENT) => Err(ShellError::CommandNotFound(name.to_string_lossy().into_owned())),
		Err(errno) => Err(ShellError::Exec { name: name.to_string_lossy().into_owned(), errno: errno }),
	}
}

/// Runs in the forked child and never returns into the interpreter.
fn exec_stage(stage: &Stage, argv: &[CString], input: Option<RawFd>, output: Option<RawFd>) -> ! {
	let status = match do_exec_stage(stage, argv, input, output) {
		Ok(never) => match never {},
		Err(e) => {
			let _ = writeln!(io::stderr(), "ish: {}", e);
			e.status()
		},
	};
	unsafe { libc::_exit(status) }
}

/// Fork a child for `stage`, reading from `input` and writing to `output` when given.
fn spawn_stage(stage: &Stage, input: Option<&OwnedFd>, output: Option<&OwnedFd>) -> Result<Pid> {
	let argv = stage.argv.iter()
		.map(|arg| CString::new(arg.as_str()))
		.collect::<std::result::Result<Vec<CString>, _>>()?;
	let input = input.map(|fd| fd.as_raw_fd());
	let output = output.map(|fd| fd.as_raw_fd());
	match unsafe { unistd::fork() }? {
		ForkResult::Parent { child } => {
			if stage.background {
				// the child does the same; whichever runs first wins
				let _ = unistd::setpgid(child, child);
			}
			debug!("spawned {} for {:?}", child, stage.argv);
			Ok(child)
		},
		ForkResult::Child => exec_stage(stage, &argv, input, output),
	}
}

/// A pipeline stage whose status is still to be applied, in pipeline order.
enum Outcome<'a> {
	Child(Pid, &'a str),
	Builtin(i32),
}

fn wait_foreground(state: &mut State, pid: Pid, text: &str) -> i32 {
	match job::wait_for(pid) {
		Ok(status) => {
			debug!("{} finished: {:?}", pid, status);
			if status.state() == job::State::Stopped {
				if let Some(index) = state.jobs.register_stopped(pid, text) {
					println!("\n[{}] {} Stopped    {}", index, pid, text.trim_end());
				}
			}
			status.code()
		},
		Err(e) => {
			warn!("waitpid({}) failed: {}", pid, e);
			1
		},
	}
}

/// Run one `&&` segment: a pipeline of one or more stages. Built-ins run in
/// the interpreter; every other stage is forked, and foreground stages are
/// waited for once the whole pipeline is running.
pub fn run_segment(state: &mut State, segment: &str) -> Flow {
	let limits = state.limits;
	let texts = parser::split_pipeline(segment, &limits);
	let mut upstream: Option<OwnedFd> = None;
	let mut outcomes: Vec<Outcome> = vec![];
	let mut failure: Option<ShellError> = None;
	let mut flow = Flow::Continue;

	for (i, &text) in texts.iter().enumerate() {
		let stage = parser::parse_stage(text, &limits);
		let name = match stage.name() {
			Some(name) => name,
			None => continue,
		};
		if let Some(builtin) = builtin::match_builtin(name) {
			match builtin(state, &stage.argv) {
				Ok(Flow::Exit) => {
					flow = Flow::Exit;
					break;
				},
				Ok(Flow::Continue) => {},
				Err(e) => {
					eprintln!("ish: {}", e);
					state.last_status = e.status();
				},
			}
			outcomes.push(Outcome::Builtin(state.last_status));
			continue;
		}

		let (next_input, output) = if i + 1 < texts.len() {
			match unistd::pipe2(OFlag::O_CLOEXEC) {
				Ok((read, write)) => (Some(read), Some(write)),
				Err(e) => {
					failure = Some(e.into());
					break;
				},
			}
		} else {
			(None, None)
		};
		match spawn_stage(&stage, upstream.as_ref(), output.as_ref()) {
			Ok(pid) if stage.background => {
				if state.jobs.register(pid, text).is_none() {
					debug!("job table full, {} runs untracked", pid);
				}
			},
			Ok(pid) => outcomes.push(Outcome::Child(pid, text)),
			Err(e) => {
				failure = Some(e);
				break;
			},
		}
		// the children own their ends now; replacing `upstream` closes ours
		drop(output);
		upstream = next_input;
	}
	drop(upstream);

	for outcome in outcomes {
		state.last_status = match outcome {
			Outcome::Child(pid, text) => wait_foreground(state, pid, text),
			Outcome::Builtin(status) => status,
		};
	}
	if let Some(e) = failure {
		warn!("pipeline aborted: {}", e);
		eprintln!("ish: {}", e);
		state.last_status = 1;
	}
	flow
}

/// Run `&&`-separated segments until one exits non-zero.
pub fn run_chain(state: &mut State, text: &str) -> Flow {
	for segment in parser::split_logic(text, &state.limits) {
		if run_segment(state, segment) == Flow::Exit {
			return Flow::Exit;
		}
		if state.last_status != 0 {
			break;
		}
	}
	Flow::Continue
}

/// Evaluate one input line.
pub fn eval_line(state: &mut State, line: &str) -> Flow {
	let expanded = expand::expand(line, state.last_status, state.env.as_ref(), &state.limits);
	match cond::run_conditional(state, &expanded) {
		Control::Handled(flow) => flow,
		Control::NotControl => run_chain(state, &expanded),
	}
}
