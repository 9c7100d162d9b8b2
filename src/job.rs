use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};

use crate::config::{self, Limits};
use crate::error::{Result, ShellError};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Stopped, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	/// Shell-style status: the exit code, or 128 plus the signal number.
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) => State::Terminated,
			WaitStatus::Signaled(..) => State::Terminated,
			WaitStatus::Stopped(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceEvent(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceSyscall(..) => State::Stopped,
			WaitStatus::Continued(..) => State::Active,
			WaitStatus::StillAlive => State::Active,
		}
	}

	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			WaitStatus::Stopped(_, sig) => 128 + sig as i32,
			_ => 0,
		}
	}
}

/// Wait for `pid` to exit or stop, retrying when a signal interrupts the wait.
pub fn wait_for(pid: Pid) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
			Err(Errno::EINTR) => continue,
			r => return r,
		}
	}
}

/// Hand the terminal on stdin to `pgrp`. Fails harmlessly when stdin is not a terminal.
pub fn give_terminal(pgrp: Pid) {
	let r = unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, pgrp.as_raw()) };
	if let Err(e) = Errno::result(r) {
		debug!("tcsetpgrp({}) failed: {}", pgrp, e);
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
	pub pid: Pid,
	pub command: String,
	pub state: State,
}

impl Job {
	pub fn is_active(&self) -> bool {
		self.state != State::Terminated
	}
}

/// Background jobs, in registration order. Entries are never removed, so a
/// job keeps its display index for the whole session.
#[derive(Debug)]
pub struct JobTable {
	jobs: Vec<Job>,
	/// Background children that did not fit in the table; kept only so they get reaped.
	untracked: Vec<Pid>,
	capacity: usize,
	max_command: usize,
}

impl JobTable {
	pub fn new(limits: &Limits) -> JobTable {
		JobTable {
			jobs: Vec::with_capacity(limits.max_jobs),
			untracked: vec![],
			capacity: limits.max_jobs,
			max_command: limits.max_line - 1,
		}
	}

	/// Record a running background process. Returns its 1-based display index,
	/// or `None` when the table is full.
	pub fn register(&mut self, pid: Pid, command: &str) -> Option<usize> {
		self.push(pid, command, State::Active)
	}

	/// Record a foreground process that was stopped from the terminal.
	pub fn register_stopped(&mut self, pid: Pid, command: &str) -> Option<usize> {
		self.push(pid, command, State::Stopped)
	}

	fn push(&mut self, pid: Pid, command: &str, state: State) -> Option<usize> {
		if self.jobs.len() >= self.capacity {
			debug!("job table full, {} not registered", pid);
			self.untracked.push(pid);
			return None;
		}
		let mut command = command.trim_end().to_string();
		config::truncate_to(&mut command, self.max_command);
		self.jobs.push(Job { pid: pid, command: command, state: state });
		Some(self.jobs.len())
	}

	pub fn get(&self, index: usize) -> Option<&Job> {
		index.checked_sub(1).and_then(|i| self.jobs.get(i))
	}

	pub fn active_count(&self) -> usize {
		self.jobs.iter().filter(|job| job.is_active()).count()
	}

	/// One line per active job, e.g. `[1] 4242 Running    sleep 10 &`.
	pub fn list(&self) -> Vec<String> {
		self.jobs.iter().enumerate()
			.filter(|&(_, job)| job.is_active())
			.map(|(i, job)| {
				let word = if job.state == State::Stopped { "Stopped" } else { "Running" };
				format!("[{}] {} {}    {}", i + 1, job.pid, word, job.command)
			})
			.collect()
	}

	fn set_state(&mut self, pid: Pid, state: State) -> bool {
		let mut found = false;
		for job in self.jobs.iter_mut().filter(|job| job.is_active() && job.pid == pid) {
			job.state = state;
			found = true;
		}
		found
	}

	/// Apply a status reported by `waitpid` to every active entry for its pid.
	pub fn update(&mut self, status: WaitStatus) -> bool {
		match status.pid() {
			Some(pid) => self.set_state(pid, status.state()),
			None => false,
		}
	}

	/// Collect every job that has terminated since the last call.
	pub fn reap(&mut self) -> usize {
		let before = self.active_count();
		let flags = Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED);
		let pids: Vec<Pid> = self.jobs.iter().filter(|job| job.is_active()).map(|job| job.pid).collect();
		for pid in pids {
			match wait::waitpid(pid, flags) {
				Ok(WaitStatus::StillAlive) => {},
				Ok(status) => {
					debug!("job {}: {:?}", pid, status);
					self.update(status);
				},
				// already collected elsewhere
				Err(Errno::ECHILD) => {
					self.set_state(pid, State::Terminated);
				},
				Err(e) => warn!("waitpid({}) failed: {}", pid, e),
			}
		}
		self.untracked.retain(|&pid| match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
			Ok(WaitStatus::StillAlive) => true,
			_ => false,
		});
		before - self.active_count()
	}

	/// Continue job `index` in the foreground and wait until it exits or stops.
	/// The job is inactive afterwards in either case.
	pub fn bring_to_foreground(&mut self, index: usize) -> Result<i32> {
		let job = match index.checked_sub(1).and_then(|i| self.jobs.get_mut(i)) {
			Some(job) if job.is_active() => job,
			_ => return Err(ShellError::JobIndex),
		};
		let pid = job.pid;
		debug!("foreground job {} ({})", pid, job.command);
		give_terminal(pid);
		let status = signal::kill(pid, Signal::SIGCONT).and_then(|()| wait_for(pid));
		give_terminal(unistd::getpgrp());
		job.state = State::Terminated;
		Ok(status?.code())
	}
}
