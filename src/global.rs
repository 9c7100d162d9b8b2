use log::debug;

use crate::config::Limits;
use crate::env::Environment;
use crate::job::JobTable;
use crate::signal::Notifier;

/// What the read loop should do after a line, a segment or a built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow { Continue, Exit }

/// Everything the interpreter remembers between lines.
pub struct State {
	pub last_status: i32,
	pub jobs: JobTable,
	pub env: Box<dyn Environment>,
	pub limits: Limits,
	notifier: Option<Notifier>,
}

impl State {
	pub fn new(env: Box<dyn Environment>, limits: Limits) -> State {
		State {
			last_status: 0,
			jobs: JobTable::new(&limits),
			env: env,
			limits: limits,
			notifier: None,
		}
	}

	pub fn set_notifier(&mut self, notifier: Notifier) {
		self.notifier = Some(notifier);
	}

	/// Handle the signals delivered since the last call. Without a notifier the
	/// job table is polled unconditionally.
	pub fn poll_signals(&mut self) {
		let events = match self.notifier {
			Some(ref mut notifier) => notifier.drain(),
			None => {
				self.jobs.reap();
				return;
			},
		};
		if events.child_exited {
			let reaped = self.jobs.reap();
			debug!("SIGCHLD: {} job(s) reaped", reaped);
		}
		if events.interrupted {
			println!("\nCaught Ctrl+C - shell remains active");
		}
		if events.suspended {
			println!("\nCaught Ctrl+Z - shell will not suspend");
		}
	}
}
