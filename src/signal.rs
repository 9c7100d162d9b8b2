//! Signal delivery through a self-pipe.
//!
//! The handlers only write the signal number into a non-blocking pipe. The
//! main loop drains it with [`Notifier::drain`] between commands and does the
//! real work (reaping, messages) there.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::atomic::{AtomicI32, Ordering};

use log::debug;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;

static NOTIFY_FD: AtomicI32 = AtomicI32::new(-1);

const FORWARDED: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

extern "C" fn forward(signo: libc::c_int) {
	// the interrupted code may be about to read errno
	let saved = Errno::last_raw();
	let fd = NOTIFY_FD.load(Ordering::Relaxed);
	if fd >= 0 {
		let byte = signo as u8;
		// a full pipe already holds a pending notification
		unsafe { libc::write(fd, &byte as *const u8 as *const libc::c_void, 1) };
	}
	Errno::set_raw(saved);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Events {
	pub child_exited: bool,
	pub interrupted: bool,
	pub suspended: bool,
}

impl Events {
	fn record(&mut self, signo: u8) {
		match Signal::try_from(signo as libc::c_int) {
			Ok(Signal::SIGCHLD) => self.child_exited = true,
			Ok(Signal::SIGINT) => self.interrupted = true,
			Ok(Signal::SIGTSTP) => self.suspended = true,
			_ => debug!("unexpected signal byte {}", signo),
		}
	}
}

#[derive(Debug)]
pub struct Notifier {
	read: File,
	_write: OwnedFd,
}

impl Notifier {
	/// Install the handlers. SIGTTOU is ignored so the interpreter may take
	/// the terminal back while it is in a background process group.
	pub fn install() -> nix::Result<Notifier> {
		let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK)?;
		NOTIFY_FD.store(write.as_raw_fd(), Ordering::Relaxed);
		let action = SigAction::new(SigHandler::Handler(forward), SaFlags::SA_RESTART, SigSet::empty());
		for &sig in FORWARDED.iter() {
			unsafe { signal::sigaction(sig, &action) }?;
		}
		unsafe { signal::signal(Signal::SIGTTOU, SigHandler::SigIgn) }?;
		Ok(Notifier { read: File::from(read), _write: write })
	}

	/// Everything delivered since the previous call.
	pub fn drain(&mut self) -> Events {
		let mut events = Events::default();
		let mut buf = [0u8; 64];
		loop {
			match self.read.read(&mut buf) {
				Ok(0) => break,
				Ok(n) => buf[.. n].iter().for_each(|&b| events.record(b)),
				Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(_) => break,
			}
		}
		events
	}
}

impl Drop for Notifier {
	fn drop(&mut self) {
		NOTIFY_FD.store(-1, Ordering::Relaxed);
	}
}

/// Undo the interpreter's dispositions in a freshly forked child.
pub fn restore_defaults() -> nix::Result<()> {
	let signals = [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGTTOU, Signal::SIGCHLD, Signal::SIGPIPE];
	for &sig in signals.iter() {
		unsafe { signal::signal(sig, SigHandler::SigDfl) }?;
	}
	Ok(())
}
