use std::{ffi, io};

use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
	#[error("syntax error: {0}")]
	Syntax(&'static str),
	#[error("{path}: {source}")]
	Redirect { path: String, source: io::Error },
	#[error("{0}: command not found")]
	CommandNotFound(String),
	#[error("{name}: {errno}")]
	Exec { name: String, errno: Errno },
	#[error("cd: {path}: {source}")]
	ChangeDir { path: String, source: io::Error },
	#[error("cd: HOME not set")]
	NoHome,
	#[error("fg: no such job")]
	JobIndex,
	#[error("{0}")]
	Nix(#[from] nix::Error),
	#[error("argument contains a nul byte: {0}")]
	Nul(#[from] ffi::NulError),
}

impl ShellError {
	/// Status used when the error ends a child or a built-in.
	pub fn status(&self) -> i32 {
		match *self {
			ShellError::Syntax(_) => 2,
			ShellError::CommandNotFound(_) => 127,
			ShellError::Exec { .. } => 126,
			_ => 1,
		}
	}
}

pub type Result<T> = std::result::Result<T, ShellError>;
