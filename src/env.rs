use std::collections::HashMap;
use std::env as stdenv;

/// Read-only view of the variables used by expansion, `cd` and the prompt.
pub trait Environment {
	fn get_var(&self, key: &str) -> Option<String>;
}

/// The interpreter's own process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
	fn get_var(&self, key: &str) -> Option<String> {
		stdenv::var(key).ok()
	}
}

impl Environment for HashMap<String, String> {
	fn get_var(&self, key: &str) -> Option<String> {
		self.get(key).cloned()
	}
}
