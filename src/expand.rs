use log::debug;

use crate::config::{self, Limits};
use crate::env::Environment;

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

/// Replace `$NAME` with its value (empty when unset) and `$?` with `last_status`.
///
/// A `$` that starts no reference is kept. The result is cut to
/// `limits.max_line - 1` bytes.
pub fn expand(input: &str, last_status: i32, env: &dyn Environment, limits: &Limits) -> String {
	let mut result = String::with_capacity(input.len());
	let mut chars = input.char_indices().peekable();
	while let Some((_, c)) = chars.next() {
		if c != '$' {
			result.push(c);
			continue;
		}
		match chars.peek() {
			Some(&(_, '?')) => {
				chars.next();
				result.push_str(&last_status.to_string());
			},
			Some(&(start, n)) if is_name_char(n) => {
				let mut end = start;
				let mut len = 0;
				while let Some(&(i, n)) = chars.peek() {
					if !is_name_char(n) || len + 1 >= limits.max_var_name { break; }
					end = i + n.len_utf8();
					len += 1;
					chars.next();
				}
				if let Some(value) = env.get_var(&input[start .. end]) {
					result.push_str(&value);
				}
			},
			_ => result.push('$'),
		}
	}
	if config::truncate_to(&mut result, limits.max_line - 1) {
		debug!("expanded line truncated to {} bytes", result.len());
	}
	result
}
