use log::debug;

use crate::config::{self, Limits};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote { None, Single, Double }

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
	limits: &'a Limits,
	quote: Quote,
	word: Vec<u8>,
	stage: Stage,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_separator(c: u8) -> bool {
		c == b' ' || c == b'\t'
	}

	fn take_word(&mut self) -> String {
		let bytes = std::mem::take(&mut self.word);
		// only ASCII bytes are ever dropped from the line, so this stays valid UTF-8
		let mut word = String::from_utf8(bytes)
			.unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
		if config::truncate_to(&mut word, self.limits.max_line - 1) {
			debug!("argument truncated to {} bytes", word.len());
		}
		word
	}

	fn push_argument(&mut self, word: String) {
		if self.stage.argv.len() + 1 < self.limits.max_args {
			self.stage.argv.push(word);
		} else {
			debug!("argument dropped, stage already has {} arguments", self.stage.argv.len());
		}
	}

	/// Reads the path after a `<` or `>` word: the next run of non-space bytes, taken verbatim.
	fn read_redirect_target(&mut self) -> String {
		self.i += 1;
		self.proceed_while(|c| c == b' ');
		let orig = self.i;
		self.proceed_while(|c| c != b' ');
		self.word = self.line[orig .. self.i].to_vec();
		self.take_word()
	}

	fn end_word(&mut self) {
		if self.word.is_empty() {
			self.i += 1;
			return;
		}
		let word = self.take_word();
		match RedirectType::from_word(&word) {
			Some(typ) => {
				let target = self.read_redirect_target();
				self.stage.set_redirect(typ, target);
			},
			None => {
				self.push_argument(word);
				self.i += 1;
			},
		}
	}

	fn parse_stage(mut self) -> Stage {
		while let Some(&c) = self.line.get(self.i) {
			match (c, self.quote) {
				(b'\'', Quote::None) => self.quote = Quote::Single,
				(b'\'', Quote::Single) => self.quote = Quote::None,
				(b'"', Quote::None) => self.quote = Quote::Double,
				(b'"', Quote::Double) => self.quote = Quote::None,
				(c, Quote::None) if Parser::is_separator(c) => {
					self.end_word();
					continue;
				},
				(b'&', Quote::None) => self.stage.background = true,
				(c, _) => self.word.push(c),
			}
			self.i += 1;
		}
		if !self.word.is_empty() {
			let word = self.take_word();
			self.push_argument(word);
		}
		self.stage
	}
}

/// Tokenize one pipeline stage into its arguments, redirections and background flag.
pub fn parse_stage(text: &str, limits: &Limits) -> Stage {
	let parser = Parser {
		line: text.as_bytes(),
		i: 0,
		limits: limits,
		quote: Quote::None,
		word: vec![],
		stage: Stage::default(),
	};
	parser.parse_stage()
}

fn split_on<'a>(input: &'a str, separator: &str, limits: &Limits) -> Vec<&'a str> {
	let pieces: Vec<&'a str> = input
		.split(separator)
		.map(|piece| piece.trim_start_matches(' '))
		.filter(|piece| !piece.is_empty())
		.collect();
	if pieces.len() > limits.max_segments {
		debug!("{} pieces split on {:?}, keeping {}", pieces.len(), separator, limits.max_segments);
	}
	pieces.into_iter().take(limits.max_segments).collect()
}

/// Split a line into its `&&` segments. Quotes are not taken into account.
pub fn split_logic<'a>(input: &'a str, limits: &Limits) -> Vec<&'a str> {
	split_on(input, "&&", limits)
}

/// Split a segment into its `|` stages. Quotes are not taken into account.
pub fn split_pipeline<'a>(segment: &'a str, limits: &Limits) -> Vec<&'a str> {
	split_on(segment, "|", limits)
}
