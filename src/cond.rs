//! `if CONDITION then BLOCK [else BLOCK] fi` on a single line.
//!
//! Keywords are recognized only as whole, unquoted, blank-delimited words.
//! Blocks cannot nest.

use log::debug;

use crate::error::{Result, ShellError};
use crate::eval;
use crate::expand;
use crate::global::{Flow, State};

const PREFIX: &str = "if ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword { If, Then, Else, Fi }

#[derive(Debug, Clone, Copy)]
struct Word {
	start: usize,
	end: usize,
	keyword: Option<Keyword>,
}

fn keyword(word: &str) -> Option<Keyword> {
	match word {
		"if" => Some(Keyword::If),
		"then" => Some(Keyword::Then),
		"else" => Some(Keyword::Else),
		"fi" => Some(Keyword::Fi),
		_ => None,
	}
}

/// Split `line` into blank-delimited words, keeping quoted blanks inside a word.
fn scan_words(line: &str) -> Vec<Word> {
	let mut words = vec![];
	let mut quote: Option<u8> = None;
	let mut start: Option<usize> = None;
	let mut quoted = false;
	let mut finish = |start: usize, end: usize, quoted: bool| {
		let kw = if quoted { None } else { keyword(&line[start .. end]) };
		words.push(Word { start: start, end: end, keyword: kw });
	};
	for (i, &c) in line.as_bytes().iter().enumerate() {
		match (c, quote) {
			(b' ', None) | (b'\t', None) => {
				if let Some(s) = start.take() {
					finish(s, i, quoted);
					quoted = false;
				}
				continue;
			},
			(b'\'', None) | (b'"', None) => {
				quote = Some(c);
				quoted = true;
			},
			(c, Some(open)) if c == open => quote = None,
			_ => {},
		}
		if start.is_none() {
			start = Some(i);
		}
	}
	if let Some(s) = start {
		finish(s, line.len(), quoted);
	}
	words
}

#[derive(Debug, PartialEq, Eq)]
pub struct Conditional<'a> {
	pub condition: &'a str,
	pub then_block: &'a str,
	pub else_block: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part { Condition, Then, Else, Done }

/// `None` when `line` is not a conditional at all.
pub fn parse_conditional(line: &str) -> Option<Result<Conditional<'_>>> {
	if !line.starts_with(PREFIX) {
		return None;
	}
	Some(parse_body(line))
}

fn parse_body(line: &str) -> Result<Conditional<'_>> {
	let mut part = Part::Condition;
	let mut then_word: Option<Word> = None;
	let mut else_word: Option<Word> = None;
	let mut fi_word: Option<Word> = None;

	// the first word is the leading `if`
	for word in scan_words(line).into_iter().skip(1) {
		part = match (part, word.keyword) {
			(Part::Done, _) => return Err(ShellError::Syntax("unexpected text after 'fi'")),
			(_, None) => part,
			(_, Some(Keyword::If)) => return Err(ShellError::Syntax("nested 'if' is not supported")),
			(Part::Condition, Some(Keyword::Then)) => {
				then_word = Some(word);
				Part::Then
			},
			(Part::Condition, Some(Keyword::Else)) => return Err(ShellError::Syntax("'else' before 'then'")),
			(Part::Condition, Some(Keyword::Fi)) => return Err(ShellError::Syntax("missing 'then' or 'fi'")),
			(Part::Then, Some(Keyword::Else)) => {
				else_word = Some(word);
				Part::Else
			},
			(Part::Then, Some(Keyword::Fi)) | (Part::Else, Some(Keyword::Fi)) => {
				fi_word = Some(word);
				Part::Done
			},
			(_, Some(Keyword::Then)) => return Err(ShellError::Syntax("unexpected 'then'")),
			(Part::Else, Some(Keyword::Else)) => return Err(ShellError::Syntax("unexpected 'else'")),
		};
	}

	match (then_word, fi_word) {
		(Some(then_word), Some(fi_word)) => {
			let then_end = else_word.map_or(fi_word.start, |w| w.start);
			Ok(Conditional {
				condition: &line[PREFIX.len() .. then_word.start],
				then_block: &line[then_word.end .. then_end],
				else_block: else_word.map(|w| &line[w.end .. fi_word.start]),
			})
		},
		_ => Err(ShellError::Syntax("missing 'then' or 'fi'")),
	}
}

pub enum Control {
	/// Not an `if` line; run it as an ordinary chain.
	NotControl,
	Handled(Flow),
}

/// Run `line` if it is a conditional. Each block is expanded again before it runs.
pub fn run_conditional(state: &mut State, line: &str) -> Control {
	let conditional = match parse_conditional(line) {
		None => return Control::NotControl,
		Some(Ok(conditional)) => conditional,
		Some(Err(e)) => {
			eprintln!("ish: {}", e);
			state.last_status = e.status();
			return Control::Handled(Flow::Continue);
		},
	};
	debug!("conditional: {:?}", conditional);

	let condition = expand::expand(conditional.condition, state.last_status, state.env.as_ref(), &state.limits);
	if eval::run_chain(state, &condition) == Flow::Exit {
		return Control::Handled(Flow::Exit);
	}
	let block = if state.last_status == 0 { Some(conditional.then_block) } else { conditional.else_block };
	match block {
		Some(block) => {
			let block = expand::expand(block, state.last_status, state.env.as_ref(), &state.limits);
			Control::Handled(eval::run_chain(state, &block))
		},
		None => Control::Handled(Flow::Continue),
	}
}
