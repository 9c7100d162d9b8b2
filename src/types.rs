#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output }

/// One pipeline element, as produced by `parser::parse_stage`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stage {
	pub argv: Vec<String>,
	pub input_redirect: Option<String>,
	pub output_redirect: Option<String>,
	pub background: bool,
}

impl Stage {
	pub fn name(&self) -> Option<&str> {
		self.argv.first().map(|s| s.as_str())
	}

	pub fn redirect(&self, typ: RedirectType) -> Option<&str> {
		match typ {
			RedirectType::Input => self.input_redirect.as_deref(),
			RedirectType::Output => self.output_redirect.as_deref(),
		}
	}

	pub fn set_redirect(&mut self, typ: RedirectType, path: String) {
		match typ {
			RedirectType::Input => self.input_redirect = Some(path),
			RedirectType::Output => self.output_redirect = Some(path),
		}
	}
}

impl RedirectType {
	pub fn from_word(word: &str) -> Option<RedirectType> {
		match word {
			"<" => Some(RedirectType::Input),
			">" => Some(RedirectType::Output),
			_ => None,
		}
	}
}
