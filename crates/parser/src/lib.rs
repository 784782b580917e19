//! # Configuration tokenizer
//!
//! Splits engine configuration strings such as `isolation=snapshot,sync,debug=(release_evict)`
//! into typed `(key, value)` token pairs. Tokens borrow the source text and report byte offsets
//! into it, so callers can keep spans instead of copies.
//!
//! ## Supported Syntax
//!
//! ```text
//! config = pair ("," pair)*
//! pair   = key (("=" | ":") value?)?
//! value  = quoted | struct | word
//! quoted = '"' ... '"'                      (\" escapes a quote)
//! struct = ("(" | "[") ... (")" | "]")      nesting and quotes honoured
//! word   = number | "true" | "false" | identifier
//! number = sign? digit+ (multiplier "b"?)?  multiplier = b k m g t p, powers of 1024
//! ```
//!
//! A key without a value is a boolean `true`. An empty value (`key=`) is an empty string.

use std::iter::FusedIterator;
use std::ops::Range;


/// Coarse token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
	Num,
	Bool,
	String,
	Id,
	Struct,
}

/// One side of a key/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigItem<'a> {
	/// Token text. Quoted strings exclude their quotes; structs include their delimiters.
	pub text: &'a str,
	/// Byte offset of `text` within the tokenized source.
	pub start: usize,
	pub item_type: ItemType,
	/// Value of `Num` and `Bool` tokens (`0`/`1` for booleans), zero otherwise.
	pub val: i64,
}

impl ConfigItem<'_> {
	pub fn span(&self) -> Range<usize> {
		self.start..self.start + self.text.len()
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

/// Represents an error that occurred during tokenizing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
	/// Human-readable description of the error.
	pub message: String,
	/// Byte offset in the input where the error occurred.
	pub position: usize,
}

impl std::fmt::Display for ParseError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "parse error at position {}: {}", self.position, self.message)
	}
}

impl std::error::Error for ParseError {}

/// Iterator over the top-level pairs of a configuration string.
///
/// Yields at most one error, then ends.
#[derive(Debug, Clone)]
pub struct ConfigParser<'a> {
	src: &'a str,
	position: usize,
	end: usize,
	done: bool,
}

impl<'a> ConfigParser<'a> {
	pub fn new(src: &'a str) -> Self {
		Self::within(src, 0..src.len())
	}

	/// Tokenizes `src[range]`, reporting offsets relative to the whole of `src`.
	///
	/// # Panics
	///
	/// Panics if `range` is not a valid char-aligned range of `src`.
	pub fn within(src: &'a str, range: Range<usize>) -> Self {
		assert!(
			src.get(range.clone()).is_some(),
			"range {range:?} outside source of length {}",
			src.len()
		);
		Self {
			src,
			position: range.start,
			end: range.end,
			done: false,
		}
	}

	fn peek(&self) -> Option<u8> {
		(self.position < self.end).then(|| self.src.as_bytes()[self.position])
	}

	fn peek_char(&self) -> Option<char> {
		self.src[self.position..self.end].chars().next()
	}

	fn skip_whitespace(&mut self) {
		while let Some(b) = self.peek()
			&& b.is_ascii_whitespace()
		{
			self.position += 1;
		}
	}

	fn error(&self, message: impl Into<String>) -> ParseError {
		ParseError {
			message: message.into(),
			position: self.position,
		}
	}

	fn unexpected(&self, after: &str) -> ParseError {
		match self.peek_char() {
			Some(ch) => self.error(format!("unexpected '{ch}' {after}")),
			None => self.error(format!("unexpected end of input {after}")),
		}
	}

	fn item(&self, range: Range<usize>, item_type: ItemType, val: i64) -> ConfigItem<'a> {
		ConfigItem {
			text: &self.src[range.clone()],
			start: range.start,
			item_type,
			val,
		}
	}

	fn next_pair(&mut self) -> Result<Option<(ConfigItem<'a>, ConfigItem<'a>)>, ParseError> {
		loop {
			self.skip_whitespace();
			match self.peek() {
				None => return Ok(None),
				Some(b',') => self.position += 1,
				Some(_) => break,
			}
		}

		let key = self.token(true)?;
		self.skip_whitespace();
		let value = match self.peek() {
			Some(b'=' | b':') => {
				self.position += 1;
				self.skip_whitespace();
				match self.peek() {
					None | Some(b',') => self.item(self.position..self.position, ItemType::String, 0),
					Some(_) => self.token(false)?,
				}
			}
			None | Some(b',') => self.item(self.position..self.position, ItemType::Bool, 1),
			Some(_) => return Err(self.unexpected("after key")),
		};

		self.skip_whitespace();
		match self.peek() {
			None => {}
			Some(b',') => self.position += 1,
			Some(_) => return Err(self.unexpected("after value")),
		}
		Ok(Some((key, value)))
	}

	fn token(&mut self, is_key: bool) -> Result<ConfigItem<'a>, ParseError> {
		match self.peek() {
			Some(b'"') => self.quoted(),
			Some(b'(' | b'[') => Ok(self.structure()),
			_ => self.word(is_key),
		}
	}

	fn quoted(&mut self) -> Result<ConfigItem<'a>, ParseError> {
		let open = self.position;
		let Some(close) = self.quote_end(open) else {
			return Err(self.error("unterminated quoted string"));
		};
		self.position = close + 1;
		Ok(self.item(open + 1..close, ItemType::String, 0))
	}

	/// Index of the quote closing the one at `open`.
	fn quote_end(&self, open: usize) -> Option<usize> {
		let bytes = self.src.as_bytes();
		let mut i = open + 1;
		while i < self.end {
			match bytes[i] {
				b'\\' => i += 2,
				b'"' => return Some(i),
				_ => i += 1,
			}
		}
		None
	}

	/// Spans a bracketed value through its matching close, or to the end when unbalanced.
	fn structure(&mut self) -> ConfigItem<'a> {
		let bytes = self.src.as_bytes();
		let start = self.position;
		let mut depth = 0usize;
		let mut i = start;
		while i < self.end {
			match bytes[i] {
				b'"' => i = self.quote_end(i).unwrap_or(self.end),
				b'(' | b'[' => depth += 1,
				b')' | b']' => {
					depth -= 1;
					if depth == 0 {
						i += 1;
						break;
					}
				}
				_ => {}
			}
			i += 1;
		}
		let end = i.min(self.end);
		self.position = end;
		self.item(start..end, ItemType::Struct, 0)
	}

	fn word(&mut self, is_key: bool) -> Result<ConfigItem<'a>, ParseError> {
		let start = self.position;
		while let Some(b) = self.peek()
			&& !ends_word(b, is_key)
		{
			self.position += 1;
		}
		if self.position == start && !(is_key && matches!(self.peek(), Some(b'=' | b':'))) {
			return Err(self.unexpected("at start of token"));
		}

		let text = &self.src[start..self.position];
		Ok(match text {
			"true" => self.item(start..self.position, ItemType::Bool, 1),
			"false" => self.item(start..self.position, ItemType::Bool, 0),
			_ => match parse_number(text) {
				Some(Ok(val)) => self.item(start..self.position, ItemType::Num, val),
				Some(Err(message)) => return Err(ParseError { message, position: start }),
				None => self.item(start..self.position, ItemType::Id, 0),
			},
		})
	}
}

impl<'a> Iterator for ConfigParser<'a> {
	type Item = Result<(ConfigItem<'a>, ConfigItem<'a>), ParseError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}
		let result = self.next_pair().transpose();
		if !matches!(result, Some(Ok(_))) {
			self.done = true;
		}
		result
	}
}

impl FusedIterator for ConfigParser<'_> {}

fn ends_word(b: u8, is_key: bool) -> bool {
	b.is_ascii_whitespace()
		|| matches!(b, b',' | b'=' | b'(' | b')' | b'[' | b']' | b'"')
		|| (is_key && b == b':')
}

/// Returns `None` when `text` is not shaped like an integer.
fn parse_number(text: &str) -> Option<Result<i64, String>> {
	let bytes = text.as_bytes();
	let (negative, digits_start) = match bytes.first()? {
		b'-' => (true, 1),
		b'+' => (false, 1),
		_ => (false, 0),
	};
	let digits_end = digits_start + bytes[digits_start..].iter().take_while(|b| b.is_ascii_digit()).count();
	if digits_end == digits_start {
		return None;
	}

	let shift = match &bytes[digits_end..] {
		[] => 0,
		[m] | [m, b'b' | b'B'] => match m.to_ascii_lowercase() {
			b'b' => 0,
			b'k' => 10,
			b'm' => 20,
			b'g' => 30,
			b't' => 40,
			b'p' => 50,
			_ => return None,
		},
		_ => return None,
	};

	let value = bytes[digits_start..digits_end]
		.iter()
		.try_fold(0i128, |acc, d| acc.checked_mul(10)?.checked_add(i128::from(d - b'0')))
		.and_then(|magnitude| magnitude.checked_mul(1i128 << shift))
		.map(|magnitude| if negative { -magnitude } else { magnitude })
		.and_then(|value| i64::try_from(value).ok());
	Some(value.ok_or_else(|| format!("integer '{text}' out of range")))
}

/// Parses a standalone integer literal, multiplier suffixes included.
pub fn parse_int(text: &str) -> Result<i64, ParseError> {
	match parse_number(text) {
		Some(Ok(value)) => Ok(value),
		Some(Err(message)) => Err(ParseError { message, position: 0 }),
		None => Err(ParseError {
			message: format!("'{text}' is not an integer"),
			position: 0,
		}),
	}
}

/// Returns the value of the last top-level occurrence of `key`.
pub fn find<'a>(src: &'a str, key: &str) -> Result<Option<ConfigItem<'a>>, ParseError> {
	let mut found = None;
	for pair in ConfigParser::new(src) {
		let (k, v) = pair?;
		if k.text == key {
			found = Some(v);
		}
	}
	Ok(found)
}
