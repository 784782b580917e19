use confc_parser::ParseError;
use confc_spec::KeyType;

use crate::registry::CompiledHandle;

pub type Result<T, E = ConfError> = std::result::Result<T, E>;

/// Engine error classes surfaced to API callers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
	/// Malformed input, unknown names or exhausted capacity (`EINVAL`).
	InvalidArgument,
	/// The method does not support compiled configurations (`ENOTSUP`).
	NotSupported,
}

/// User-facing compile and bind errors. Each variant names the offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfError {
	#[error("unknown method '{0}'")]
	UnknownMethod(String),
	#[error("method '{0}' does not support compiled configurations")]
	NotCompilable(String),
	#[error("error compiling '{config}', unknown key '{key}' for method '{method}'")]
	UnknownKey {
		config: String,
		key: String,
		method: String,
	},
	#[error("value '{0}' expected to be an integer")]
	ExpectedInt(String),
	#[error("value '{0}' expected to be a boolean")]
	ExpectedBool(String),
	#[error("value '{value}' not a permitted choice for key '{key}'")]
	BadChoice { value: String, key: String },
	#[error("value '{0}' is not a valid choice")]
	NotAChoice(String),
	#[error("value '{0}' non-matching ()")]
	NonMatchingParens(String),
	#[error("value '{0}' non-matching []")]
	NonMatchingBrackets(String),
	#[error("value '{0}' expected () or []")]
	ExpectedStruct(String),
	#[error("value '{0}' expected to be a category")]
	ExpectedCategory(String),
	#[error("key '{0}' cannot hold both a value and a nested configuration")]
	ShapeConflict(String),
	#[error("value '{0}' is not valid here")]
	PlaceholderNotAllowed(String),
	#[error("value '{value}' is not compatible with {key_type} type")]
	PlaceholderType { value: String, key_type: KeyType },
	#[error("value '{0}' does not match %d or %s for binding")]
	PlaceholderFormat(String),
	#[error("value '{0}' cannot be used on the same key twice")]
	DuplicatePlaceholder(String),
	#[error("key '{0}' already holds a placeholder")]
	PlaceholderOverride(String),
	#[error("error compiling '{config}', overflowed maximum compile slots of {max}")]
	RegistryFull { config: String, max: u32 },
	#[error("unknown compiled configuration {0}")]
	UnknownHandle(CompiledHandle),
	#[error("compiled configuration {handle} belongs to method '{compiled_for}', not '{method}'")]
	HandleMethod {
		handle: CompiledHandle,
		compiled_for: String,
		method: String,
	},
	#[error("expected {expected} bound values, got {got}")]
	BindArity { expected: usize, got: usize },
	#[error("bound value {ordinal} expected to be {expected}")]
	BindKind { ordinal: u32, expected: &'static str },
	#[error("configuration context has been discarded")]
	ContextClosed,
	#[error("invalid connection settings: {0}")]
	InvalidSettings(String),
	#[error(transparent)]
	Parse(#[from] ParseError),
}

impl ConfError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			ConfError::NotCompilable(_) => ErrorKind::NotSupported,
			_ => ErrorKind::InvalidArgument,
		}
	}
}
