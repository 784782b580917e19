//! Binding runtime: resolves positional caller values against a compiled tree's placeholders.

use smallvec::SmallVec;

use crate::compile::match_choice;
use crate::error::{ConfError, Result};
use crate::layout::{BindDesc, BindKind, ConfTree};


/// A caller-supplied value for one placeholder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BindArg<'v> {
	Int(i64),
	Str(&'v str),
}

impl From<i64> for BindArg<'_> {
	fn from(value: i64) -> Self {
		BindArg::Int(value)
	}
}

impl From<bool> for BindArg<'_> {
	fn from(value: bool) -> Self {
		BindArg::Int(i64::from(value))
	}
}

impl<'v> From<&'v str> for BindArg<'v> {
	fn from(value: &'v str) -> Self {
		BindArg::Str(value)
	}
}

/// A resolved placeholder value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoundItem<'v> {
	Num(i64),
	Bool(bool),
	Str(&'v str),
	/// The schema's canonical copy of a permitted choice.
	Choice(&'v str),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoundValue<'v> {
	pub desc: BindDesc<'v>,
	pub item: BoundItem<'v>,
}

/// Values for every placeholder of one compiled tree, by ordinal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BoundValues<'v> {
	values: SmallVec<[BoundValue<'v>; 8]>,
}

impl<'v> BoundValues<'v> {
	pub fn get(&self, ordinal: u32) -> Option<&BoundValue<'v>> {
		self.values.get(ordinal as usize)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &BoundValue<'v>> {
		self.values.iter()
	}
}

/// Consumes exactly one argument per placeholder, in ordinal order.
pub fn bind<'a>(tree: &ConfTree<'a>, args: &[BindArg<'a>]) -> Result<BoundValues<'a>> {
	let expected = tree.binding_count() as usize;
	if args.len() != expected {
		return Err(ConfError::BindArity {
			expected,
			got: args.len(),
		});
	}

	let mut values = SmallVec::with_capacity(expected);
	for (ordinal, (desc, arg)) in tree.bindings().zip(args).enumerate() {
		assert_eq!(desc.ordinal as usize, ordinal, "conf: binding ordinals out of order");
		let item = match (desc.kind, *arg) {
			(BindKind::Num, BindArg::Int(value)) => BoundItem::Num(value),
			(BindKind::Bool, BindArg::Int(value @ (0 | 1))) => BoundItem::Bool(value == 1),
			(BindKind::Bool, BindArg::Int(value)) => return Err(ConfError::ExpectedBool(value.to_string())),
			(BindKind::Str, BindArg::Str(text)) => bind_str(desc, text)?,
			(kind, _) => {
				return Err(ConfError::BindKind {
					ordinal: desc.ordinal,
					expected: kind.as_str(),
				});
			}
		};
		values.push(BoundValue { desc: *desc, item });
	}
	Ok(BoundValues { values })
}

/// Boolean keywords retype as the tokenizer would; choice sets are checked as at compile time.
fn bind_str<'a>(desc: &BindDesc<'a>, text: &'a str) -> Result<BoundItem<'a>> {
	if let Some(choices) = desc.choices() {
		return match_choice(choices, text)
			.map(BoundItem::Choice)
			.ok_or_else(|| ConfError::NotAChoice(text.to_string()));
	}
	Ok(match text {
		"true" => BoundItem::Bool(true),
		"false" => BoundItem::Bool(false),
		_ => BoundItem::Str(text),
	})
}
