//! Connection settings for the compiled-configuration registry.

use confc_parser::{ConfigParser, ItemType};
use serde::Deserialize;

use crate::error::{ConfError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnSettings {
	/// Capacity of the precompiled configuration registry.
	pub compile_configuration_count: u32,
}

impl Default for ConnSettings {
	fn default() -> Self {
		Self {
			compile_configuration_count: Self::DEFAULT_COMPILE_CONFIGURATION_COUNT,
		}
	}
}

impl ConnSettings {
	pub const DEFAULT_COMPILE_CONFIGURATION_COUNT: u32 = 1000;

	pub fn validate(&self) -> Result<()> {
		if self.compile_configuration_count == 0 {
			return Err(ConfError::InvalidSettings(
				"compile_configuration_count must be at least 1".into(),
			));
		}
		Ok(())
	}

	/// Parses TOML such as `compile_configuration_count = 500`.
	pub fn from_toml(text: &str) -> Result<Self> {
		let settings: Self = toml::from_str(text).map_err(|e| ConfError::InvalidSettings(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Parses an engine configuration string such as `compile_configuration_count=500`.
	pub fn from_config_str(text: &str) -> Result<Self> {
		let mut settings = Self::default();
		for pair in ConfigParser::new(text) {
			let (key, value) = pair?;
			match key.text {
				"compile_configuration_count" => {
					settings.compile_configuration_count = match value.item_type {
						ItemType::Num => u32::try_from(value.val).ok(),
						_ => None,
					}
					.ok_or_else(|| {
						ConfError::InvalidSettings(format!(
							"compile_configuration_count '{}' is not a count",
							value.text
						))
					})?;
				}
				other => return Err(ConfError::InvalidSettings(format!("unknown setting '{other}'"))),
			}
		}
		settings.validate()?;
		Ok(settings)
	}
}
