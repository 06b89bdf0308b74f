//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or types.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Model name sent with each request; the service default when unset.
	pub model: Option<String>,
	pub temperature: f32,
	/// Initial session-wide intent.
	pub intent: String,
	pub diff: DiffConfig,
	pub highlight: HighlightConfig,
	pub chain: ChainConfig,
	pub animation: AnimationConfig,
	pub navigation: NavigationConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			model: None,
			temperature: 0.2,
			intent: "Fix".to_string(),
			diff: DiffConfig::default(),
			highlight: HighlightConfig::default(),
			chain: ChainConfig::default(),
			animation: AnimationConfig::default(),
			navigation: NavigationConfig::default(),
		}
	}
}

impl Config {
	/// Parses a configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}
}

/// Limits for diff queries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
	pub max_tokens: usize,
	/// `max_edits` for `diff-atcursor`.
	pub max_edits_at_cursor: usize,
	/// `max_edits` for `diff-selection`.
	pub max_edits_selection: usize,
}

impl Default for DiffConfig {
	fn default() -> Self {
		Self {
			max_tokens: 550,
			max_edits_at_cursor: 1,
			max_edits_selection: 10,
		}
	}
}

/// Limits for the highlight pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
	pub max_tokens: usize,
}

/// Limits for chained edits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
	pub max_tokens: usize,
	pub max_edits: usize,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			max_tokens: 550,
			max_edits: 1,
		}
	}
}

/// Pending-request animation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
	pub tick_ms: u64,
	/// Number of colors cycled through; independent of the text length.
	pub palette_size: usize,
	/// Width in chars of each animated cell.
	pub chunk_chars: usize,
}

impl Default for AnimationConfig {
	fn default() -> Self {
		Self {
			tick_ms: 100,
			palette_size: 20,
			chunk_chars: 2,
		}
	}
}

impl AnimationConfig {
	pub fn tick(&self) -> Duration {
		Duration::from_millis(self.tick_ms.max(1))
	}
}

/// Cursor navigation triggers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
	/// Delay before a keyboard move into a sensitive range queries a diff.
	/// Pointer clicks query immediately.
	pub keyboard_debounce_ms: u64,
}

impl Default for NavigationConfig {
	fn default() -> Self {
		Self {
			keyboard_debounce_ms: 300,
		}
	}
}

impl NavigationConfig {
	pub fn debounce(&self, is_mouse: bool) -> Duration {
		if is_mouse {
			Duration::ZERO
		} else {
			Duration::from_millis(self.keyboard_debounce_ms)
		}
	}
}
