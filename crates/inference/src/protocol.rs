//! Wire payloads of the suggestion service.
//!
//! A request carries every source the model may look at plus the cursor
//! region; a successful response carries full replacement documents keyed by
//! file name. Any non-empty `detail` marks the response as failed, whatever
//! the transport-level status was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// Names of the remote functions.
pub mod functions {
	/// Diff for the sensitive range under the cursor.
	pub const DIFF_AT_CURSOR: &str = "diff-atcursor";
	/// Diff for an explicit selection.
	pub const DIFF_SELECTION: &str = "diff-selection";
	/// Ranking pass returning sensitive ranges.
	pub const HIGHLIGHT: &str = "highlight";
	/// Continuation of a previously produced replacement.
	pub const EDIT_CHAIN: &str = "edit-chain";
}

/// Request body sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	/// Full text of every source, keyed by file name.
	pub sources: BTreeMap<String, String>,
	pub intent: String,
	/// Remote function, see [`functions`].
	pub function: String,
	pub cursor_file: String,
	/// Start of the region of interest, as a char offset into `cursor_file`.
	#[serde(rename = "cursor0")]
	pub cursor_start: usize,
	/// End of the region of interest.
	#[serde(rename = "cursor1")]
	pub cursor_end: usize,
	pub temperature: f32,
	pub max_tokens: usize,
	pub max_edits: usize,
	#[serde(default)]
	pub stop_tokens: Vec<String>,
	#[serde(default)]
	pub stream: bool,
}

impl InferenceRequest {
	/// Request over a single source file with an empty cursor region at offset 0.
	pub fn single_file(function: &str, file: impl Into<String>, text: impl Into<String>) -> Self {
		let file = file.into();
		let mut sources = BTreeMap::new();
		sources.insert(file.clone(), text.into());
		Self {
			model: None,
			sources,
			intent: String::new(),
			function: function.to_string(),
			cursor_file: file,
			cursor_start: 0,
			cursor_end: 0,
			temperature: 0.2,
			max_tokens: 0,
			max_edits: 1,
			stop_tokens: Vec::new(),
			stream: false,
		}
	}
}

/// One alternative returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
	/// Full replacement text keyed by file name.
	#[serde(default)]
	pub files: BTreeMap<String, String>,
}

/// A ranked region: `[start_offset, end_offset, weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightSpan(pub usize, pub usize, pub f32);

impl HighlightSpan {
	pub fn start(&self) -> usize {
		self.0
	}

	pub fn end(&self) -> usize {
		self.1
	}

	/// Ranking weight, used as the highlight alpha.
	pub fn weight(&self) -> f32 {
		self.2
	}
}

/// Response body of the service, success and error shapes merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub choices: Option<Vec<Choice>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub highlight: Option<Vec<HighlightSpan>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

impl InferenceResponse {
	/// Successful response carrying one choice with a single file.
	pub fn with_file(file: impl Into<String>, text: impl Into<String>) -> Self {
		let mut files = BTreeMap::new();
		files.insert(file.into(), text.into());
		Self {
			choices: Some(vec![Choice { files }]),
			..Self::default()
		}
	}

	/// Parses a raw JSON body.
	pub fn from_json(body: &str) -> serde_json::Result<Self> {
		serde_json::from_str(body)
	}

	/// Returns the service error message, if the response carries one.
	pub fn service_error(&self) -> Option<&str> {
		self.detail.as_deref().filter(|d| !d.is_empty())
	}

	/// Files of the first choice.
	pub fn files(&self) -> Result<&BTreeMap<String, String>, InferenceError> {
		self.choices
			.as_ref()
			.and_then(|choices| choices.first())
			.map(|choice| &choice.files)
			.ok_or_else(|| InferenceError::Malformed("response has no choices".into()))
	}

	/// Replacement document for `file` from the first choice.
	pub fn replacement_for(&self, file: &str) -> Result<&str, InferenceError> {
		self.files()?
			.get(file)
			.map(String::as_str)
			.ok_or_else(|| InferenceError::Malformed(format!("no replacement for {file}")))
	}

	/// Highlight spans; a missing list is a malformed highlight response.
	pub fn highlight_spans(&self) -> Result<&[HighlightSpan], InferenceError> {
		self.highlight
			.as_deref()
			.ok_or_else(|| InferenceError::Malformed("response has no highlight list".into()))
	}
}
