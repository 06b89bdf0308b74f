//! Feedback records: request context plus the user's verdict.
//!
//! A record is born at issue time (context only, see
//! [`RequestCoordinator::issue`](crate::RequestCoordinator::issue)), gains the
//! returned files when a diff is presented, and is finalized with a verdict on
//! accept or reject before being handed to a [`FeedbackSink`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::InferenceRequest;

/// Errors reported by feedback persistence.
#[derive(Debug, Error)]
pub enum FeedbackError {
	#[error("feedback persistence failed: {0}")]
	Io(#[from] std::io::Error),
	#[error("feedback encoding failed: {0}")]
	Encode(#[from] serde_json::Error),
}

/// One feedback record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
	pub sources: BTreeMap<String, String>,
	pub intent: String,
	pub function: String,
	pub cursor_file: String,
	pub cursor_pos0: usize,
	pub cursor_pos1: usize,
	/// Files returned by the service, filled in when the diff is presented.
	pub results: BTreeMap<String, String>,
	pub ts: Option<DateTime<Utc>>,
	/// `None` until the user accepts or rejects.
	pub positive: Option<bool>,
}

impl FeedbackRecord {
	/// Context-only record for a request issued at `ts`.
	pub fn from_request(request: &InferenceRequest, ts: DateTime<Utc>) -> Self {
		Self {
			sources: request.sources.clone(),
			intent: request.intent.clone(),
			function: request.function.clone(),
			cursor_file: request.cursor_file.clone(),
			cursor_pos0: request.cursor_start,
			cursor_pos1: request.cursor_end,
			results: BTreeMap::new(),
			ts: Some(ts),
			positive: None,
		}
	}

	/// An empty candidate carries no request context and is never persisted.
	pub fn is_empty(&self) -> bool {
		self.cursor_file.is_empty()
	}

	/// Attaches the returned files and refreshes the timestamp.
	pub fn record_results(&mut self, files: &BTreeMap<String, String>, ts: DateTime<Utc>) {
		self.results = files.clone();
		self.ts = Some(ts);
	}

	/// Consumes the candidate, adding the verdict.
	pub fn finalize(mut self, positive: bool) -> Self {
		self.positive = Some(positive);
		self
	}
}

/// Persistence collaborator for finalized records.
#[async_trait]
pub trait FeedbackSink: Send + Sync + 'static {
	async fn save_record(&self, record: FeedbackRecord) -> Result<(), FeedbackError>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryFeedbackSink {
	records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryFeedbackSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of everything saved so far.
	pub fn records(&self) -> Vec<FeedbackRecord> {
		self.records.lock().clone()
	}
}

#[async_trait]
impl FeedbackSink for MemoryFeedbackSink {
	async fn save_record(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
		self.records.lock().push(record);
		Ok(())
	}
}
