//! Feedback sink writing one JSON object per line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use diffmate_inference::{FeedbackError, FeedbackRecord, FeedbackSink};

#[derive(Debug)]
pub struct JsonLinesSink {
	path: PathBuf,
}

impl JsonLinesSink {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl FeedbackSink for JsonLinesSink {
	async fn save_record(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
		let mut line = serde_json::to_string(&record)?;
		line.push('\n');
		let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
		file.write_all(line.as_bytes())?;
		Ok(())
	}
}
