//! Accept and reject of a presented diff, with feedback.

use diffmate_inference::FeedbackRecord;
use diffmate_primitives::{EditOp, UndoPolicy};
use diffmate_worker::TaskClass;
use tracing::{debug, warn};

use crate::session::DocumentSession;
use crate::state::Mode;

impl DocumentSession {
	/// Keeps the suggestion: deletes the lines marked red as one undo step.
	///
	/// Returns false when no diff is presented. Re-runs the highlight pass when
	/// the diff was reached from one.
	pub async fn accept(&self) -> bool {
		let (record, rehighlight) = {
			let mut st = self.state.lock();
			if st.mode != Mode::Diff {
				return false;
			}
			st.diff_lens_pos = None;
			let edits: Vec<EditOp> = st.diff_deleted_lines.iter().map(|line| EditOp::delete_line(*line)).collect();
			if let Err(err) = st.apply_guarded(&edits, UndoPolicy::Checkpoint) {
				warn!(doc = %self.id, error = %err, "diff.accept_failed");
				st.reset_feedback();
				st.switch_mode(Mode::Normal);
				return false;
			}
			st.remove_decorations();
			let rehighlight = st.highlight_backup.take().is_some();
			st.switch_mode(Mode::Normal);
			(std::mem::take(&mut st.data_feedback_candidate), rehighlight)
		};
		debug!(doc = %self.id, rehighlight, "diff.accepted");
		self.save_feedback(record, true).await;
		if rehighlight {
			let session = self.clone();
			diffmate_worker::spawn(TaskClass::Interactive, async move {
				session.query_highlight().await;
			});
		}
		true
	}

	/// Drops the suggestion: deletes the inserted lines without an undo step.
	///
	/// Returns false when no diff is presented.
	pub async fn reject(&self) -> bool {
		let record = {
			let mut st = self.state.lock();
			if st.mode != Mode::Diff {
				return false;
			}
			st.cleanup_edit_chain();
			st.highlight_backup = None;
			let edits: Vec<EditOp> = st.diff_added_lines.iter().map(|line| EditOp::delete_line(*line)).collect();
			if let Err(err) = st.apply_guarded(&edits, UndoPolicy::NoCheckpoint) {
				warn!(doc = %self.id, error = %err, "diff.reject_failed");
			}
			st.remove_decorations();
			st.switch_mode(Mode::Normal);
			std::mem::take(&mut st.data_feedback_candidate)
		};
		debug!(doc = %self.id, "diff.rejected");
		self.save_feedback(record, false).await;
		true
	}

	/// Hands the finalized candidate to the sink. The candidate on the state
	/// was already reset by the caller.
	async fn save_feedback(&self, record: FeedbackRecord, positive: bool) {
		if record.is_empty() {
			return;
		}
		if let Err(err) = self.shared.feedback.save_record(record.finalize(positive)).await {
			warn!(doc = %self.id, error = %err, "feedback.save_failed");
		}
	}
}
