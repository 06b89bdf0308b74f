//! Per-document state and the mode machine.

use std::fmt;
use std::sync::Arc;

use diffmate_inference::{FeedbackRecord, HighlightSpan};
use diffmate_primitives::{DocumentId, EditOp, Position, Range, UndoPolicy};
use diffmate_worker::ScopedTask;
use tracing::{debug, warn};

use crate::host::{DecorationSet, EditorHost, HostError};

/// State machine value of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
	#[default]
	Normal,
	/// Sensitive ranges are marked and armed for cursor entry.
	Highlight,
	/// A diff request is outstanding and the pending animation runs.
	DiffWait,
	/// A suggested diff is presented in the buffer.
	Diff,
}

impl Mode {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Normal => "normal",
			Self::Highlight => "highlight",
			Self::DiffWait => "diff_wait",
			Self::Diff => "diff",
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A region that queries a diff when the cursor enters it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitiveRange {
	pub range: Range,
	/// Ranking weight in `0.0..=1.0`, drawn as highlight opacity.
	pub weight: f32,
}

/// Mutable state of one open document view.
///
/// Lives behind a mutex owned by [`DocumentSession`](crate::DocumentSession).
/// Code holding the lock may call the host, never await.
pub struct EditorState {
	pub(crate) id: DocumentId,
	pub(crate) host: Arc<dyn EditorHost>,
	pub(crate) mode: Mode,
	pub(crate) closed: bool,

	pub(crate) sensitive_ranges: Vec<SensitiveRange>,
	pub(crate) highlight_decorations: DecorationSet,
	/// Last highlight response; accepting a diff re-runs the highlight pass when set.
	pub(crate) highlight_backup: Option<Vec<HighlightSpan>>,

	/// Buffer lines inserted by the presenter.
	pub(crate) diff_added_lines: Vec<usize>,
	/// Buffer lines marked for deletion by the presenter.
	pub(crate) diff_deleted_lines: Vec<usize>,
	pub(crate) diff_decorations: DecorationSet,
	pub(crate) diff_changing_doc: bool,
	/// Host notification seq windows `(before, after]` produced by our own edits.
	suppressed: Vec<(u64, u64)>,

	pub(crate) showing_diff_for_range: Option<Range>,
	pub(crate) showing_diff_for_function: Option<String>,
	pub(crate) showing_diff_modif_doc: Option<String>,

	pub(crate) edit_chain_modif_doc: Option<String>,
	/// Document the last chained request continued from.
	pub(crate) edit_chain_base: Option<String>,
	pub(crate) edit_chain_anchor: Option<Position>,

	pub(crate) data_feedback_candidate: FeedbackRecord,
	pub(crate) diff_lens_pos: Option<usize>,

	/// Bumped on every entry into [`Mode::DiffWait`].
	pub(crate) wait_generation: u64,
	/// Bumped on every cursor move.
	pub(crate) nav_generation: u64,
	pub(crate) animation: Option<ScopedTask>,
}

impl fmt::Debug for EditorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EditorState")
			.field("id", &self.id)
			.field("mode", &self.mode)
			.field("diff_added_lines", &self.diff_added_lines)
			.field("diff_deleted_lines", &self.diff_deleted_lines)
			.field("diff_decorations", &self.diff_decorations)
			.field("diff_changing_doc", &self.diff_changing_doc)
			.finish_non_exhaustive()
	}
}

/// Read-only copy of the observable parts of [`EditorState`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
	pub mode: Mode,
	pub sensitive_ranges: Vec<SensitiveRange>,
	pub highlight_decorations: usize,
	pub diff_added_lines: Vec<usize>,
	pub diff_deleted_lines: Vec<usize>,
	pub diff_decorations: usize,
	pub diff_changing_doc: bool,
	pub showing_diff_for_range: Option<Range>,
	pub showing_diff_for_function: Option<String>,
	pub edit_chain_modif_doc: Option<String>,
	pub data_feedback_candidate: FeedbackRecord,
	pub diff_lens_pos: Option<usize>,
	pub animating: bool,
}

/// Marks a presenter-driven buffer mutation.
///
/// Between [`begin`](Self::begin) and [`finish`](Self::finish)
/// `diff_changing_doc` is set; `finish` also remembers which host
/// notifications the edit produced so the event pump drops them even when it
/// sees them after the flag cleared.
#[must_use]
pub(crate) struct ChangingDocGuard {
	before: u64,
}

impl ChangingDocGuard {
	pub(crate) fn begin(st: &mut EditorState) -> Self {
		st.diff_changing_doc = true;
		Self {
			before: st.host.notification_seq(),
		}
	}

	pub(crate) fn finish(self, st: &mut EditorState) {
		let after = st.host.notification_seq();
		if after > self.before {
			st.suppressed.push((self.before, after));
		}
		st.diff_changing_doc = false;
	}
}

impl EditorState {
	pub(crate) fn new(id: DocumentId, host: Arc<dyn EditorHost>) -> Self {
		Self {
			id,
			mode: Mode::Normal,
			closed: false,
			sensitive_ranges: Vec::new(),
			highlight_decorations: DecorationSet::new(host.clone()),
			highlight_backup: None,
			diff_added_lines: Vec::new(),
			diff_deleted_lines: Vec::new(),
			diff_decorations: DecorationSet::new(host.clone()),
			diff_changing_doc: false,
			suppressed: Vec::new(),
			showing_diff_for_range: None,
			showing_diff_for_function: None,
			showing_diff_modif_doc: None,
			edit_chain_modif_doc: None,
			edit_chain_base: None,
			edit_chain_anchor: None,
			data_feedback_candidate: FeedbackRecord::default(),
			diff_lens_pos: None,
			wait_generation: 0,
			nav_generation: 0,
			animation: None,
			host,
		}
	}

	pub(crate) fn snapshot(&self) -> StateSnapshot {
		StateSnapshot {
			mode: self.mode,
			sensitive_ranges: self.sensitive_ranges.clone(),
			highlight_decorations: self.highlight_decorations.len(),
			diff_added_lines: self.diff_added_lines.clone(),
			diff_deleted_lines: self.diff_deleted_lines.clone(),
			diff_decorations: self.diff_decorations.len(),
			diff_changing_doc: self.diff_changing_doc,
			showing_diff_for_range: self.showing_diff_for_range,
			showing_diff_for_function: self.showing_diff_for_function.clone(),
			edit_chain_modif_doc: self.edit_chain_modif_doc.clone(),
			data_feedback_candidate: self.data_feedback_candidate.clone(),
			diff_lens_pos: self.diff_lens_pos,
			animating: self.animation.as_ref().is_some_and(|task| !task.is_finished()),
		}
	}

	/// Transitions the mode machine, running the exit and entry actions.
	///
	/// Leaving [`Mode::Diff`] rolls back whatever speculative lines are still
	/// listed; accept and reject empty the lists before switching, so for them
	/// the rollback is a no-op.
	pub(crate) fn switch_mode(&mut self, new: Mode) {
		let old = self.mode;
		if old == Mode::Diff && new != Mode::Diff {
			self.rollback_added_lines();
		}
		if new != Mode::Diff {
			self.remove_decorations();
		}
		if old == Mode::Highlight && new != Mode::Highlight {
			self.clear_highlight();
		}
		if new != Mode::DiffWait {
			self.animation = None;
		} else {
			self.wait_generation += 1;
		}
		self.mode = new;
		debug!(doc = %self.id, from = %old, to = %new, wait = self.wait_generation, "mode.switch");
	}

	/// Returns to [`Mode::Normal`]. The highlight backup survives.
	pub(crate) fn back_to_normal(&mut self) {
		if self.mode != Mode::Normal {
			self.switch_mode(Mode::Normal);
		}
	}

	/// Disposes diff decorations and forgets the added/deleted line lists.
	pub(crate) fn remove_decorations(&mut self) {
		self.diff_decorations.dispose_all();
		self.diff_added_lines.clear();
		self.diff_deleted_lines.clear();
	}

	/// Disposes highlight decorations and forgets the sensitive ranges.
	pub(crate) fn clear_highlight(&mut self) {
		self.highlight_decorations.dispose_all();
		self.sensitive_ranges.clear();
	}

	/// Forgets the chained continuation; a later chain request needs a new presentation.
	pub(crate) fn cleanup_edit_chain(&mut self) {
		self.edit_chain_modif_doc = None;
		self.edit_chain_base = None;
		self.edit_chain_anchor = None;
	}

	/// The user took over: drop the chain and the overlay but keep the text.
	pub(crate) fn hands_off(&mut self) {
		self.cleanup_edit_chain();
		self.remove_decorations();
		if self.mode == Mode::Diff {
			self.highlight_backup = None;
			self.reset_feedback();
			self.switch_mode(Mode::Normal);
		}
	}

	/// True while the DiffWait entered at `generation` is still the current one.
	pub(crate) fn is_waiting(&self, generation: u64) -> bool {
		!self.closed && self.mode == Mode::DiffWait && self.wait_generation == generation
	}

	/// Applies `edits` with `diff_changing_doc` held for the duration.
	///
	/// An empty batch still reaches the host when it closes an undo checkpoint.
	pub(crate) fn apply_guarded(&mut self, edits: &[EditOp], undo: UndoPolicy) -> Result<(), HostError> {
		if edits.is_empty() && undo == UndoPolicy::NoCheckpoint {
			return Ok(());
		}
		let guard = ChangingDocGuard::begin(self);
		let result = self.host.apply_edits(edits, undo);
		guard.finish(self);
		result
	}

	/// Deletes the presenter's inserted lines without an undo checkpoint.
	fn rollback_added_lines(&mut self) {
		let edits: Vec<EditOp> = self.diff_added_lines.iter().map(|line| EditOp::delete_line(*line)).collect();
		if let Err(err) = self.apply_guarded(&edits, UndoPolicy::NoCheckpoint) {
			warn!(doc = %self.id, error = %err, "diff.rollback_failed");
		}
	}

	/// True when the notification `seq` was produced by one of our own edits.
	pub(crate) fn is_suppressed(&mut self, seq: u64) -> bool {
		self.suppressed.retain(|(_, after)| *after >= seq);
		self.suppressed.iter().any(|(before, after)| *before < seq && seq <= *after)
	}

	/// Drops the feedback candidate without persisting it.
	pub(crate) fn reset_feedback(&mut self) {
		self.data_feedback_candidate = FeedbackRecord::default();
	}
}
