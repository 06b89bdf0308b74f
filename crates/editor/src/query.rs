//! Diff queries: trigger, wait, present.

use std::collections::BTreeMap;

use chrono::Utc;
use diffmate_inference::functions::{DIFF_AT_CURSOR, DIFF_SELECTION, EDIT_CHAIN};
use diffmate_inference::{CancellationToken, InferenceRequest, RequestOutcome, RequestScope};
use diffmate_primitives::{Position, Range};
use tracing::{debug, warn};

use crate::animation;
use crate::presenter::present_diff;
use crate::session::DocumentSession;
use crate::state::{EditorState, Mode};

/// How a query ended, as seen by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
	/// A diff is presented.
	Presented,
	/// Sensitive ranges are marked.
	Highlighted,
	/// The request was canceled; the document went back to Normal.
	Canceled,
	/// Transport, service or malformed-response failure; back to Normal.
	Failed,
	/// A newer trigger or a mode change took over; the result was discarded.
	Superseded,
	/// Nothing to query.
	Skipped,
}

/// Replacement text plus the full file map of a usable response.
pub(crate) struct Replacement {
	pub(crate) text: String,
	pub(crate) files: BTreeMap<String, String>,
}

impl DocumentSession {
	/// Cancels every outstanding request and waits for it to wind down.
	///
	/// Returns the trigger ticket, or `None` when another trigger started
	/// during the wait and this one should give up.
	pub(crate) async fn supersede(&self) -> Option<u64> {
		let ticket = self.shared.take_ticket();
		self.shared.coordinator.cancel_all_and_wait().await;
		if self.shared.is_current(ticket) {
			Some(ticket)
		} else {
			debug!(doc = %self.id, ticket, "trigger.superseded");
			None
		}
	}

	pub(crate) fn build_request(
		&self,
		function: &str,
		text: String,
		cursor: (usize, usize),
		max_tokens: usize,
		max_edits: usize,
	) -> InferenceRequest {
		let config = &self.shared.config;
		let mut request = InferenceRequest::single_file(function, self.host.file_name(), text);
		request.model = config.model.clone();
		request.intent = self.shared.intent();
		request.temperature = config.temperature;
		request.cursor_start = cursor.0;
		request.cursor_end = cursor.1;
		request.max_tokens = max_tokens;
		request.max_edits = max_edits;
		request
	}

	/// Enters [`Mode::DiffWait`] and starts the pending animation over `region`.
	///
	/// Returns the wait generation the response must still match.
	pub(crate) fn begin_wait(&self, st: &mut EditorState, region: Range) -> u64 {
		st.switch_mode(Mode::DiffWait);
		let generation = st.wait_generation;
		st.animation = Some(animation::spawn(
			self.state.clone(),
			self.host.clone(),
			region,
			generation,
			self.shared.config.animation.clone(),
		));
		generation
	}

	/// Leaves a wait whose request was never issued.
	pub(crate) fn abandon_wait(&self, generation: u64) {
		let mut st = self.state.lock();
		if st.is_waiting(generation) {
			st.reset_feedback();
			st.switch_mode(Mode::Normal);
		}
	}

	/// Sorts an outcome into a usable replacement for `file` or the reason there is none.
	pub(crate) fn resolve(
		&self,
		outcome: RequestOutcome,
		cancel: &CancellationToken,
		file: &str,
	) -> Result<Replacement, QueryOutcome> {
		match outcome {
			_ if cancel.is_cancelled() => Err(QueryOutcome::Canceled),
			RequestOutcome::Canceled => Err(QueryOutcome::Canceled),
			RequestOutcome::Failed(err) => {
				warn!(doc = %self.id, error = %err, "query.failed");
				Err(QueryOutcome::Failed)
			}
			RequestOutcome::Completed(response) => {
				let extracted = response
					.replacement_for(file)
					.map(str::to_string)
					.and_then(|text| Ok((text, response.files()?.clone())));
				match extracted {
					Ok((text, files)) => Ok(Replacement { text, files }),
					Err(err) => {
						warn!(doc = %self.id, error = %err, "query.malformed");
						Err(QueryOutcome::Failed)
					}
				}
			}
		}
	}

	/// Switches to [`Mode::Diff`] and presents `modif_doc`.
	pub(crate) fn enter_diff(&self, st: &mut EditorState, modif_doc: &str, move_cursor: bool) -> QueryOutcome {
		st.switch_mode(Mode::Diff);
		match present_diff(st, self.shared.diff.as_ref(), modif_doc, move_cursor) {
			Ok(()) => QueryOutcome::Presented,
			Err(err) => {
				warn!(doc = %self.id, error = %err, "diff.present_failed");
				st.reset_feedback();
				st.switch_mode(Mode::Normal);
				QueryOutcome::Failed
			}
		}
	}

	/// Drops a failed or canceled wait back to Normal.
	pub(crate) fn fail_wait(st: &mut EditorState, outcome: QueryOutcome) -> QueryOutcome {
		st.reset_feedback();
		st.switch_mode(Mode::Normal);
		outcome
	}

	/// Queries a diff for `region` with remote `function`.
	///
	/// Cancels whatever is in flight first, then waits in [`Mode::DiffWait`]
	/// with the pending animation running. The response is used only if this
	/// document is still waiting on this very query.
	pub async fn query_diff(&self, region: Range, function: &str) -> QueryOutcome {
		if self.is_closed() {
			return QueryOutcome::Skipped;
		}
		let Some(ticket) = self.supersede().await else {
			return QueryOutcome::Superseded;
		};
		let cancel = CancellationToken::new();
		let diff = &self.shared.config.diff;
		let max_edits = if function == DIFF_AT_CURSOR {
			diff.max_edits_at_cursor
		} else {
			diff.max_edits_selection
		};

		let (request, generation) = {
			let mut st = self.state.lock();
			if st.closed {
				return QueryOutcome::Skipped;
			}
			st.back_to_normal();
			let cursor = (self.host.offset_at(region.start), self.host.offset_at(region.end));
			let request = self.build_request(function, self.host.text(), cursor, diff.max_tokens, max_edits);
			let generation = self.begin_wait(&mut st, region);
			st.diff_lens_pos = Some(region.start.line);
			(request, generation)
		};
		let file = request.cursor_file.clone();
		debug!(doc = %self.id, %region, function, "query_diff.issue");

		let Some(pending) = self
			.shared
			.issue_if_current(ticket, RequestScope::QueryDiff, request, &cancel)
		else {
			self.abandon_wait(generation);
			return QueryOutcome::Superseded;
		};
		{
			let mut st = self.state.lock();
			if st.is_waiting(generation) {
				st.data_feedback_candidate = pending.feedback_candidate().clone();
			}
		}

		let outcome = pending.outcome().await;

		let mut st = self.state.lock();
		if !st.is_waiting(generation) {
			debug!(doc = %self.id, generation, "query_diff.stale");
			return QueryOutcome::Superseded;
		}
		match self.resolve(outcome, &cancel, &file) {
			Ok(replacement) => {
				st.data_feedback_candidate.record_results(&replacement.files, Utc::now());
				st.showing_diff_for_range = Some(region);
				st.showing_diff_for_function = Some(function.to_string());
				st.showing_diff_modif_doc = Some(replacement.text.clone());
				self.enter_diff(&mut st, &replacement.text, false)
			}
			Err(outcome) => Self::fail_wait(&mut st, outcome),
		}
	}

	/// Queries the selection, or the cursor line when the selection is empty.
	pub async fn query_diff_selection(&self) -> QueryOutcome {
		let selection = self.host.selection();
		if selection.is_empty() {
			let line = self.host.cursor().line;
			let region = Range::new(Position::line_start(line), Position::new(line, self.host.line_len(line)));
			self.query_diff(region, DIFF_AT_CURSOR).await
		} else {
			self.query_diff(selection, DIFF_SELECTION).await
		}
	}

	/// Re-issues the query that produced the diff on screen.
	///
	/// A chained presentation is re-requested from the same base document.
	pub async fn query_the_same_thing_again(&self) -> QueryOutcome {
		let (function, region, base) = {
			let mut st = self.state.lock();
			st.edit_chain_modif_doc = None;
			(
				st.showing_diff_for_function.clone(),
				st.showing_diff_for_range,
				st.edit_chain_base.clone(),
			)
		};
		match (function, region) {
			(Some(function), _) if function == EDIT_CHAIN => self.chain_from(base).await,
			(Some(function), Some(region)) => self.query_diff(region, &function).await,
			_ => QueryOutcome::Skipped,
		}
	}
}
