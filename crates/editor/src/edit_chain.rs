//! Chained edits: continue from the last produced replacement.

use chrono::Utc;
use diffmate_inference::functions::EDIT_CHAIN;
use diffmate_inference::{CancellationToken, RequestScope};
use diffmate_primitives::{Position, Range};
use tracing::debug;

use crate::query::QueryOutcome;
use crate::session::DocumentSession;
use crate::state::Mode;

/// Char offset of `pos` inside `text`, clamped like a host would.
pub(crate) fn offset_in(text: &str, pos: Position) -> usize {
	let mut offset = 0;
	for (line, content) in text.split_inclusive('\n').enumerate() {
		let len = content.strip_suffix('\n').unwrap_or(content).chars().count();
		if line == pos.line {
			return offset + pos.column.min(len);
		}
		offset += content.chars().count();
	}
	offset
}

impl DocumentSession {
	/// Asks for the edit that follows the one shown (or just accepted).
	pub async fn request_chained_edit(&self) -> QueryOutcome {
		let base = {
			let st = self.state.lock();
			match st.mode {
				Mode::Diff => st.showing_diff_modif_doc.clone(),
				_ => Some(self.host.text()),
			}
		};
		self.chain_from(base).await
	}

	/// Issues an `edit-chain` request continuing from `base`.
	pub(crate) async fn chain_from(&self, base: Option<String>) -> QueryOutcome {
		let Some(base) = base else {
			return QueryOutcome::Skipped;
		};
		if self.is_closed() {
			return QueryOutcome::Skipped;
		}
		let Some(ticket) = self.supersede().await else {
			return QueryOutcome::Superseded;
		};
		let cancel = CancellationToken::new();
		let chain = &self.shared.config.chain;

		let (request, generation) = {
			let mut st = self.state.lock();
			if st.closed {
				return QueryOutcome::Skipped;
			}
			let Some(anchor) = st.edit_chain_anchor else {
				debug!(doc = %self.id, "edit_chain.no_anchor");
				return QueryOutcome::Skipped;
			};
			st.back_to_normal();
			let offset = offset_in(&base, anchor);
			let request = self.build_request(EDIT_CHAIN, base.clone(), (offset, offset), chain.max_tokens, chain.max_edits);
			let line = anchor.line.min(self.host.line_count().saturating_sub(1));
			let generation = self.begin_wait(&mut st, Range::lines(line, line));
			st.edit_chain_base = Some(base);
			(request, generation)
		};
		let file = request.cursor_file.clone();

		let Some(pending) = self
			.shared
			.issue_if_current(ticket, RequestScope::EditChain, request, &cancel)
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
			debug!(doc = %self.id, generation, "edit_chain.stale");
			return QueryOutcome::Superseded;
		}
		match self.resolve(outcome, &cancel, &file) {
			Ok(replacement) => {
				st.data_feedback_candidate.record_results(&replacement.files, Utc::now());
				st.edit_chain_modif_doc = Some(replacement.text.clone());
				st.showing_diff_for_range = None;
				st.showing_diff_for_function = Some(EDIT_CHAIN.to_string());
				st.showing_diff_modif_doc = Some(replacement.text.clone());
				self.enter_diff(&mut st, &replacement.text, true)
			}
			Err(outcome) => Self::fail_wait(&mut st, outcome),
		}
	}

	/// The user started editing on their own: forget the chain and the
	/// overlay, leave the text as it is.
	pub fn hands_off(&self) {
		self.state.lock().hands_off();
	}
}
