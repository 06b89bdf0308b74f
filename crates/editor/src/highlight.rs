//! Highlight pass: sensitive ranges that arm cursor-triggered diff queries.

use diffmate_inference::functions::HIGHLIGHT;
use diffmate_inference::{CancellationToken, HighlightSpan, RequestOutcome, RequestScope};
use diffmate_primitives::{DecorationStyle, Range, Rgba};
use tracing::{debug, warn};

use crate::query::QueryOutcome;
use crate::session::DocumentSession;
use crate::state::{EditorState, Mode, SensitiveRange};

/// Highlight background; the span weight becomes the alpha.
const HIGHLIGHT_COLOR: Rgba = Rgba { r: 255, g: 240, b: 0, a: 1.0 };

pub fn highlight_style(weight: f32) -> DecorationStyle {
	DecorationStyle::background(HIGHLIGHT_COLOR.with_alpha(weight))
}

/// Marks `ranges` as sensitive and decorates them.
pub(crate) fn show_highlight(st: &mut EditorState, ranges: Vec<SensitiveRange>) {
	st.clear_highlight();
	for sensitive in &ranges {
		st.highlight_decorations
			.create(&highlight_style(sensitive.weight), &[sensitive.range]);
	}
	debug!(doc = %st.id, ranges = ranges.len(), "highlight.show");
	st.sensitive_ranges = ranges;
}

impl DocumentSession {
	fn spans_to_ranges(&self, spans: &[HighlightSpan]) -> Vec<SensitiveRange> {
		spans
			.iter()
			.map(|span| SensitiveRange {
				range: Range::new(self.host.position_at(span.start()), self.host.position_at(span.end())),
				weight: span.weight(),
			})
			.collect()
	}

	/// Runs the ranking pass at the cursor and enters [`Mode::Highlight`].
	pub async fn query_highlight(&self) -> QueryOutcome {
		if self.is_closed() {
			return QueryOutcome::Skipped;
		}
		let Some(ticket) = self.supersede().await else {
			return QueryOutcome::Superseded;
		};
		let cancel = CancellationToken::new();
		let (request, generation) = {
			let mut st = self.state.lock();
			if st.closed {
				return QueryOutcome::Skipped;
			}
			st.back_to_normal();
			let cursor = self.host.offset_at(self.host.cursor());
			let request = self.build_request(
				HIGHLIGHT,
				self.host.text(),
				(cursor, cursor),
				self.shared.config.highlight.max_tokens,
				1,
			);
			(request, st.wait_generation)
		};

		let Some(pending) = self
			.shared
			.issue_if_current(ticket, RequestScope::QueryHighlight, request, &cancel)
		else {
			return QueryOutcome::Superseded;
		};
		let outcome = pending.outcome().await;

		let mut st = self.state.lock();
		if st.closed || st.mode != Mode::Normal || st.wait_generation != generation {
			debug!(doc = %self.id, "query_highlight.stale");
			return QueryOutcome::Superseded;
		}
		let response = match outcome {
			_ if cancel.is_cancelled() => return QueryOutcome::Canceled,
			RequestOutcome::Canceled => return QueryOutcome::Canceled,
			RequestOutcome::Failed(err) => {
				warn!(doc = %self.id, error = %err, "query_highlight.failed");
				return QueryOutcome::Failed;
			}
			RequestOutcome::Completed(response) => response,
		};
		let spans = match response.highlight_spans() {
			Ok(spans) => spans.to_vec(),
			Err(err) => {
				warn!(doc = %self.id, error = %err, "query_highlight.malformed");
				return QueryOutcome::Failed;
			}
		};
		st.switch_mode(Mode::Highlight);
		let ranges = self.spans_to_ranges(&spans);
		show_highlight(&mut st, ranges);
		st.highlight_backup = Some(spans);
		QueryOutcome::Highlighted
	}

	/// Marks ranges ranked by an external step, as a highlight response would.
	pub fn mark_sensitive(&self, ranges: Vec<SensitiveRange>) {
		let mut st = self.state.lock();
		st.back_to_normal();
		st.switch_mode(Mode::Highlight);
		show_highlight(&mut st, ranges);
	}

	/// Disposes highlight decorations and forgets the sensitive ranges.
	///
	/// A dismissed pass is not re-run after a later accept.
	pub fn clear_highlight(&self) {
		let mut st = self.state.lock();
		st.highlight_backup = None;
		if st.mode == Mode::Highlight {
			st.switch_mode(Mode::Normal);
		} else {
			st.clear_highlight();
		}
	}
}
