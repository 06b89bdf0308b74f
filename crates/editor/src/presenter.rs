//! Turns a replacement document into an in-place, annotated diff.
//!
//! The buffer ends up holding a *combined* document: every original line plus
//! every added line, interleaved in diff order. Removed lines stay visible
//! (painted red) until the user accepts; added lines are real text (painted
//! green) until the user rejects. [`DiffPlan`] is the pure part of that
//! computation; [`present_diff`] applies it.

use diffmate_primitives::{DecorationStyle, EditOp, GutterIcon, Position, Range, Rgba, UndoPolicy};
use tracing::debug;

use crate::diff_algo::{DiffAlgorithm, SpanTag};
use crate::host::HostError;
use crate::state::{ChangingDocGuard, EditorState};

const GREEN: Rgba = Rgba { r: 0, g: 255, b: 0, a: 0.1 };
const RED: Rgba = Rgba { r: 255, g: 0, b: 0, a: 0.1 };
const VERY_GREEN: Rgba = Rgba { r: 0, g: 255, b: 0, a: 0.3 };
const VERY_RED: Rgba = Rgba { r: 255, g: 0, b: 0, a: 0.3 };

/// Whole-line background for added lines.
pub fn added_line_style() -> DecorationStyle {
	DecorationStyle::background(GREEN)
		.whole_line()
		.with_gutter_icon(GutterIcon::AddLine)
		.with_plain_foreground()
}

/// Whole-line background for lines awaiting deletion.
pub fn removed_line_style() -> DecorationStyle {
	DecorationStyle::background(RED)
		.whole_line()
		.with_gutter_icon(GutterIcon::RemoveLine)
}

/// Exact added characters.
pub fn added_chars_style() -> DecorationStyle {
	DecorationStyle::background(VERY_GREEN).with_plain_foreground()
}

/// Exact removed characters.
pub fn removed_chars_style() -> DecorationStyle {
	DecorationStyle::background(VERY_RED)
}

/// Edits and decoration ranges for one presentation.
///
/// Line numbers and ranges are in combined-document coordinates; edit
/// positions refer to the buffer before the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffPlan {
	pub edits: Vec<EditOp>,
	pub added_lines: Vec<usize>,
	pub deleted_lines: Vec<usize>,
	pub added_line_ranges: Vec<Range>,
	pub removed_line_ranges: Vec<Range>,
	pub added_char_ranges: Vec<Range>,
	pub removed_char_ranges: Vec<Range>,
}

impl DiffPlan {
	/// Diffs `buffer` against `replacement`.
	///
	/// Both sides are newline-terminated first. A missing newline at the end
	/// of the buffer becomes an edit too, ordered after every insertion that
	/// lands on the unterminated last line and before those past it, since the
	/// host resolves all of them to the same offset.
	pub fn compute(diff: &dyn DiffAlgorithm, buffer: &str, replacement: &str) -> Self {
		let mut plan = Self::default();

		let mut old = buffer.to_string();
		let tail = end_of(buffer);
		let mut terminate = None;
		if !old.ends_with('\n') {
			terminate = Some(EditOp::Insert {
				at: tail,
				text: "\n".to_string(),
			});
			old.push('\n');
		}
		let mut new = replacement.to_string();
		if !new.is_empty() && !new.ends_with('\n') {
			new.push('\n');
		}

		// `line_n` walks the combined document, `line_n_insert` the buffer
		// before the batch.
		let mut line_n = 0;
		let mut line_n_insert = 0;
		let mut removed: Option<(String, usize)> = None;
		for span in diff.diff_lines(&old, &new) {
			let count = span.line_count();
			match span.tag {
				SpanTag::Removed => {
					plan.removed_line_ranges.push(line_block(line_n, count));
					plan.deleted_lines.extend(line_n..line_n + count);
					line_n += count;
					line_n_insert += count;
					removed = Some((span.text, line_n - count));
				}
				SpanTag::Added => {
					plan.added_line_ranges.push(line_block(line_n, count));
					plan.added_lines.extend(line_n..line_n + count);
					if let Some((removed_text, removed_line)) = removed.take() {
						plan.char_ranges(diff, &removed_text, removed_line, &span.text, line_n);
					}
					if line_n_insert > tail.line
						&& let Some(newline) = terminate.take()
					{
						plan.edits.push(newline);
					}
					plan.edits.push(EditOp::insert_lines(line_n_insert, span.text));
					line_n += count;
				}
				SpanTag::Equal => {
					line_n += count;
					line_n_insert += count;
					removed = None;
				}
			}
		}
		plan.edits.extend(terminate);
		plan
	}

	/// Fine-grained ranges for a removed block directly followed by an added one.
	fn char_ranges(&mut self, diff: &dyn DiffAlgorithm, removed: &str, removed_line: usize, added: &str, added_line: usize) {
		let mut del = Position::line_start(removed_line);
		let mut ins = Position::line_start(added_line);
		for part in diff.diff_chars(removed, added) {
			match part.tag {
				SpanTag::Removed => del = push_split(&mut self.removed_char_ranges, del, &part.text),
				SpanTag::Added => ins = push_split(&mut self.added_char_ranges, ins, &part.text),
				SpanTag::Equal => {
					del = advance(del, &part.text);
					ins = advance(ins, &part.text);
				}
			}
		}
	}

	/// Lines from the first to the last touched line, `None` when nothing changed.
	pub fn reveal_range(&self) -> Option<Range> {
		let touched = [
			self.added_lines.first(),
			self.added_lines.last(),
			self.deleted_lines.first(),
			self.deleted_lines.last(),
		];
		let first = touched.iter().flatten().min()?;
		let last = touched.iter().flatten().max()?;
		Some(Range::lines(**first, **last))
	}

	pub fn is_unchanged(&self) -> bool {
		self.added_lines.is_empty() && self.deleted_lines.is_empty()
	}
}

fn line_block(first: usize, count: usize) -> Range {
	Range::lines(first, (first + count).saturating_sub(1))
}

fn end_of(text: &str) -> Position {
	let line = text.matches('\n').count();
	let column = text.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
	Position::new(line, column)
}

fn advance(mut pos: Position, text: &str) -> Position {
	for ch in text.chars() {
		if ch == '\n' {
			pos = Position::line_start(pos.line + 1);
		} else {
			pos.column += 1;
		}
	}
	pos
}

/// Pushes one range per line covered by `text` starting at `pos`, returns the end.
fn push_split(out: &mut Vec<Range>, pos: Position, text: &str) -> Position {
	let mut start = pos;
	let mut end = pos;
	for ch in text.chars() {
		if ch == '\n' {
			if end != start {
				out.push(Range::new(start, end));
			}
			end = Position::line_start(end.line + 1);
			start = end;
		} else {
			end.column += 1;
		}
	}
	if end != start {
		out.push(Range::new(start, end));
	}
	end
}

/// Applies `modif_doc` to the buffer as a combined document and renders it.
///
/// On success `diff_added_lines`/`diff_deleted_lines` enumerate the lines of
/// this presentation and `diff_decorations` holds exactly its four handles.
pub(crate) fn present_diff(
	st: &mut EditorState,
	diff: &dyn DiffAlgorithm,
	modif_doc: &str,
	move_cursor: bool,
) -> Result<(), HostError> {
	st.remove_decorations();
	st.clear_highlight();

	let host = st.host.clone();
	let plan = DiffPlan::compute(diff, &host.text(), modif_doc);
	let reveal = plan.reveal_range();

	let guard = ChangingDocGuard::begin(st);
	let applied = if plan.edits.is_empty() {
		Ok(())
	} else {
		host.apply_edits(&plan.edits, UndoPolicy::NoCheckpoint)
	};
	if applied.is_ok()
		&& let Some(reveal) = reveal
	{
		host.reveal(reveal);
		if move_cursor {
			host.set_cursor(reveal.start);
		}
	}
	guard.finish(st);
	applied?;

	st.diff_decorations.create(&added_line_style(), &plan.added_line_ranges);
	st.diff_decorations.create(&removed_line_style(), &plan.removed_line_ranges);
	st.diff_decorations.create(&added_chars_style(), &plan.added_char_ranges);
	st.diff_decorations.create(&removed_chars_style(), &plan.removed_char_ranges);

	if let Some(reveal) = reveal {
		let first = reveal.start.line;
		st.diff_lens_pos = Some(st.diff_lens_pos.map_or(first, |lens| lens.min(first)));
		st.edit_chain_anchor = Some(reveal.start);
	}
	debug!(
		doc = %st.id,
		added = plan.added_lines.len(),
		deleted = plan.deleted_lines.len(),
		lens = ?st.diff_lens_pos,
		"diff.presented"
	);
	st.diff_added_lines = plan.added_lines;
	st.diff_deleted_lines = plan.deleted_lines;
	Ok(())
}
