//! In-memory [`EditorHost`] backed by a rope.
//!
//! Used by the CLI and by tests. Besides the host capabilities it offers the
//! user-side actions a real editor would produce (typing, moving the cursor,
//! selecting) and read-back of rendered decorations.

use std::collections::BTreeMap;

use diffmate_primitives::{DecorationId, DecorationStyle, EditOp, Position, Range, UndoPolicy};
use parking_lot::Mutex;
use ropey::Rope;

use super::{EditorHost, HostError, HostEvent, HostEventKind, HostEventSender, SubscriptionId};

/// A decoration as rendered by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDecoration {
	pub style: DecorationStyle,
	pub ranges: Vec<Range>,
}

#[derive(Debug, Default)]
struct Inner {
	rope: Rope,
	anchor: Position,
	cursor: Position,
	decorations: BTreeMap<DecorationId, RenderedDecoration>,
	next_decoration: u64,
	subscribers: Vec<(SubscriptionId, HostEventSender)>,
	next_subscription: u64,
	seq: u64,
	undo_checkpoints: usize,
	edit_batches: usize,
	revealed: Option<Range>,
}

impl Inner {
	fn char_offset(&self, pos: Position) -> usize {
		if pos.line >= self.rope.len_lines() {
			return self.rope.len_chars();
		}
		let start = self.rope.line_to_char(pos.line);
		start + pos.column.min(self.line_len(pos.line))
	}

	fn position(&self, offset: usize) -> Position {
		let offset = offset.min(self.rope.len_chars());
		let line = self.rope.char_to_line(offset);
		Position::new(line, offset - self.rope.line_to_char(line))
	}

	fn line_len(&self, line: usize) -> usize {
		if line >= self.rope.len_lines() {
			return 0;
		}
		let slice = self.rope.line(line);
		let len = slice.len_chars();
		if len > 0 && slice.char(len - 1) == '\n' { len - 1 } else { len }
	}

	fn notify(&mut self, kind: HostEventKind) {
		self.seq += 1;
		let event = HostEvent { seq: self.seq, kind };
		self.subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
	}

	fn clamp(&self, pos: Position) -> Position {
		self.position(self.char_offset(pos))
	}

	fn selection_changed(&mut self, is_mouse: bool) {
		let kind = HostEventKind::SelectionChanged {
			cursor: self.cursor,
			selection_empty: self.anchor == self.cursor,
			is_mouse,
		};
		self.notify(kind);
	}
}

/// Rope-backed host for a single document.
#[derive(Debug)]
pub struct MemoryHost {
	file_name: String,
	inner: Mutex<Inner>,
}

impl MemoryHost {
	pub fn new(file_name: impl Into<String>, text: &str) -> Self {
		Self {
			file_name: file_name.into(),
			inner: Mutex::new(Inner {
				rope: Rope::from_str(text),
				..Inner::default()
			}),
		}
	}

	/// User typing: inserts `text` at `pos` and moves the cursor after it.
	pub fn type_text(&self, pos: Position, text: &str) {
		let mut inner = self.inner.lock();
		let offset = inner.char_offset(pos);
		inner.rope.insert(offset, text);
		inner.undo_checkpoints += 1;
		inner.notify(HostEventKind::ContentChanged);
		let cursor = inner.position(offset + text.chars().count());
		inner.anchor = cursor;
		inner.cursor = cursor;
		inner.selection_changed(false);
	}

	/// User navigation: collapses the selection at `pos`.
	pub fn move_cursor(&self, pos: Position, is_mouse: bool) {
		let mut inner = self.inner.lock();
		let pos = inner.clamp(pos);
		inner.anchor = pos;
		inner.cursor = pos;
		inner.selection_changed(is_mouse);
	}

	/// User selection from `anchor` to `cursor`.
	pub fn select(&self, anchor: Position, cursor: Position) {
		let mut inner = self.inner.lock();
		inner.anchor = inner.clamp(anchor);
		inner.cursor = inner.clamp(cursor);
		inner.selection_changed(false);
	}

	/// Decorations currently rendered, in creation order.
	pub fn decorations(&self) -> Vec<RenderedDecoration> {
		self.inner.lock().decorations.values().cloned().collect()
	}

	pub fn decoration_count(&self) -> usize {
		self.inner.lock().decorations.len()
	}

	/// Number of undo checkpoints closed so far.
	pub fn undo_checkpoints(&self) -> usize {
		self.inner.lock().undo_checkpoints
	}

	/// Number of edit batches applied through [`EditorHost::apply_edits`].
	pub fn edit_batches(&self) -> usize {
		self.inner.lock().edit_batches
	}

	/// Last range passed to [`EditorHost::reveal`].
	pub fn revealed(&self) -> Option<Range> {
		self.inner.lock().revealed
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.inner.lock().subscribers.len()
	}
}

impl EditorHost for MemoryHost {
	fn file_name(&self) -> String {
		self.file_name.clone()
	}

	fn text(&self) -> String {
		self.inner.lock().rope.to_string()
	}

	fn line_count(&self) -> usize {
		self.inner.lock().rope.len_lines()
	}

	fn line_len(&self, line: usize) -> usize {
		self.inner.lock().line_len(line)
	}

	fn offset_at(&self, pos: Position) -> usize {
		self.inner.lock().char_offset(pos)
	}

	fn position_at(&self, offset: usize) -> Position {
		self.inner.lock().position(offset)
	}

	fn cursor(&self) -> Position {
		self.inner.lock().cursor
	}

	fn selection(&self) -> Range {
		let inner = self.inner.lock();
		Range::new(inner.anchor, inner.cursor)
	}

	fn set_cursor(&self, pos: Position) {
		let mut inner = self.inner.lock();
		let pos = inner.clamp(pos);
		inner.anchor = pos;
		inner.cursor = pos;
		inner.selection_changed(false);
	}

	fn reveal(&self, range: Range) {
		self.inner.lock().revealed = Some(range);
	}

	fn apply_edits(&self, edits: &[EditOp], undo: UndoPolicy) -> Result<(), HostError> {
		let mut inner = self.inner.lock();
		// (start, end, insert) in pre-batch char offsets. The sort is stable:
		// insertions at one offset keep batch order and precede a deletion there.
		let mut ops: Vec<(usize, usize, &str)> = edits
			.iter()
			.map(|edit| match edit {
				EditOp::Insert { at, text } => {
					let offset = inner.char_offset(*at);
					(offset, offset, text.as_str())
				}
				EditOp::Delete { range } => (inner.char_offset(range.start), inner.char_offset(range.end), ""),
			})
			.collect();
		ops.sort_by_key(|(start, end, _)| (*start, *end));
		for pair in ops.windows(2) {
			if pair[1].0 < pair[0].1 {
				return Err(HostError::Rejected(format!(
					"overlapping edits at offsets {} and {}",
					pair[0].0, pair[1].0
				)));
			}
		}

		let cursor_offset = inner.char_offset(inner.cursor);
		let mut shift: isize = 0;
		let mut out = String::with_capacity(inner.rope.len_bytes());
		let mut copied = 0;
		for (start, end, text) in &ops {
			out.extend(inner.rope.slice(copied..*start).chars());
			out.push_str(text);
			copied = *end;
			if *start < cursor_offset {
				let removed = end.min(&cursor_offset) - start;
				shift += text.chars().count() as isize - removed as isize;
			}
		}
		out.extend(inner.rope.slice(copied..).chars());
		inner.rope = Rope::from_str(&out);
		inner.edit_batches += 1;
		if undo == UndoPolicy::Checkpoint {
			inner.undo_checkpoints += 1;
		}
		if !ops.is_empty() {
			inner.notify(HostEventKind::ContentChanged);
		}

		let cursor = inner.position(cursor_offset.saturating_add_signed(shift));
		if cursor != inner.cursor {
			inner.anchor = cursor;
			inner.cursor = cursor;
			inner.selection_changed(false);
		}
		Ok(())
	}

	fn create_decoration(&self, style: &DecorationStyle, ranges: &[Range]) -> DecorationId {
		let mut inner = self.inner.lock();
		inner.next_decoration += 1;
		let id = DecorationId(inner.next_decoration);
		inner.decorations.insert(
			id,
			RenderedDecoration {
				style: style.clone(),
				ranges: ranges.to_vec(),
			},
		);
		id
	}

	fn dispose_decoration(&self, id: DecorationId) {
		self.inner.lock().decorations.remove(&id);
	}

	fn subscribe(&self, tx: HostEventSender) -> SubscriptionId {
		let mut inner = self.inner.lock();
		inner.next_subscription += 1;
		let id = SubscriptionId(inner.next_subscription);
		inner.subscribers.push((id, tx));
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		self.inner.lock().subscribers.retain(|(sub, _)| *sub != id);
	}

	fn notification_seq(&self) -> u64 {
		self.inner.lock().seq
	}
}
