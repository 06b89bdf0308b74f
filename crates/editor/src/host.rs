//! The seam to the editor that owns the text buffer.
//!
//! The core never touches text or rendering directly. It reads the document,
//! applies edit batches, and creates/disposes decoration handles through
//! [`EditorHost`]. Selection and content notifications flow back over a
//! channel handed to [`EditorHost::subscribe`].

pub mod memory;

use std::fmt;
use std::sync::Arc;

use diffmate_primitives::{DecorationId, DecorationStyle, EditOp, Position, Range, UndoPolicy};
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryHost;

/// Errors reported by the host when applying edits.
#[derive(Debug, Error)]
pub enum HostError {
	/// The host refused the edit batch.
	#[error("edit rejected: {0}")]
	Rejected(String),
	/// The document is gone.
	#[error("document closed")]
	Closed,
}

/// Handle of a notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// What changed in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEventKind {
	/// The cursor or selection moved.
	SelectionChanged {
		cursor: Position,
		selection_empty: bool,
		is_mouse: bool,
	},
	/// The document text changed.
	ContentChanged,
}

/// A notification stamped with the host's sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
	/// Strictly increasing per host, see [`EditorHost::notification_seq`].
	pub seq: u64,
	pub kind: HostEventKind,
}

/// Sender half handed to the host on subscription.
pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;

/// Receiver half owned by the document's event pump.
pub type HostEventReceiver = mpsc::UnboundedReceiver<HostEvent>;

/// Capabilities the core consumes from the host editor, for one document view.
///
/// All methods are synchronous: an edit batch has settled, and its
/// notifications have been stamped, by the time [`EditorHost::apply_edits`]
/// returns.
pub trait EditorHost: Send + Sync + 'static {
	/// File name used as the key in request sources.
	fn file_name(&self) -> String;

	/// Full document text.
	fn text(&self) -> String;

	/// Number of lines, counting the empty line after a trailing newline.
	fn line_count(&self) -> usize;

	/// Length in chars of `line`, without its terminator. 0 past the end.
	fn line_len(&self, line: usize) -> usize;

	/// Char offset of a position, clamped to the document.
	fn offset_at(&self, pos: Position) -> usize;

	/// Position of a char offset, clamped to the document.
	fn position_at(&self, offset: usize) -> Position;

	/// Active cursor position.
	fn cursor(&self) -> Position;

	/// Current primary selection.
	fn selection(&self) -> Range;

	/// Moves the cursor, collapsing the selection.
	fn set_cursor(&self, pos: Position);

	/// Scrolls `range` into view.
	fn reveal(&self, range: Range);

	/// Applies an edit batch atomically.
	fn apply_edits(&self, edits: &[EditOp], undo: UndoPolicy) -> Result<(), HostError>;

	/// Creates a decoration handle covering `ranges`.
	fn create_decoration(&self, style: &DecorationStyle, ranges: &[Range]) -> DecorationId;

	/// Removes a decoration. Unknown ids are ignored.
	fn dispose_decoration(&self, id: DecorationId);

	/// Starts delivering notifications to `tx`.
	fn subscribe(&self, tx: HostEventSender) -> SubscriptionId;

	/// Stops delivering notifications for `id`.
	fn unsubscribe(&self, id: SubscriptionId);

	/// Sequence number of the most recent notification, 0 if none.
	fn notification_seq(&self) -> u64;
}

/// Decoration handles owned together and disposed together.
///
/// Dropping the set disposes every handle still in it.
pub struct DecorationSet {
	host: Arc<dyn EditorHost>,
	ids: Vec<DecorationId>,
}

impl fmt::Debug for DecorationSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DecorationSet").field("ids", &self.ids).finish()
	}
}

impl DecorationSet {
	pub fn new(host: Arc<dyn EditorHost>) -> Self {
		Self { host, ids: Vec::new() }
	}

	/// Creates a decoration and takes ownership of its handle.
	pub fn create(&mut self, style: &DecorationStyle, ranges: &[Range]) -> DecorationId {
		let id = self.host.create_decoration(style, ranges);
		self.ids.push(id);
		id
	}

	/// Disposes every owned handle.
	pub fn dispose_all(&mut self) {
		for id in self.ids.drain(..) {
			self.host.dispose_decoration(id);
		}
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn ids(&self) -> &[DecorationId] {
		&self.ids
	}
}

impl Drop for DecorationSet {
	fn drop(&mut self) {
		self.dispose_all();
	}
}
