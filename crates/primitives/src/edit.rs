//! Buffer edit operations.

use crate::range::{Position, Range};

/// Whether an applied edit batch creates an undo checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoPolicy {
	/// The batch merges into the surrounding undo step.
	#[default]
	NoCheckpoint,
	/// The batch closes an undo step once applied.
	Checkpoint,
}

/// A single operation inside an atomic edit batch.
///
/// All positions in one batch refer to the document as it was before the
/// batch started. Hosts clamp positions past the end of the document to the
/// end. Insertions at the same position land in batch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
	/// Insert `text` at `at`.
	Insert { at: Position, text: String },
	/// Delete the text covered by `range`.
	Delete { range: Range },
}

impl EditOp {
	/// Inserts `text` at the start of `line`.
	pub fn insert_lines(line: usize, text: impl Into<String>) -> Self {
		Self::Insert {
			at: Position::line_start(line),
			text: text.into(),
		}
	}

	/// Deletes `line` including its line terminator.
	pub fn delete_line(line: usize) -> Self {
		Self::Delete {
			range: Range::lines(line, line + 1),
		}
	}

	/// Position at which the operation starts.
	pub fn start(&self) -> Position {
		match self {
			Self::Insert { at, .. } => *at,
			Self::Delete { range } => range.start,
		}
	}
}
