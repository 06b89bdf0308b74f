use std::cmp::Ordering;
use std::fmt;

/// A position in a text buffer, in line/column coordinates.
///
/// Both fields are zero-based. Columns count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
	/// Zero-based line index.
	pub line: usize,
	/// Zero-based character offset in the line.
	pub column: usize,
}

impl Position {
	/// Creates a new position.
	pub const fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}

	/// Creates a position at the start of `line`.
	pub const fn line_start(line: usize) -> Self {
		Self { line, column: 0 }
	}
}

impl PartialOrd for Position {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Position {
	fn cmp(&self, other: &Self) -> Ordering {
		self.line.cmp(&other.line).then(self.column.cmp(&other.column))
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// An ordered range between two positions.
///
/// `start <= end` always holds; [`Range::new`] swaps reversed inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
	/// Start position (inclusive).
	pub start: Position,
	/// End position.
	pub end: Position,
}

impl Range {
	/// Creates a range, ordering the endpoints.
	pub fn new(a: Position, b: Position) -> Self {
		if b < a { Self { start: b, end: a } } else { Self { start: a, end: b } }
	}

	/// Creates a zero-length range at a position.
	pub const fn point(pos: Position) -> Self {
		Self { start: pos, end: pos }
	}

	/// Range covering whole lines `first..=last`, anchored at column 0 on both ends.
	///
	/// This is the shape used for whole-line decorations.
	pub fn lines(first: usize, last: usize) -> Self {
		Self::new(Position::line_start(first), Position::line_start(last))
	}

	/// Range on a single line between two columns.
	pub fn on_line(line: usize, from: usize, to: usize) -> Self {
		Self::new(Position::new(line, from), Position::new(line, to))
	}

	/// Returns true when start equals end.
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true when `pos` lies within the range, both ends inclusive.
	pub fn contains(&self, pos: Position) -> bool {
		self.start <= pos && pos <= self.end
	}

	/// Iterates the line indices touched by the range.
	pub fn line_span(&self) -> std::ops::RangeInclusive<usize> {
		self.start.line..=self.end.line
	}
}

impl fmt::Display for Range {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.start, self.end)
	}
}

#[cfg(test)]
mod tests;
