//! Core types shared by the diffmate crates: line/column positions, ranges,
//! buffer edit operations and decoration styles.

/// Buffer edit operations and undo policy.
pub mod edit;
/// Identifier types for documents and decorations.
pub mod ids;
/// Line/column positions and ranges.
pub mod range;
/// Colors and decoration styles.
pub mod style;

pub use edit::{EditOp, UndoPolicy};
pub use ids::{DecorationId, DocumentId};
pub use range::{Position, Range};
pub use style::{DecorationStyle, GutterIcon, Rgba};
