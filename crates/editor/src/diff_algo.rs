//! Line and character diffing used by the presenter.

use similar::{ChangeTag, TextDiff};

/// Kind of a diff span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanTag {
	Equal,
	Removed,
	Added,
}

/// A maximal run of text sharing one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSpan {
	pub tag: SpanTag,
	pub text: String,
}

impl DiffSpan {
	pub fn new(tag: SpanTag, text: impl Into<String>) -> Self {
		Self { tag, text: text.into() }
	}

	/// Number of `\n` terminated lines in the span.
	pub fn line_count(&self) -> usize {
		self.text.matches('\n').count()
	}
}

/// Produces ordered {equal, removed, added} spans between two texts.
///
/// Within a changed region removed spans come before added spans, and no two
/// adjacent spans share a tag.
pub trait DiffAlgorithm: Send + Sync + 'static {
	/// Line-granular diff; span texts keep their line terminators.
	fn diff_lines(&self, old: &str, new: &str) -> Vec<DiffSpan>;

	/// Character-granular diff.
	fn diff_chars(&self, old: &str, new: &str) -> Vec<DiffSpan>;
}

/// [`DiffAlgorithm`] backed by the `similar` crate (Myers).
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarDiff;

impl DiffAlgorithm for SimilarDiff {
	fn diff_lines(&self, old: &str, new: &str) -> Vec<DiffSpan> {
		collect_spans(&TextDiff::from_lines(old, new))
	}

	fn diff_chars(&self, old: &str, new: &str) -> Vec<DiffSpan> {
		collect_spans(&TextDiff::from_chars(old, new))
	}
}

fn collect_spans<'a>(diff: &TextDiff<'a, 'a, 'a, str>) -> Vec<DiffSpan> {
	let mut spans: Vec<DiffSpan> = Vec::new();
	for change in diff.iter_all_changes() {
		let tag = match change.tag() {
			ChangeTag::Equal => SpanTag::Equal,
			ChangeTag::Delete => SpanTag::Removed,
			ChangeTag::Insert => SpanTag::Added,
		};
		match spans.last_mut() {
			Some(last) if last.tag == tag => last.text.push_str(change.value()),
			_ => spans.push(DiffSpan::new(tag, change.value())),
		}
	}
	spans
}
