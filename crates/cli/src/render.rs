//! Plain-text rendering of a presented diff.

use std::fmt::Write;

/// Renders `combined` with one marker column: `+` added, `-` awaiting deletion.
pub fn annotate(combined: &str, added: &[usize], deleted: &[usize]) -> String {
	let mut out = String::new();
	for (line, text) in combined.lines().enumerate() {
		let marker = if added.contains(&line) {
			'+'
		} else if deleted.contains(&line) {
			'-'
		} else {
			' '
		};
		let _ = writeln!(out, "{marker} {:>4} {text}", line + 1);
	}
	out
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn marks_added_and_deleted_lines() {
		let rendered = annotate("def f():\n    pass\n    return 1\n", &[2], &[1]);
		assert_eq!(
			rendered,
			"     1 def f():\n-    2     pass\n+    3     return 1\n"
		);
	}
}
