//! Host notifications: cursor navigation and user edits.

use diffmate_inference::functions::DIFF_AT_CURSOR;
use diffmate_primitives::Position;
use diffmate_worker::TaskClass;
use tracing::trace;

use crate::host::{HostEvent, HostEventKind};
use crate::session::DocumentSession;
use crate::state::Mode;

impl DocumentSession {
	/// Handles one notification from the document's subscription.
	///
	/// Notifications caused by our own edits are dropped.
	pub(crate) fn handle_event(&self, event: HostEvent) {
		let mut st = self.state.lock();
		if st.closed {
			return;
		}
		if st.diff_changing_doc || st.is_suppressed(event.seq) {
			trace!(doc = %self.id, seq = event.seq, "event.suppressed");
			return;
		}
		match event.kind {
			HostEventKind::SelectionChanged {
				cursor,
				selection_empty,
				is_mouse,
			} => {
				drop(st);
				self.on_cursor_moved(cursor, is_mouse, selection_empty);
			}
			HostEventKind::ContentChanged => {
				trace!(doc = %self.id, seq = event.seq, mode = %st.mode, "event.user_edit");
				st.cleanup_edit_chain();
				if st.mode == Mode::Diff {
					st.hands_off();
				}
			}
		}
	}

	/// Cursor navigation.
	///
	/// Entering a sensitive range queries a diff for it after the navigation
	/// debounce (none for pointer clicks), unless the cursor moved again
	/// meanwhile. A non-empty selection means the user took over.
	pub fn on_cursor_moved(&self, pos: Position, is_mouse: bool, selection_empty: bool) {
		let target = {
			let mut st = self.state.lock();
			if st.closed {
				return;
			}
			st.nav_generation += 1;
			let nav = st.nav_generation;
			let target = st
				.sensitive_ranges
				.iter()
				.find(|sensitive| sensitive.range.contains(pos))
				.map(|sensitive| (sensitive.range, nav));
			if !selection_empty && !st.diff_changing_doc {
				st.hands_off();
			}
			target
		};
		let Some((range, nav)) = target else {
			return;
		};
		let delay = self.shared.config.navigation.debounce(is_mouse);
		let session = self.clone();
		diffmate_worker::spawn(TaskClass::Timer, async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			let current = session.state.lock().nav_generation;
			if current != nav {
				trace!(doc = %session.id, nav, current, "navigation.debounced");
				return;
			}
			session.query_diff(range, DIFF_AT_CURSOR).await;
		});
	}
}
