//! Handle to one document's state.

use std::fmt;
use std::sync::Arc;

use diffmate_primitives::DocumentId;
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::Shared;
use crate::host::EditorHost;
use crate::state::{EditorState, Mode, StateSnapshot};

/// Cloneable handle to the state of one open document.
///
/// Every operation locks the state only between suspension points, so
/// operations on the same document interleave cooperatively; the mode and
/// wait generation are re-checked after each await.
#[derive(Clone)]
pub struct DocumentSession {
	pub(crate) id: DocumentId,
	pub(crate) host: Arc<dyn EditorHost>,
	pub(crate) state: Arc<Mutex<EditorState>>,
	pub(crate) shared: Arc<Shared>,
}

impl fmt::Debug for DocumentSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentSession")
			.field("id", &self.id)
			.field("state", &*self.state.lock())
			.finish()
	}
}

impl DocumentSession {
	pub(crate) fn new(id: DocumentId, host: Arc<dyn EditorHost>, shared: Arc<Shared>) -> Self {
		Self {
			id,
			state: Arc::new(Mutex::new(EditorState::new(id, host.clone()))),
			host,
			shared,
		}
	}

	pub fn id(&self) -> DocumentId {
		self.id
	}

	pub fn host(&self) -> &Arc<dyn EditorHost> {
		&self.host
	}

	pub fn mode(&self) -> Mode {
		self.state.lock().mode
	}

	pub fn snapshot(&self) -> StateSnapshot {
		self.state.lock().snapshot()
	}

	/// Returns to [`Mode::Normal`], rolling back a presented diff without a verdict.
	pub fn back_to_normal(&self) {
		self.state.lock().back_to_normal();
	}

	/// Disposes diff decorations and clears the line lists, leaving text and mode alone.
	pub fn remove_decorations(&self) {
		self.state.lock().remove_decorations();
	}

	/// Tears the state down when the view closes.
	pub(crate) fn shutdown(&self) {
		let mut st = self.state.lock();
		st.back_to_normal();
		st.clear_highlight();
		st.highlight_backup = None;
		st.reset_feedback();
		st.closed = true;
		debug!(doc = %self.id, "session.shutdown");
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.state.lock().closed
	}
}
