//! Registry of open documents and the collaborators they share.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use diffmate_inference::{
	CancellationToken, FeedbackSink, InferenceRequest, InferenceTransport, PendingRequest, RequestCoordinator, RequestScope,
};
use diffmate_primitives::DocumentId;
use diffmate_worker::{GenerationClock, ScopedTask, TaskClass};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::diff_algo::{DiffAlgorithm, SimilarDiff};
use crate::host::{EditorHost, SubscriptionId};
use crate::session::DocumentSession;

/// Collaborators and process-wide state shared by every document.
pub(crate) struct Shared {
	pub(crate) config: Config,
	intent: RwLock<String>,
	pub(crate) coordinator: RequestCoordinator,
	pub(crate) diff: Arc<dyn DiffAlgorithm>,
	pub(crate) feedback: Arc<dyn FeedbackSink>,
	/// One generation per query trigger, across all documents.
	triggers: GenerationClock,
	/// Serializes taking a trigger generation against check-and-issue.
	gate: Mutex<()>,
}

impl Shared {
	pub(crate) fn intent(&self) -> String {
		self.intent.read().clone()
	}

	/// Starts a new trigger; every older trigger becomes stale.
	pub(crate) fn take_ticket(&self) -> u64 {
		let _gate = self.gate.lock();
		self.triggers.next()
	}

	pub(crate) fn is_current(&self, ticket: u64) -> bool {
		self.triggers.is_current(ticket)
	}

	/// Issues `request` unless a newer trigger started since `ticket` was taken.
	///
	/// A newer trigger either made the check fail or will find this request in
	/// the coordinator when it cancels, so two triggers never both stay in flight.
	pub(crate) fn issue_if_current(
		&self,
		ticket: u64,
		scope: RequestScope,
		request: InferenceRequest,
		cancel: &CancellationToken,
	) -> Option<PendingRequest> {
		let _gate = self.gate.lock();
		if !self.triggers.is_current(ticket) {
			return None;
		}
		Some(self.coordinator.issue(scope, request, cancel))
	}
}

struct Entry {
	session: DocumentSession,
	subscription: SubscriptionId,
	_pump: ScopedTask,
}

/// Owns one [`DocumentSession`] per open document view.
///
/// [`Engine::open`] is the creation hook (first interaction), [`Engine::close`]
/// the disposal hook (view closed).
pub struct Engine {
	shared: Arc<Shared>,
	documents: Mutex<HashMap<DocumentId, Entry>>,
}

impl fmt::Debug for Engine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("documents", &self.document_count())
			.field("coordinator", &self.shared.coordinator)
			.finish()
	}
}

impl Engine {
	pub fn new(config: Config, transport: Arc<dyn InferenceTransport>, feedback: Arc<dyn FeedbackSink>) -> Self {
		Self::with_diff_algorithm(config, transport, feedback, Arc::new(SimilarDiff))
	}

	pub fn with_diff_algorithm(
		config: Config,
		transport: Arc<dyn InferenceTransport>,
		feedback: Arc<dyn FeedbackSink>,
		diff: Arc<dyn DiffAlgorithm>,
	) -> Self {
		let intent = RwLock::new(config.intent.clone());
		Self {
			shared: Arc::new(Shared {
				config,
				intent,
				coordinator: RequestCoordinator::new(transport),
				diff,
				feedback,
				triggers: GenerationClock::new(),
				gate: Mutex::new(()),
			}),
			documents: Mutex::new(HashMap::new()),
		}
	}

	/// Returns the session of `id`, creating it on first use.
	///
	/// Creation subscribes to the host's notifications and starts the event
	/// pump; both live exactly as long as the session stays registered.
	/// Must be called from within a tokio runtime.
	pub fn open(&self, id: DocumentId, host: Arc<dyn EditorHost>) -> DocumentSession {
		let mut documents = self.documents.lock();
		if let Some(entry) = documents.get(&id) {
			return entry.session.clone();
		}
		let session = DocumentSession::new(id, host.clone(), self.shared.clone());
		let (tx, mut rx) = mpsc::unbounded_channel();
		let subscription = host.subscribe(tx);
		let pump_session = session.clone();
		let pump = diffmate_worker::spawn_scoped(TaskClass::Background, async move {
			while let Some(event) = rx.recv().await {
				pump_session.handle_event(event);
			}
			debug!(doc = %pump_session.id(), "events.closed");
		});
		info!(doc = %id, file = %host.file_name(), "document.open");
		documents.insert(
			id,
			Entry {
				session: session.clone(),
				subscription,
				_pump: pump,
			},
		);
		session
	}

	pub fn session(&self, id: DocumentId) -> Option<DocumentSession> {
		self.documents.lock().get(&id).map(|entry| entry.session.clone())
	}

	/// Disposes the session of `id`: stops the pump, unsubscribes, rolls back
	/// any presented diff and drops every decoration.
	pub fn close(&self, id: DocumentId) -> bool {
		let Some(entry) = self.documents.lock().remove(&id) else {
			return false;
		};
		entry.session.host().unsubscribe(entry.subscription);
		entry.session.shutdown();
		info!(doc = %id, "document.close");
		true
	}

	pub fn document_count(&self) -> usize {
		self.documents.lock().len()
	}

	/// Session-wide intent sent with every request.
	pub fn intent(&self) -> String {
		self.shared.intent()
	}

	pub fn set_intent(&self, intent: impl Into<String>) {
		let intent = intent.into();
		debug!(%intent, "intent.set");
		*self.shared.intent.write() = intent;
	}

	pub fn config(&self) -> &Config {
		&self.shared.config
	}

	pub fn coordinator(&self) -> &RequestCoordinator {
		&self.shared.coordinator
	}

	/// Cancels every outstanding request and waits for them to wind down.
	pub async fn cancel_all(&self) {
		self.shared.coordinator.cancel_all_and_wait().await;
	}
}

impl Drop for Engine {
	fn drop(&mut self) {
		for (_, entry) in self.documents.get_mut().drain() {
			entry.session.host().unsubscribe(entry.subscription);
			entry.session.shutdown();
		}
	}
}
