//! Cancelable inference requests.
//!
//! [`RequestCoordinator`] tracks every outstanding request of the process.
//! Callers keep one logical query in flight by always going through
//! cancel-then-wait-then-issue:
//!
//! ```ignore
//! coordinator.cancel_all_and_wait().await;
//! let pending = coordinator.issue(RequestScope::QueryDiff, request, &cancel);
//! match pending.outcome().await { ... }
//! ```
//!
//! The order is not enforced structurally, so every trigger site must keep it.
//!
//! Cancellation is cooperative. A canceled request resolves to
//! [`RequestOutcome::Canceled`] rather than an error, and
//! [`RequestCoordinator::cancel_all_and_wait`] only returns once every request
//! task dropped its transport future.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use diffmate_worker::{GenerationClock, TaskClass};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::InferenceError;
use crate::feedback::FeedbackRecord;
use crate::protocol::{InferenceRequest, InferenceResponse};
use crate::transport::InferenceTransport;

/// Which caller issued a request, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestScope {
	QueryDiff,
	QueryHighlight,
	EditChain,
}

impl RequestScope {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::QueryDiff => "query_diff",
			Self::QueryHighlight => "query_highlight",
			Self::EditChain => "edit_chain",
		}
	}
}

impl fmt::Display for RequestScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How a request ended.
#[derive(Debug)]
pub enum RequestOutcome {
	/// The service answered without a `detail` error.
	Completed(InferenceResponse),
	/// The cancellation token fired before the response was acted upon.
	Canceled,
	/// Transport failure or service-level error.
	Failed(InferenceError),
}

impl RequestOutcome {
	/// Returns the response for completed requests.
	pub fn completed(self) -> Option<InferenceResponse> {
		match self {
			Self::Completed(response) => Some(response),
			Self::Canceled | Self::Failed(_) => None,
		}
	}
}

struct InFlight {
	scope: RequestScope,
	cancel: CancellationToken,
}

struct Inner {
	transport: Arc<dyn InferenceTransport>,
	ids: GenerationClock,
	in_flight: Mutex<HashMap<u64, InFlight>>,
	/// Number of outstanding requests, published for waiters.
	outstanding: watch::Sender<usize>,
}

impl Inner {
	fn finish(&self, id: u64) {
		let mut in_flight = self.in_flight.lock();
		in_flight.remove(&id);
		self.outstanding.send_replace(in_flight.len());
	}
}

/// Process-wide registry of outstanding inference requests.
#[derive(Clone)]
pub struct RequestCoordinator {
	inner: Arc<Inner>,
}

impl fmt::Debug for RequestCoordinator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestCoordinator")
			.field("in_flight", &self.in_flight_count())
			.finish()
	}
}

impl RequestCoordinator {
	pub fn new(transport: Arc<dyn InferenceTransport>) -> Self {
		let (outstanding, _) = watch::channel(0);
		Self {
			inner: Arc::new(Inner {
				transport,
				ids: GenerationClock::new(),
				in_flight: Mutex::new(HashMap::new()),
				outstanding,
			}),
		}
	}

	/// Number of requests whose task has not finished yet.
	pub fn in_flight_count(&self) -> usize {
		self.inner.in_flight.lock().len()
	}

	/// Cancels every outstanding request and waits until all of them have
	/// released their transport.
	pub async fn cancel_all_and_wait(&self) {
		{
			let in_flight = self.inner.in_flight.lock();
			for (id, request) in in_flight.iter() {
				if !request.cancel.is_cancelled() {
					debug!(request = id, scope = %request.scope, "request.cancel");
					request.cancel.cancel();
				}
			}
		}
		self.wait_all().await;
	}

	/// Waits until no request is outstanding, without canceling anything.
	pub async fn wait_all(&self) {
		let mut outstanding = self.inner.outstanding.subscribe();
		// The sender lives in `inner`, which `self` keeps alive.
		let _ = outstanding.wait_for(|count| *count == 0).await;
	}

	/// Starts one request.
	///
	/// The returned handle resolves to [`RequestOutcome::Canceled`] if `cancel`
	/// fires before the response is available. The feedback candidate for this
	/// request is snapshotted here, at issue time.
	pub fn issue(
		&self,
		scope: RequestScope,
		request: InferenceRequest,
		cancel: &CancellationToken,
	) -> PendingRequest {
		let id = self.inner.ids.next();
		let cancel = cancel.clone();
		let feedback_candidate = FeedbackRecord::from_request(&request, Utc::now());

		{
			let mut in_flight = self.inner.in_flight.lock();
			in_flight.insert(
				id,
				InFlight {
					scope,
					cancel: cancel.clone(),
				},
			);
			self.inner.outstanding.send_replace(in_flight.len());
		}
		trace!(request = id, %scope, function = %request.function, "request.issue");

		let (tx, rx) = oneshot::channel();
		let inner = self.inner.clone();
		let token = cancel.clone();
		diffmate_worker::spawn(TaskClass::Interactive, async move {
			let outcome = tokio::select! {
				biased;
				_ = token.cancelled() => RequestOutcome::Canceled,
				result = inner.transport.send(&request) => classify(result.map_err(InferenceError::from)),
			};
			let outcome = if token.is_cancelled() {
				RequestOutcome::Canceled
			} else {
				outcome
			};
			match &outcome {
				RequestOutcome::Completed(_) => trace!(request = id, %scope, "request.completed"),
				RequestOutcome::Canceled => debug!(request = id, %scope, "request.canceled"),
				RequestOutcome::Failed(err) => warn!(request = id, %scope, error = %err, "request.failed"),
			}
			inner.finish(id);
			let _ = tx.send(outcome);
		});

		PendingRequest {
			id,
			scope,
			cancel,
			rx,
			feedback_candidate,
		}
	}
}

fn classify(result: Result<InferenceResponse, InferenceError>) -> RequestOutcome {
	match result {
		Ok(response) => match response.service_error() {
			Some(detail) => RequestOutcome::Failed(InferenceError::Service(detail.to_string())),
			None => RequestOutcome::Completed(response),
		},
		Err(err) => RequestOutcome::Failed(err),
	}
}

/// Handle of an issued request.
#[derive(Debug)]
pub struct PendingRequest {
	id: u64,
	scope: RequestScope,
	cancel: CancellationToken,
	rx: oneshot::Receiver<RequestOutcome>,
	feedback_candidate: FeedbackRecord,
}

impl PendingRequest {
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn scope(&self) -> RequestScope {
		self.scope
	}

	/// Request context captured at issue time.
	pub fn feedback_candidate(&self) -> &FeedbackRecord {
		&self.feedback_candidate
	}

	/// Suspends until the request ends.
	///
	/// A token canceled after the response arrived but before this call still
	/// yields [`RequestOutcome::Canceled`].
	pub async fn outcome(self) -> RequestOutcome {
		let outcome = self.rx.await.unwrap_or(RequestOutcome::Failed(InferenceError::Dropped));
		if self.cancel.is_cancelled() {
			return RequestOutcome::Canceled;
		}
		outcome
	}
}
