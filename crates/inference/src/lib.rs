//! Client side of the code-suggestion service.
//!
//! The network hop itself sits behind [`InferenceTransport`]. This crate owns
//! what surrounds it:
//! - [`protocol`]: request/response payloads as they travel on the wire.
//! - [`RequestCoordinator`]: cancelable requests with a cancel-then-wait
//!   primitive that callers use to keep a single query in flight.
//! - [`feedback`]: the request-context record that later receives the user's
//!   accept/reject verdict, and the [`FeedbackSink`] it is handed to.

use thiserror::Error;

pub mod coordinator;
pub mod feedback;
pub mod protocol;
pub mod transport;

pub use coordinator::{PendingRequest, RequestCoordinator, RequestOutcome, RequestScope};
pub use feedback::{FeedbackError, FeedbackRecord, FeedbackSink, MemoryFeedbackSink};
pub use protocol::{Choice, HighlightSpan, InferenceRequest, InferenceResponse, functions};
pub use transport::{InferenceTransport, TransportError};
pub use tokio_util::sync::CancellationToken;

/// Why a request produced no usable result.
#[derive(Debug, Error)]
pub enum InferenceError {
	/// The transport failed (network, auth, undecodable body).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The service answered with a non-empty `detail`.
	#[error("service error: {0}")]
	Service(String),
	/// The service answered without the payload the caller needs.
	#[error("malformed response: {0}")]
	Malformed(String),
	/// The request task went away without reporting an outcome.
	#[error("request task ended without an outcome")]
	Dropped,
}

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
