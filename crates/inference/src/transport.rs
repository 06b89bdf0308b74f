//! The seam to the network.

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{InferenceRequest, InferenceResponse};

/// Transport-level failures. All of them mean "no result".
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("network error: {0}")]
	Network(String),
	#[error("not logged in: {0}")]
	Unauthorized(String),
	#[error("undecodable response: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Sends one request to the inference service.
///
/// Implementations must tolerate the returned future being dropped midway:
/// the coordinator drops it when the request is canceled, and treats the drop
/// as the transport's acknowledgment of the cancellation.
#[async_trait]
pub trait InferenceTransport: Send + Sync + 'static {
	async fn send(&self, request: &InferenceRequest) -> Result<InferenceResponse, TransportError>;
}
