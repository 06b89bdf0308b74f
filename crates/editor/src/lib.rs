#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Interactive diff core.
//!
//! Mediates between an open text buffer and the code-suggestion service:
//! requests an edit for a region, shows it in place as a line and character
//! diff, and lets the user accept, reject, re-query or chain it, while
//! requests may be in flight, canceled or superseded.
//!
//! # Main Types
//!
//! - [`Engine`] - one [`DocumentSession`] per open document, plus the shared
//!   request coordinator, diff algorithm and feedback sink
//! - [`DocumentSession`] - the operations on one document
//! - [`EditorHost`] - what the core needs from the editor that owns the buffer
//!
//! # Modes
//!
//! ```text
//! Normal ──highlight──▶ Highlight ──cursor enters range──▶ DiffWait
//!   │                                                        │  ▲
//!   └───────────────────────query_diff──────────────────────▶│  │ re-query / chain
//!                                                            ▼  │
//! Normal ◀──accept / reject / failure / cancel──────────────  Diff
//! ```
//!
//! At most one request is in flight per process: every trigger cancels and
//! waits for the previous one before issuing its own.

pub mod animation;
pub mod config;
pub mod diff_algo;
mod edit_chain;
mod engine;
mod events;
pub mod highlight;
pub mod host;
pub mod presenter;
mod query;
mod session;
pub mod state;
mod verdict;

pub use config::{Config, ConfigError};
pub use diff_algo::{DiffAlgorithm, DiffSpan, SimilarDiff, SpanTag};
pub use engine::Engine;
pub use host::{DecorationSet, EditorHost, HostError, HostEvent, HostEventKind, MemoryHost};
pub use presenter::DiffPlan;
pub use query::QueryOutcome;
pub use session::DocumentSession;
pub use state::{Mode, SensitiveRange, StateSnapshot};
