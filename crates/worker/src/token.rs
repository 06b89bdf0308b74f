use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation clock.
///
/// Clones share the same counter. Generation 0 is never handed out, so it can
/// stand for "nothing issued yet".
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the most recently issued generation, 0 if none.
	pub fn current(&self) -> u64 {
		self.next.load(Ordering::Acquire)
	}

	/// Returns true if `generation` is still the latest one issued.
	pub fn is_current(&self, generation: u64) -> bool {
		self.current() == generation
	}
}
