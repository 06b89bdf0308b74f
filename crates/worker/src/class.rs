/// Execution classes used for task observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work that directly drives what the user sees: queries, presentation, event pumps.
	Interactive,
	/// Fixed-interval work such as the pending animation or debounce timers.
	Timer,
	/// Work that can lag behind the UI, e.g. feedback persistence.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Timer => "timer",
			Self::Background => "background",
		}
	}
}
