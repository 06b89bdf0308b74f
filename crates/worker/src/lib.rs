//! Task primitives shared by diffmate: classified spawning, scoped tasks that
//! die with their owner, and generation clocks for stale-work detection.

mod class;
mod spawn;
mod token;

pub use class::TaskClass;
pub use spawn::{ScopedTask, spawn, spawn_scoped};
pub use token::GenerationClock;
