use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(1)
			.thread_name("diffmate-worker-global")
			.build()
			.expect("failed to build diffmate-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task tagged with a task class.
///
/// Uses the ambient tokio runtime when there is one, so tests driven by a
/// paused current-thread runtime keep control over every spawned task.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns a task whose lifetime is bound to the returned guard.
pub fn spawn_scoped<F>(class: TaskClass, fut: F) -> ScopedTask
where
	F: Future<Output = ()> + Send + 'static,
{
	ScopedTask {
		class,
		handle: spawn(class, fut),
	}
}

/// A spawned task that is aborted when dropped.
#[derive(Debug)]
pub struct ScopedTask {
	class: TaskClass,
	handle: JoinHandle<()>,
}

impl ScopedTask {
	/// Returns true once the task has run to completion or was aborted.
	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Aborts the task now.
	pub fn abort(&self) {
		self.handle.abort();
	}
}

impl Drop for ScopedTask {
	fn drop(&mut self) {
		if !self.handle.is_finished() {
			tracing::trace!(worker_class = self.class.as_str(), "worker.scoped.abort");
			self.handle.abort();
		}
	}
}
