//! Pending animation shown while a diff request is outstanding.
//!
//! The animator polls: every tick it re-checks that the document is still in
//! the same [`Mode::DiffWait`] it was started for, and repaints otherwise
//! stops. It owns its decorations through a [`DecorationSet`], so they go
//! away whichever way the task ends, including abort.

use std::f64::consts::PI;
use std::sync::Arc;

use diffmate_primitives::{DecorationStyle, Range, Rgba};
use diffmate_worker::{ScopedTask, TaskClass};
use parking_lot::Mutex;
use tracing::trace;

use crate::config::AnimationConfig;
use crate::host::{DecorationSet, EditorHost};
use crate::state::EditorState;

const ALPHA: f32 = 0.3;

/// Colors cycled through by the animation, `size` of them.
pub fn palette(size: usize) -> Vec<Rgba> {
	let size = size.max(1);
	(0..size)
		.map(|c| {
			let phase = 2.0 * c as f64 / size as f64;
			let channel = |shift: f64| (255.0 * (phase * PI + shift).sin()).floor().max(100.0) as u8;
			Rgba::new(channel(PI), channel(3.0 * PI / 2.0), channel(PI / 2.0), ALPHA)
		})
		.collect()
}

/// Ranges painted at tick `t`, bucketed by palette index.
///
/// Each line of `region` is cut into cells of `chunk` chars; a cell's color
/// index is `(line + column + t) % buckets`.
pub fn frame(host: &dyn EditorHost, region: Range, buckets: usize, chunk: usize, t: usize) -> Vec<Vec<Range>> {
	let buckets = buckets.max(1);
	let chunk = chunk.max(1);
	let mut frame = vec![Vec::new(); buckets];
	for line in region.line_span() {
		let len = host.line_len(line);
		for column in (0..len).step_by(chunk) {
			let bucket = (line + column + t) % buckets;
			frame[bucket].push(Range::on_line(line, column, (column + chunk).min(len)));
		}
	}
	frame
}

/// Starts the animator for the wait entered at `generation`.
pub(crate) fn spawn(
	state: Arc<Mutex<EditorState>>,
	host: Arc<dyn EditorHost>,
	region: Range,
	generation: u64,
	config: AnimationConfig,
) -> ScopedTask {
	diffmate_worker::spawn_scoped(TaskClass::Timer, async move {
		{
			let mut st = state.lock();
			if !st.is_waiting(generation) {
				return;
			}
			st.clear_highlight();
		}
		let palette = palette(config.palette_size);
		let mut decorations = DecorationSet::new(host.clone());
		let mut t = 0;
		loop {
			tokio::time::sleep(config.tick()).await;
			{
				let st = state.lock();
				if !st.is_waiting(generation) {
					break;
				}
				decorations.dispose_all();
				let cells = frame(host.as_ref(), region, palette.len(), config.chunk_chars, t);
				for (color, ranges) in palette.iter().zip(cells) {
					if !ranges.is_empty() {
						decorations.create(&DecorationStyle::background(*color), &ranges);
					}
				}
			}
			t += 1;
		}
		trace!(%region, generation, ticks = t, "animation.stop");
	})
}
