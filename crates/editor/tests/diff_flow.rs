#![allow(unused_crate_dependencies)]

//! End-to-end flows through [`Engine`] with an in-memory host and a scripted service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use diffmate_editor::{Config, DocumentSession, EditorHost, Engine, MemoryHost, Mode, QueryOutcome, SensitiveRange};
use diffmate_inference::functions::{DIFF_AT_CURSOR, EDIT_CHAIN, HIGHLIGHT};
use diffmate_inference::{
	HighlightSpan, InferenceRequest, InferenceResponse, InferenceTransport, MemoryFeedbackSink, TransportError,
};
use diffmate_primitives::{DocumentId, Position, Range};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

const FILE: &str = "a.py";
const ORIGINAL: &str = "def f():\n    pass\n";
const FIXED: &str = "def f():\n    return 1\n";

enum Reply {
	After(Duration, InferenceResponse),
	Fail,
}

fn diff_reply(ms: u64, text: &str) -> Reply {
	Reply::After(Duration::from_millis(ms), InferenceResponse::with_file(FILE, text))
}

fn highlight_reply(spans: Vec<HighlightSpan>) -> Reply {
	Reply::After(
		Duration::from_millis(20),
		InferenceResponse {
			highlight: Some(spans),
			..InferenceResponse::default()
		},
	)
}

/// Answers requests from a script, in call order.
#[derive(Default)]
struct ScriptedTransport {
	replies: Mutex<VecDeque<Reply>>,
	requests: Mutex<Vec<InferenceRequest>>,
	active: AtomicUsize,
	max_active: AtomicUsize,
}

impl ScriptedTransport {
	fn push(&self, reply: Reply) {
		self.replies.lock().push_back(reply);
	}

	fn requests(&self) -> Vec<InferenceRequest> {
		self.requests.lock().clone()
	}
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

#[async_trait]
impl InferenceTransport for ScriptedTransport {
	async fn send(&self, request: &InferenceRequest) -> Result<InferenceResponse, TransportError> {
		self.requests.lock().push(request.clone());
		let reply = self.replies.lock().pop_front();
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_active.fetch_max(now, Ordering::SeqCst);
		let _guard = ActiveGuard(&self.active);
		match reply {
			Some(Reply::After(delay, response)) => {
				tokio::time::sleep(delay).await;
				Ok(response)
			}
			Some(Reply::Fail) => Err(TransportError::Network("connection reset".into())),
			None => Ok(InferenceResponse {
				detail: Some("no scripted reply".into()),
				..InferenceResponse::default()
			}),
		}
	}
}

struct Harness {
	engine: Engine,
	host: Arc<MemoryHost>,
	session: DocumentSession,
	transport: Arc<ScriptedTransport>,
	sink: Arc<MemoryFeedbackSink>,
}

fn harness(text: &str, replies: Vec<Reply>) -> Harness {
	let _ = tracing_subscriber::fmt::try_init();
	let transport = Arc::new(ScriptedTransport::default());
	for reply in replies {
		transport.push(reply);
	}
	let sink = Arc::new(MemoryFeedbackSink::new());
	let engine = Engine::new(Config::default(), transport.clone(), sink.clone());
	let host = Arc::new(MemoryHost::new(FILE, text));
	let session = engine.open(DocumentId(1), host.clone());
	Harness {
		engine,
		host,
		session,
		transport,
		sink,
	}
}

/// Lets spawned tasks (event pump, aborted animators) run.
async fn settle() {
	tokio::time::sleep(Duration::from_millis(1)).await;
}

fn spawn_query(session: &DocumentSession, region: Range) -> tokio::task::JoinHandle<QueryOutcome> {
	let session = session.clone();
	tokio::spawn(async move { session.query_diff(region, DIFF_AT_CURSOR).await })
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn query_present_accept() {
	let h = harness(ORIGINAL, vec![diff_reply(250, FIXED)]);
	let task = spawn_query(&h.session, Range::lines(1, 1));

	tokio::time::sleep(Duration::from_millis(150)).await;
	assert_eq!(h.session.mode(), Mode::DiffWait);
	assert!(h.session.snapshot().animating);
	assert!(h.host.decoration_count() > 0);

	assert_eq!(task.await.unwrap(), QueryOutcome::Presented);
	settle().await;
	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Diff);
	assert_eq!(h.host.text(), "def f():\n    pass\n    return 1\n");
	assert_eq!(snapshot.diff_deleted_lines, vec![1]);
	assert_eq!(snapshot.diff_added_lines, vec![2]);
	assert_eq!(snapshot.diff_decorations, 4);
	assert_eq!(h.host.decoration_count(), 4);
	assert_eq!(snapshot.diff_lens_pos, Some(1));
	assert_eq!(snapshot.showing_diff_for_function.as_deref(), Some(DIFF_AT_CURSOR));

	let requests = h.transport.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].function, DIFF_AT_CURSOR);
	assert_eq!(requests[0].cursor_start, 9);
	assert_eq!(requests[0].cursor_end, 9);
	assert_eq!(requests[0].max_edits, 1);
	assert_eq!(requests[0].max_tokens, 550);
	assert_eq!(requests[0].intent, "Fix");
	assert_eq!(requests[0].sources.get(FILE).map(String::as_str), Some(ORIGINAL));

	assert!(h.session.accept().await);
	settle().await;
	assert_eq!(h.host.text(), FIXED);
	assert_eq!(h.host.undo_checkpoints(), 1);
	assert_eq!(h.host.decoration_count(), 0);
	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Normal);
	assert_eq!(snapshot.diff_lens_pos, None);
	assert!(snapshot.data_feedback_candidate.is_empty());

	let records = h.sink.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].positive, Some(true));
	assert_eq!(records[0].function, DIFF_AT_CURSOR);
	assert_eq!(records[0].cursor_pos0, 9);
	assert_eq!(records[0].results.get(FILE).map(String::as_str), Some(FIXED));

	// Nothing left to reject or accept.
	assert!(!h.session.reject().await);
	assert!(!h.session.accept().await);
	assert_eq!(h.host.text(), FIXED);
	assert_eq!(h.sink.records().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reject_restores_buffer() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED)]);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Presented
	);

	assert!(h.session.reject().await);
	settle().await;
	assert_eq!(h.host.text(), ORIGINAL);
	assert_eq!(h.host.undo_checkpoints(), 0);
	assert_eq!(h.host.decoration_count(), 0);
	assert_eq!(h.session.mode(), Mode::Normal);

	let snapshot = h.session.snapshot();
	h.session.remove_decorations();
	assert_eq!(h.session.snapshot(), snapshot);

	let records = h.sink.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].positive, Some(false));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accepting_a_pure_insertion_still_closes_an_undo_step() {
	let h = harness("a\n", vec![diff_reply(10, "a\nb\n")]);
	assert_eq!(
		h.session.query_diff(Range::lines(0, 0), DIFF_AT_CURSOR).await,
		QueryOutcome::Presented
	);
	assert!(h.session.snapshot().diff_deleted_lines.is_empty());

	assert!(h.session.accept().await);
	settle().await;
	assert_eq!(h.host.text(), "a\nb\n");
	assert_eq!(h.host.undo_checkpoints(), 1);
	assert_eq!(h.session.mode(), Mode::Normal);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dismissed_highlight_is_not_rerun_after_accept() {
	let h = harness(
		ORIGINAL,
		vec![
			highlight_reply(vec![HighlightSpan(9, 17, 0.8)]),
			diff_reply(50, FIXED),
		],
	);
	assert_eq!(h.session.query_highlight().await, QueryOutcome::Highlighted);
	h.session.clear_highlight();
	assert_eq!(h.session.mode(), Mode::Normal);

	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Presented
	);
	assert!(h.session.accept().await);
	tokio::time::sleep(Duration::from_secs(1)).await;

	let functions: Vec<String> = h.transport.requests().into_iter().map(|r| r.function).collect();
	assert_eq!(functions, vec![HIGHLIGHT.to_string(), DIFF_AT_CURSOR.to_string()]);
	assert_eq!(h.session.mode(), Mode::Normal);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rejected_diff_forgets_the_highlight_it_came_from() {
	let h = harness(
		ORIGINAL,
		vec![
			highlight_reply(vec![HighlightSpan(9, 17, 0.8)]),
			diff_reply(50, FIXED),
			diff_reply(50, FIXED),
		],
	);
	assert_eq!(h.session.query_highlight().await, QueryOutcome::Highlighted);
	h.host.move_cursor(Position::new(1, 2), true);
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(h.session.mode(), Mode::Diff);
	assert!(h.session.reject().await);
	settle().await;
	assert_eq!(h.host.text(), ORIGINAL);

	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Presented
	);
	assert!(h.session.accept().await);
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(h.transport.requests().len(), 3);
	assert_eq!(h.session.mode(), Mode::Normal);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cancel_mid_request_returns_to_normal() {
	let h = harness(ORIGINAL, vec![diff_reply(5_000, FIXED)]);
	let task = spawn_query(&h.session, Range::lines(1, 1));
	tokio::time::sleep(Duration::from_millis(250)).await;
	assert_eq!(h.session.mode(), Mode::DiffWait);

	h.engine.cancel_all().await;
	assert_eq!(task.await.unwrap(), QueryOutcome::Canceled);
	settle().await;
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(h.host.decoration_count(), 0);
	assert_eq!(h.host.text(), ORIGINAL);
	assert!(!h.session.snapshot().animating);
	assert!(h.sink.records().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn newer_trigger_supersedes_older() {
	let h = harness(ORIGINAL, vec![diff_reply(500, "def f():\n    a\n"), diff_reply(100, "def f():\n    b\n")]);
	let first = spawn_query(&h.session, Range::lines(1, 1));
	tokio::time::sleep(Duration::from_millis(50)).await;
	let second = spawn_query(&h.session, Range::lines(0, 1));

	let first = first.await.unwrap();
	assert!(matches!(first, QueryOutcome::Canceled | QueryOutcome::Superseded), "{first:?}");
	assert_eq!(second.await.unwrap(), QueryOutcome::Presented);
	settle().await;
	assert_eq!(h.host.text(), "def f():\n    pass\n    b\n");
	assert_eq!(h.host.decoration_count(), 4);
	assert_eq!(h.transport.max_active.load(Ordering::SeqCst), 1);
	assert_eq!(h.engine.coordinator().in_flight_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn burst_of_triggers_keeps_one_request_in_flight() {
	let replies = (0..5).map(|i| diff_reply(100, &format!("def f():\n    return {i}\n"))).collect();
	let h = harness(ORIGINAL, replies);
	let tasks: Vec<_> = (0..5).map(|_| spawn_query(&h.session, Range::lines(1, 1))).collect();

	let mut presented = 0;
	for task in tasks {
		match task.await.unwrap() {
			QueryOutcome::Presented => presented += 1,
			QueryOutcome::Canceled | QueryOutcome::Superseded => {}
			other => panic!("unexpected outcome {other:?}"),
		}
	}
	assert_eq!(presented, 1);
	assert_eq!(h.transport.max_active.load(Ordering::SeqCst), 1);
	assert_eq!(h.session.mode(), Mode::Diff);
	settle().await;
	assert_eq!(h.host.decoration_count(), 4);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn service_error_is_not_presented() {
	let error = InferenceResponse {
		detail: Some("rate limited".into()),
		..InferenceResponse::default()
	};
	let h = harness(ORIGINAL, vec![Reply::After(Duration::from_millis(10), error)]);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Failed
	);
	settle().await;
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(h.host.text(), ORIGINAL);
	assert_eq!(h.host.decoration_count(), 0);
	assert!(h.session.snapshot().data_feedback_candidate.is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn missing_file_key_is_a_service_error() {
	let h = harness(
		ORIGINAL,
		vec![Reply::After(
			Duration::from_millis(10),
			InferenceResponse::with_file("other.py", FIXED),
		)],
	);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Failed
	);
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(h.host.text(), ORIGINAL);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn transport_failure_is_not_presented() {
	let h = harness(ORIGINAL, vec![Reply::Fail]);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Failed
	);
	settle().await;
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(h.host.decoration_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn identical_replacement_renders_empty_overlay() {
	let h = harness(ORIGINAL, vec![diff_reply(10, ORIGINAL)]);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Presented
	);
	settle().await;
	assert_eq!(h.host.text(), ORIGINAL);
	assert_eq!(h.host.decoration_count(), 4);
	assert!(h.host.decorations().iter().all(|d| d.ranges.is_empty()));
	assert_eq!(h.host.revealed(), None);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn highlight_then_keyboard_entry_queries_diff() {
	// "    pass" is chars 9..17.
	let h = harness(
		ORIGINAL,
		vec![
			highlight_reply(vec![HighlightSpan(9, 17, 0.8)]),
			diff_reply(50, FIXED),
			highlight_reply(vec![HighlightSpan(9, 21, 0.4)]),
		],
	);
	assert_eq!(h.session.query_highlight().await, QueryOutcome::Highlighted);
	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Highlight);
	assert_eq!(snapshot.sensitive_ranges.len(), 1);
	assert_eq!(
		snapshot.sensitive_ranges[0].range,
		Range::new(Position::new(1, 0), Position::new(1, 8))
	);
	assert_eq!(snapshot.highlight_decorations, 1);
	let highlight_request = &h.transport.requests()[0];
	assert_eq!(highlight_request.function, HIGHLIGHT);
	assert_eq!(highlight_request.max_tokens, 0);

	h.host.move_cursor(Position::new(1, 2), false);
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(h.session.mode(), Mode::Highlight);

	tokio::time::sleep(Duration::from_secs(1)).await;
	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Diff);
	assert!(snapshot.sensitive_ranges.is_empty());
	assert_eq!(snapshot.highlight_decorations, 0);
	assert_eq!(snapshot.showing_diff_for_range, Some(Range::new(Position::new(1, 0), Position::new(1, 8))));

	// Accepting goes back into a fresh highlight pass.
	assert!(h.session.accept().await);
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(h.host.text(), FIXED);
	assert_eq!(h.session.mode(), Mode::Highlight);
	assert_eq!(h.transport.requests().len(), 3);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn keyboard_debounce_drops_passing_moves() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED)]);
	h.session.mark_sensitive(vec![SensitiveRange {
		range: Range::on_line(1, 0, 8),
		weight: 0.5,
	}]);
	h.host.move_cursor(Position::new(1, 3), false);
	tokio::time::sleep(Duration::from_millis(100)).await;
	h.host.move_cursor(Position::new(0, 1), false);
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(h.session.mode(), Mode::Highlight);
	assert!(h.transport.requests().is_empty());

	// Pointer clicks query without delay.
	h.host.move_cursor(Position::new(1, 1), true);
	tokio::time::sleep(Duration::from_millis(60)).await;
	assert_eq!(h.session.mode(), Mode::Diff);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn user_edit_hands_off_the_presentation() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED)]);
	h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await;
	settle().await;
	assert_eq!(h.session.mode(), Mode::Diff);

	h.host.type_text(Position::new(0, 0), "# ");
	settle().await;
	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Normal);
	assert!(snapshot.diff_added_lines.is_empty());
	assert_eq!(h.host.decoration_count(), 0);
	// The text is left exactly as the user sees it.
	assert_eq!(h.host.text(), "# def f():\n    pass\n    return 1\n");
	assert!(h.sink.records().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn selection_hands_off_the_presentation() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED)]);
	h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await;
	settle().await;

	h.host.select(Position::new(0, 0), Position::new(0, 3));
	settle().await;
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(h.host.decoration_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn requery_replaces_the_presentation() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED), diff_reply(50, "def f():\n    return 2\n")]);
	h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await;
	assert_eq!(h.session.query_the_same_thing_again().await, QueryOutcome::Presented);
	settle().await;
	assert_eq!(h.host.text(), "def f():\n    pass\n    return 2\n");
	assert_eq!(h.host.decoration_count(), 4);
	assert_eq!(h.transport.requests()[1].cursor_start, 9);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn chained_edit_continues_from_shown_replacement() {
	let chained = "def f():\n    return 1\n\nf()\n";
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED), diff_reply(50, chained)]);
	h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await;

	assert_eq!(h.session.request_chained_edit().await, QueryOutcome::Presented);
	settle().await;
	let request = &h.transport.requests()[1];
	assert_eq!(request.function, EDIT_CHAIN);
	assert_eq!(request.sources.get(FILE).map(String::as_str), Some(FIXED));
	assert_eq!(request.cursor_start, 9);

	let snapshot = h.session.snapshot();
	assert_eq!(snapshot.mode, Mode::Diff);
	assert_eq!(snapshot.showing_diff_for_function.as_deref(), Some(EDIT_CHAIN));
	assert_eq!(snapshot.showing_diff_for_range, None);
	assert_eq!(snapshot.edit_chain_modif_doc.as_deref(), Some(chained));
	assert_eq!(h.host.text(), "def f():\n    pass\n    return 1\n\nf()\n");
	assert_eq!(h.host.cursor(), Position::new(1, 0));
	assert_eq!(h.host.decoration_count(), 4);

	assert!(h.session.accept().await);
	assert_eq!(h.host.text(), chained);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn chain_without_presentation_is_skipped() {
	let h = harness(ORIGINAL, vec![]);
	assert_eq!(h.session.request_chained_edit().await, QueryOutcome::Skipped);
	assert_eq!(h.session.query_the_same_thing_again().await, QueryOutcome::Skipped);
	assert!(h.transport.requests().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn close_rolls_back_and_disposes() {
	let h = harness(ORIGINAL, vec![diff_reply(50, FIXED)]);
	h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await;
	assert_eq!(h.host.subscriber_count(), 1);

	assert!(h.engine.close(DocumentId(1)));
	assert!(!h.engine.close(DocumentId(1)));
	settle().await;
	assert_eq!(h.host.text(), ORIGINAL);
	assert_eq!(h.host.decoration_count(), 0);
	assert_eq!(h.host.subscriber_count(), 0);
	assert_eq!(h.engine.document_count(), 0);
	assert_eq!(h.session.mode(), Mode::Normal);
	assert_eq!(
		h.session.query_diff(Range::lines(1, 1), DIFF_AT_CURSOR).await,
		QueryOutcome::Skipped
	);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn close_while_waiting_discards_the_response() {
	let h = harness(ORIGINAL, vec![diff_reply(500, FIXED)]);
	let task = spawn_query(&h.session, Range::lines(1, 1));
	tokio::time::sleep(Duration::from_millis(150)).await;
	h.engine.close(DocumentId(1));

	assert_eq!(task.await.unwrap(), QueryOutcome::Superseded);
	settle().await;
	assert_eq!(h.host.text(), ORIGINAL);
	assert_eq!(h.host.decoration_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn open_returns_the_existing_session() {
	let h = harness(ORIGINAL, vec![]);
	let again = h.engine.open(DocumentId(1), h.host.clone());
	assert_eq!(again.id(), h.session.id());
	assert_eq!(h.engine.document_count(), 1);
	assert_eq!(h.host.subscriber_count(), 1);

	h.engine.set_intent("Add type hints");
	assert_eq!(h.engine.intent(), "Add type hints");
}
