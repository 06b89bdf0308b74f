//! `diffmate` binary.
//!
//! - `preview`: shows how a replacement document would be presented against a
//!   buffer, as an annotated combined document.
//! - `replay`: runs one full query against an in-memory buffer with a fixed
//!   service answer, then accepts or rejects and prints the resulting buffer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use diffmate_editor::{Config, DiffPlan, EditorHost, Engine, MemoryHost, QueryOutcome, SimilarDiff};
use diffmate_inference::functions::{DIFF_AT_CURSOR, DIFF_SELECTION};
use diffmate_inference::{
	FeedbackSink, InferenceRequest, InferenceResponse, InferenceTransport, MemoryFeedbackSink, TransportError,
};
use diffmate_primitives::{DocumentId, Position, Range};
use tracing::info;

mod render;
mod sink;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "diffmate")]
#[command(about = "Interactive AI diff presentation, from the command line")]
struct Args {
	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the combined document a replacement would be presented as.
	Preview {
		buffer: PathBuf,
		replacement: PathBuf,
	},
	/// Query, present and settle one suggestion against a buffer file.
	Replay(ReplayArgs),
}

#[derive(clap::Args, Debug)]
struct ReplayArgs {
	buffer: PathBuf,

	/// Replacement document the service answers with
	#[arg(long, value_name = "PATH", conflicts_with = "response", required_unless_present = "response")]
	replacement: Option<PathBuf>,

	/// Raw JSON response body the service answers with
	#[arg(long, value_name = "PATH")]
	response: Option<PathBuf>,

	/// Zero-based line the cursor sits on
	#[arg(long, default_value_t = 0, conflicts_with = "lines")]
	line: usize,

	/// Zero-based inclusive line span to query, as FIRST:LAST
	#[arg(long, value_parser = parse_lines)]
	lines: Option<(usize, usize)>,

	/// Reject the suggestion instead of accepting it
	#[arg(long)]
	reject: bool,

	/// TOML configuration file
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Append feedback records to this JSON-lines file
	#[arg(long, value_name = "PATH")]
	feedback: Option<PathBuf>,
}

fn parse_lines(value: &str) -> Result<(usize, usize), String> {
	let (first, last) = value.split_once(':').ok_or("expected FIRST:LAST")?;
	let first = first.trim().parse().map_err(|err| format!("{err}"))?;
	let last = last.trim().parse().map_err(|err| format!("{err}"))?;
	Ok((first, last))
}

/// Answers every request with the same response.
struct FixedTransport {
	response: InferenceResponse,
}

#[async_trait]
impl InferenceTransport for FixedTransport {
	async fn send(&self, _request: &InferenceRequest) -> Result<InferenceResponse, TransportError> {
		Ok(self.response.clone())
	}
}

fn read(path: &Path) -> anyhow::Result<String> {
	std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn file_name(path: &Path) -> String {
	path.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}

fn preview(buffer: &Path, replacement: &Path) -> anyhow::Result<()> {
	let text = read(buffer)?;
	let plan = DiffPlan::compute(&SimilarDiff, &text, &read(replacement)?);
	let host = MemoryHost::new(file_name(buffer), &text);
	host.apply_edits(&plan.edits, Default::default())?;
	print!("{}", render::annotate(&host.text(), &plan.added_lines, &plan.deleted_lines));
	info!(
		added = plan.added_lines.len(),
		deleted = plan.deleted_lines.len(),
		"preview"
	);
	Ok(())
}

async fn replay(args: ReplayArgs) -> anyhow::Result<()> {
	let config = match &args.config {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};
	let text = read(&args.buffer)?;
	let name = file_name(&args.buffer);
	let response = match (&args.replacement, &args.response) {
		(Some(path), _) => InferenceResponse::with_file(name.clone(), read(path)?),
		(None, Some(path)) => InferenceResponse::from_json(&read(path)?).context("decoding response")?,
		(None, None) => bail!("either --replacement or --response is required"),
	};
	let sink: Arc<dyn FeedbackSink> = match &args.feedback {
		Some(path) => Arc::new(sink::JsonLinesSink::new(path)),
		None => Arc::new(MemoryFeedbackSink::new()),
	};

	let engine = Engine::new(config, Arc::new(FixedTransport { response }), sink);
	let host = Arc::new(MemoryHost::new(name, &text));
	let session = engine.open(DocumentId(1), host.clone());

	let (region, function) = match args.lines {
		Some((first, last)) => (
			Range::new(Position::line_start(first), Position::new(last, host.line_len(last))),
			DIFF_SELECTION,
		),
		None => (Range::lines(args.line, args.line), DIFF_AT_CURSOR),
	};
	let outcome = session.query_diff(region, function).await;
	if outcome != QueryOutcome::Presented {
		bail!("no suggestion presented: {outcome:?}");
	}
	let snapshot = session.snapshot();
	eprint!(
		"{}",
		render::annotate(&host.text(), &snapshot.diff_added_lines, &snapshot.diff_deleted_lines)
	);

	if args.reject {
		session.reject().await;
	} else {
		session.accept().await;
	}
	engine.close(DocumentId(1));
	print!("{}", host.text());
	Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	match args.command {
		Command::Preview { buffer, replacement } => preview(&buffer, &replacement),
		Command::Replay(replay_args) => replay(replay_args).await,
	}
}
