use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use quill_files::{CliConverter, FileRouter, RemoteSources};
use quill_server::{api_router, AppState, EditToken, SharedState};
use quill_session::{DirectoryWatcher, SessionId};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "An interactive notebook editor/server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or edit notebooks
    Edit(EditArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Notebook file or workspace directory (omit to start an unsaved notebook)
    path: Option<String>,

    /// Bind address, e.g. 127.0.0.1:2718
    #[arg(long, default_value = "127.0.0.1:2718")]
    bind: String,

    /// Include markdown notebooks in workspace listings
    #[arg(long)]
    include_markdown: bool,

    /// Watch the workspace and notebook files for changes
    #[arg(long)]
    watch: bool,

    /// Require this token for edit operations
    #[arg(long)]
    token_password: Option<String>,

    /// External tool used to convert imported notebooks
    #[arg(long, default_value = "quill")]
    convert_tool: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Edit(args) => serve_edit(args).await,
    }
}

async fn serve_edit(args: EditArgs) -> Result<()> {
    let router = match &args.path {
        Some(path) => FileRouter::infer(path)
            .with_context(|| format!("Cannot route {path}"))?,
        None => FileRouter::new_file(),
    };
    let router = router.toggle_markdown(args.include_markdown);

    let remote = RemoteSources {
        converter: Arc::new(CliConverter::new(&args.convert_tool)),
        ..RemoteSources::disabled()
    };
    let state = AppState::new(router, remote, EditToken::new(args.token_password.clone()));

    // Single-file and new-file routes get their session up front; directory
    // routes create sessions as notebooks are opened.
    if let Some(key) = state.unique_key() {
        let control_rx = state
            .open_session(
                SessionId::new("default"),
                &key,
                &quill_files::ImportParams::default(),
                args.watch,
            )
            .map_err(|err| anyhow::anyhow!("{}", err.detail))?;
        drain_control_queue(control_rx);
    }

    let _directory_watcher = start_directory_watcher(&args, &state)?;
    warm_workspace_listing(&state);

    let app = api_router(state);
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Cannot bind {}", args.bind))?;
    log::info!("Serving quill on http://{}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

/// The execution engine consumes control queues; without one attached, log
/// requests so operations remain observable.
fn drain_control_queue(
    mut control_rx: tokio::sync::mpsc::UnboundedReceiver<quill_session::QueuedControlRequest>,
) {
    tokio::spawn(async move {
        while let Some(queued) = control_rx.recv().await {
            log::debug!(
                "Control request from consumer {}: {:?}",
                queued.from_consumer,
                queued.request
            );
        }
    });
}

fn start_directory_watcher(
    args: &EditArgs,
    state: &SharedState,
) -> Result<Option<DirectoryWatcher>> {
    if !args.watch {
        return Ok(None);
    }
    let Some(directory) = state.directory() else {
        return Ok(None);
    };
    let state_for_events = state.clone();
    let watcher = DirectoryWatcher::start(&directory, move || {
        log::debug!("Workspace changed; listing marked stale");
        state_for_events.mark_stale();
    })
    .context("Cannot watch workspace directory")?;
    log::info!("Watching {} for changes", directory.display());
    Ok(Some(watcher))
}

fn warm_workspace_listing(state: &SharedState) {
    if state.directory().is_none() {
        return;
    }
    match state.workspace_files() {
        Ok(files) => log::info!("Workspace contains {} top-level entries", files.len()),
        Err(err) => log::warn!("Initial workspace scan failed: {err}"),
    }
}
