mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use redgreen_core::step::StepId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "redgreen",
    about = "Test-gated RED/GREEN workflow loop for AI coding agents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "REDGREEN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workflow (fails if one already exists)
    Setup {
        /// Free-text request threaded into planning steps
        prompt: Vec<String>,

        /// Session that owns the workflow; only it is auto-advanced by the hook
        #[arg(long, env = "CLAUDE_SESSION_ID", default_value = "")]
        session_id: String,

        /// Begin at a later step instead of review_previous_notes
        #[arg(long, value_parser = parse_step)]
        start_at: Option<StepId>,
    },

    /// End-of-turn trigger: reads the hook payload on stdin, validates and advances
    Hook {
        /// Command text of the tool call that preceded the trigger
        #[arg(long, env = "TOOL_PARAMS_command")]
        tool_command: Option<String>,

        /// File path of the tool call that preceded the trigger
        #[arg(long, env = "TOOL_PARAMS_file_path")]
        file_path: Option<String>,
    },

    /// Post-write trigger: record a newly written story file
    TrackStory {
        /// Path that was written (default: TOOL_PARAMS_file_path)
        #[arg(long, env = "TOOL_PARAMS_file_path")]
        file_path: Option<String>,

        /// Session id (default: read from the hook payload on stdin)
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Approve the current gate and continue
    Approve,

    /// Reject at the current gate and loop back
    Reject,

    /// Show workflow progress
    Status,

    /// Stop the workflow and delete its state
    Cancel,

    /// Show the effective configuration and its warnings
    Config,
}

fn parse_step(s: &str) -> Result<StepId, String> {
    s.parse::<StepId>().map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    // stdout is reserved for command output and the hook's JSON payload.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Setup {
            prompt,
            session_id,
            start_at,
        } => cmd::setup::run(
            &root,
            &prompt.join(" "),
            &session_id,
            start_at.unwrap_or(StepId::ReviewPreviousNotes),
            cli.json,
        ),
        Commands::Hook {
            tool_command,
            file_path,
        } => {
            cmd::hook::run(&root, tool_command.as_deref(), file_path.as_deref());
            Ok(())
        }
        Commands::TrackStory {
            file_path,
            session_id,
        } => {
            cmd::hook::track_story(&root, file_path.as_deref(), session_id.as_deref());
            Ok(())
        }
        Commands::Approve => cmd::gate::approve(&root, cli.json),
        Commands::Reject => cmd::gate::reject(&root, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Cancel => cmd::cancel::run(&root, cli.json),
        Commands::Config => cmd::config::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
