mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use roadmap_core::{paths, RoadmapError};
use cmd::{
    board::BoardSubcommand, config::ConfigSubcommand, feedback::FeedbackSubcommand,
    issues::IssuesSubcommand, milestone::MilestoneSubcommand, pulls::PullsSubcommand,
    release::ReleaseSubcommand, sizing::SizingSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "roadmap",
    about = "Keep the product roadmap, kanban boards, feedback and issue trackers in step",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .roadmap/)
    #[arg(long, global = true, env = "ROADMAP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// More logging (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .roadmap/ with a default config and an empty workspace
    Init,

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Release lanes, labels and roadmap status
    Release {
        #[command(subcommand)]
        subcommand: ReleaseSubcommand,
    },

    /// Move features through the sizing board
    Sizing {
        #[command(subcommand)]
        subcommand: SizingSubcommand,
    },

    /// Exchange features with the feedback sheet
    Feedback {
        #[command(subcommand)]
        subcommand: FeedbackSubcommand,
    },

    /// Label idle in-progress cards and park long-idle ones in the backlog
    Stale {
        /// Only this team (default: every team)
        #[arg(long)]
        team: Option<String>,
    },

    /// Surface external pull requests that need a team review
    Pulls {
        #[command(subcommand)]
        subcommand: PullsSubcommand,
    },

    /// Bug-tracker milestone bookkeeping
    Milestone {
        #[command(subcommand)]
        subcommand: MilestoneSubcommand,
    },

    /// Inspect and prepare boards
    Board {
        #[command(subcommand)]
        subcommand: BoardSubcommand,
    },

    /// Export scrum work to the issue tracker
    Issues {
        #[command(subcommand)]
        subcommand: IssuesSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Release { subcommand } => cmd::release::run(&root, subcommand, cli.json),
        Commands::Sizing { subcommand } => cmd::sizing::run(&root, subcommand, cli.json),
        Commands::Feedback { subcommand } => cmd::feedback::run(&root, subcommand, cli.json),
        Commands::Stale { team } => cmd::stale::run(&root, team.as_deref(), cli.json),
        Commands::Pulls { subcommand } => cmd::pulls::run(&root, subcommand, cli.json),
        Commands::Milestone { subcommand } => cmd::milestone::run(&root, subcommand, cli.json),
        Commands::Board { subcommand } => cmd::board::run(&root, subcommand, cli.json),
        Commands::Issues { subcommand } => cmd::issues::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        if e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<RoadmapError>())
            .any(|err| err.is_configuration() && !matches!(err, RoadmapError::NotInitialized))
        {
            eprintln!("hint: check {} against the boards and sheets", paths::CONFIG_FILE);
        }
        std::process::exit(1);
    }
}
