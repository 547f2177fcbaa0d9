use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "studyplan", version, about = "Study availability and task priority planner")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank tasks by urgency and importance
    Rank(commands::rank::RankArgs),
    /// Show the visible study blocks of a week
    Week(commands::week::WeekArgs),
    /// Classify one cell of the weekly grid
    Slot(commands::slot::SlotArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STUDYPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Rank(args) => commands::rank::run(&cli.global, args),
        Commands::Week(args) => commands::week::run(&cli.global, args),
        Commands::Slot(args) => commands::slot::run(&cli.global, args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
