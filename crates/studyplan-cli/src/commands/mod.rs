//! Subcommands and the plumbing they share.
//!
//! Query commands load a JSON snapshot of the stores into a
//! [`MemoryStore`], connect a [`Session`] to it and print what the session
//! computes.

pub mod config;
pub mod rank;
pub mod slot;
pub mod week;

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Args;
use studyplan_core::{Clock, Config, MemoryStore, ScheduleState, Session};

pub type CommandResult = Result<(), Box<dyn Error>>;

const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Args)]
pub struct GlobalArgs {
    /// JSON snapshot of intervals, pattern, exclusions and tasks
    /// (defaults to `snapshot_path` from the config)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Pretend it is this local time (YYYY-MM-DDTHH:MM)
    #[arg(long, global = true, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, NOW_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM: {e}"))
}

fn load_snapshot(path: &Path) -> Result<ScheduleState, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read snapshot {}: {e}", path.display()))?;
    let state = serde_json::from_str(&content)
        .map_err(|e| format!("invalid snapshot {}: {e}", path.display()))?;
    Ok(state)
}

/// Seed a store from the snapshot and connect a session to it.
pub fn open_session(
    global: &GlobalArgs,
    config: &Config,
) -> Result<Session<MemoryStore>, Box<dyn Error>> {
    let path = global
        .snapshot
        .clone()
        .or_else(|| config.snapshot_path.as_ref().map(PathBuf::from))
        .ok_or("no snapshot: pass --snapshot or set snapshot_path in the config")?;
    let state = load_snapshot(&path)?;

    let clock = match global.now {
        Some(now) => Clock::pinned_at(now),
        None => Clock::system(),
    };
    let session = Session::connect(MemoryStore::seeded(state), clock);
    tracing::debug!(snapshot = %path.display(), now = %session.now(), "session ready");
    Ok(session)
}

pub fn hours(minutes: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, minutes / 60.0)
}
