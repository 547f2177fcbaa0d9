use clap::Args;
use studyplan_core::{Config, TaskOrder};

use super::{hours, open_session, CommandResult, GlobalArgs};

#[derive(Args)]
pub struct RankArgs {
    /// priority, due_date, name or effort (defaults to the configured order)
    #[arg(long)]
    pub order: Option<TaskOrder>,

    /// Include completed tasks
    #[arg(long)]
    pub all: bool,
}

pub fn run(global: &GlobalArgs, args: RankArgs) -> CommandResult {
    let config = Config::load_or_default();
    let session = open_session(global, &config)?;

    let order = args.order.unwrap_or(config.ranking.default_order);
    let include_completed = args.all || config.ranking.include_completed;
    let ranked = session.rank_tasks(order, include_completed)?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let decimals = config.display.hour_decimals;
    println!("{:>6}  {:>3}  {:>8}  {:>8}  {:<10}  NAME", "SCORE", "URG", "NEEDED", "FREE", "DUE");
    for entry in &ranked {
        let done = if entry.task.completed { " (done)" } else { "" };
        println!(
            "{:>6.1}  {:>3}  {:>7}h  {:>7}h  {:<10}  {}{}",
            entry.priority.score,
            entry.priority.urgency_level,
            hours(entry.task.time_needed * 60.0, decimals),
            hours(entry.priority.time_available_hours * 60.0, decimals),
            entry.task.due_date,
            entry.task.name,
            done,
        );
    }
    Ok(())
}
