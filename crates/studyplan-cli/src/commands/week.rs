use clap::Args;
use studyplan_core::{BlockKind, Config};

use super::{hours, open_session, CommandResult, GlobalArgs};

#[derive(Args)]
pub struct WeekArgs {
    /// Weeks from the current one (negative for past weeks)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,
}

pub fn run(global: &GlobalArgs, args: WeekArgs) -> CommandResult {
    let config = Config::load_or_default();
    let mut session = open_session(global, &config)?;
    session.watch_week(args.offset)?;
    let summary = session.week_summary(args.offset)?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Week of {}: {}h available",
        summary.week_id,
        hours(summary.available_minutes, config.display.hour_decimals)
    );
    let shown = summary
        .blocks
        .iter()
        .filter(|b| config.display.show_base_blocks || b.kind.is_persisted());
    for block in shown {
        let origin = match &block.kind {
            BlockKind::Persisted { id } => format!("persisted {id}"),
            BlockKind::Base => "base".to_string(),
        };
        println!(
            "  {}-{}  {}",
            block.start.format("%a %m-%d %H:%M"),
            block.end.format("%H:%M"),
            origin
        );
    }
    Ok(())
}
