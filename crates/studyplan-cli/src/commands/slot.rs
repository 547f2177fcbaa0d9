use clap::Args;
use studyplan_core::{BlockKind, Config, Slot};

use super::{open_session, CommandResult, GlobalArgs};

#[derive(Args)]
pub struct SlotArgs {
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub weekday: u8,
    /// Hour of day, 0-23
    pub hour: u8,

    /// Weeks from the current one (negative for past weeks)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,
}

pub fn run(global: &GlobalArgs, args: SlotArgs) -> CommandResult {
    let slot = Slot::new(args.weekday, args.hour)?;
    let config = Config::load_or_default();
    let mut session = open_session(global, &config)?;
    let week = session.watch_week(args.offset)?;
    let kind = session.classify_slot(args.offset, slot)?;

    if global.json {
        let value = serde_json::json!({
            "weekId": week.week_id(),
            "weekday": slot.weekday(),
            "hour": slot.hour(),
            "block": kind,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match kind {
        Some(BlockKind::Persisted { id }) => println!("{slot}: persisted {id}"),
        Some(BlockKind::Base) => println!("{slot}: base"),
        None => println!("{slot}: free"),
    }
    Ok(())
}
