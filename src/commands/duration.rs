use crate::db::aggregation::Aggregation;
use crate::db::db::Db;
use crate::db::timers::Timers;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_print};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct DurationArgs {
    /// Local timer id
    timer_id: i64,
}

pub fn cmd(args: DurationArgs) -> Result<()> {
    let db = Db::new()?;
    if Timers::new(&db).find_one_by_id(args.timer_id)?.is_none() {
        msg_bail_anyhow!(Message::TimerNotFound(args.timer_id));
    }

    let summary = Aggregation::new(&db).summary(args.timer_id)?;
    msg_print!(Message::DurationReportHeader(args.timer_id), true);
    View::activity(&summary);
    Ok(())
}
