use crate::db::db::Db;
use crate::libs::audit_queue::AuditQueue;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use anyhow::Result;

pub fn cmd() -> Result<()> {
    let entries = AuditQueue::new(&Db::new()?).list();
    if entries.is_empty() {
        msg_info!(Message::QueueEmpty);
        return Ok(());
    }

    msg_print!(Message::QueuePendingHeader(entries.len()), true);
    View::queue(&entries);
    Ok(())
}
