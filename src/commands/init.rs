use crate::db::db::{Db, DB_FILE_NAME};
use crate::libs::config::Config;
use crate::libs::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::msg_success;
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write the default configuration without prompting
    #[arg(short, long)]
    defaults: bool,
}

pub fn cmd(init_args: InitArgs) -> Result<()> {
    let config = if init_args.defaults { Config::read()? } else { Config::init()? };
    config.save()?;
    msg_success!(Message::ConfigSaved);

    Db::new()?;
    let db_path = DataStorage::new().get_path(DB_FILE_NAME)?;
    msg_success!(Message::InitCompleted(db_path.display().to_string()));
    Ok(())
}
