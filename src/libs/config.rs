//! Configuration stored as `config.json` in the data directory.
//!
//! Every section is optional in the file; missing sections fall back to
//! their defaults through the `*_or_default` accessors, so a fresh install
//! runs with no file at all. `trackvault init` walks through the sections
//! interactively and saves the result.
//!
//! ```rust,no_run
//! use trackvault::libs::config::Config;
//!
//! let config = Config::read()?;
//! let interval = config.monitor_or_default().poll_interval;
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_print};
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct ConfigModule {
    pub key: String,
    pub name: String,
}

/// Capture loop settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Milliseconds between capture cycles.
    pub poll_interval: u64,
    /// Seconds without input after which time counts as AFK.
    pub afk_threshold: u64,
    /// Seconds of input folded into one stored activity window.
    pub flush_interval: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            poll_interval: 5000,
            afk_threshold: 180,
            flush_interval: 60,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn afk_threshold(&self) -> Duration {
        Duration::from_secs(self.afk_threshold)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval)
    }
}

/// Outbox drain settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay before the first retry of a failed push, doubled per attempt.
    pub backoff_base: u64,
    pub backoff_max: u64,
    /// Queue entries pushed per drain.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            backoff_base: 30,
            backoff_max: 3600,
            batch_size: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ServerConfig {
    pub api_url: String,
    pub auth_token: String,
}

/// Who the captured activity belongs to on the server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub organization_id: String,
    pub employee_id: String,
    pub remote_user_id: String,
}

impl TenantConfig {
    /// True when every id needed to correlate activity with the server is set.
    pub fn is_complete(&self) -> bool {
        !self.tenant_id.is_empty() && !self.organization_id.is_empty() && !self.remote_user_id.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantConfig>,
}

impl Config {
    /// Loads the config file, or defaults when there is none.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        if !config_file_path.exists() {
            msg_debug!(Message::ConfigFileNotFound);
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(&config_file_path)?;
        let config: Config =
            serde_json::from_str(&config_str).with_context(|| Message::ConfigParseError(config_file_path.display().to_string()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    pub fn monitor_or_default(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }

    pub fn sync_or_default(&self) -> SyncConfig {
        self.sync.clone().unwrap_or_default()
    }

    pub fn tenant_or_default(&self) -> TenantConfig {
        self.tenant.clone().unwrap_or_default()
    }

    /// Server settings, when an API URL is configured.
    pub fn active_server(&self) -> Option<&ServerConfig> {
        self.server.as_ref().filter(|server| !server.api_url.trim().is_empty())
    }

    /// Interactive setup of the selected sections, starting from the current values.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();

        let modules = [
            ConfigModule {
                key: "monitor".to_string(),
                name: Message::ConfigModuleMonitor.to_string(),
            },
            ConfigModule {
                key: "sync".to_string(),
                name: Message::ConfigModuleSync.to_string(),
            },
            ConfigModule {
                key: "server".to_string(),
                name: Message::ConfigModuleServer.to_string(),
            },
            ConfigModule {
                key: "tenant".to_string(),
                name: Message::ConfigModuleTenant.to_string(),
            },
        ];

        let selected = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&modules.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for index in selected {
            match modules[index].key.as_str() {
                "monitor" => {
                    let default = config.monitor_or_default();
                    msg_print!(Message::ConfigModuleMonitor);
                    config.monitor = Some(MonitorConfig {
                        poll_interval: prompt(Message::PromptPollInterval, default.poll_interval)?,
                        afk_threshold: prompt(Message::PromptAfkThreshold, default.afk_threshold)?,
                        flush_interval: default.flush_interval,
                    });
                }
                "sync" => {
                    let default = config.sync_or_default();
                    msg_print!(Message::ConfigModuleSync);
                    config.sync = Some(SyncConfig {
                        backoff_base: prompt(Message::PromptBackoffBase, default.backoff_base)?,
                        backoff_max: prompt(Message::PromptBackoffMax, default.backoff_max)?,
                        batch_size: prompt(Message::PromptBatchSize, default.batch_size)?,
                    });
                }
                "server" => {
                    let default = config.server.clone().unwrap_or_default();
                    msg_print!(Message::ConfigModuleServer);
                    config.server = Some(ServerConfig {
                        api_url: prompt(Message::PromptServerApiUrl, default.api_url)?,
                        auth_token: prompt(Message::PromptServerAuthToken, default.auth_token)?,
                    });
                }
                "tenant" => {
                    let default = config.tenant_or_default();
                    msg_print!(Message::ConfigModuleTenant);
                    config.tenant = Some(TenantConfig {
                        tenant_id: prompt(Message::PromptTenantId, default.tenant_id)?,
                        organization_id: prompt(Message::PromptOrganizationId, default.organization_id)?,
                        employee_id: prompt(Message::PromptEmployeeId, default.employee_id)?,
                        remote_user_id: prompt(Message::PromptRemoteUserId, default.remote_user_id)?,
                    });
                }
                _ => {}
            }
        }

        Ok(config)
    }
}

fn prompt<T>(message: Message, default: T) -> Result<T>
where
    T: Clone + ToString + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Debug + ToString,
{
    Ok(Input::with_theme(&ColorfulTheme::default())
        .with_prompt(message.to_string())
        .default(default)
        .allow_empty(true)
        .interact_text()?)
}
