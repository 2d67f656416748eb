//! HTTP adapter for the remote sync API.
//!
//! Thin by intent: every push is a JSON `POST` to `{api_url}/{path}` with a
//! bearer token. A non-2xx status is an error, and an `id` field in the reply
//! is handed back as the remote id.

use crate::db::audit_queue::AuditEntry;
use crate::db::kb_mouse_activity::KbMouseActivity;
use crate::db::screenshots::Screenshot;
use crate::db::timers::Timer;
use crate::libs::config::ServerConfig;
use crate::libs::messages::Message;
use crate::libs::sync::RemoteSync;
use crate::msg_bail_anyhow;
use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TIMER_URL: &str = "timesheet/timer/sync";
const TIME_SLOT_URL: &str = "timesheet/time-slot";
const SCREENSHOT_URL: &str = "timesheet/screenshot";
const QUEUE_URL: &str = "sync";

pub struct HttpRemote {
    client: Client,
    api_url: String,
    auth_token: String,
}

impl HttpRemote {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let mut request = self.client.post(self.url(path)).json(body);
        if !self.auth_token.is_empty() {
            request = request.bearer_auth(&self.auth_token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            msg_bail_anyhow!(Message::RemoteRequestFailed(path.to_string(), status.to_string()));
        }
        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }
}

fn remote_id(reply: &Value) -> Option<String> {
    match reply.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl RemoteSync for HttpRemote {
    async fn push_timer(&self, timer: &Timer) -> Result<Option<String>> {
        Ok(remote_id(&self.post(TIMER_URL, timer).await?))
    }

    async fn push_activity(&self, activity: &KbMouseActivity) -> Result<Option<String>> {
        let body = json!({
            "activity": activity,
            "duration": activity.duration_secs(),
            "overall": activity.overall_secs(),
        });
        Ok(remote_id(&self.post(TIME_SLOT_URL, &body).await?))
    }

    async fn push_screenshot(&self, screenshot: &Screenshot, time_slot_id: Option<&str>) -> Result<()> {
        let body = json!({
            "screenshot": screenshot,
            "timeSlotId": time_slot_id,
        });
        self.post(SCREENSHOT_URL, &body).await?;
        Ok(())
    }

    async fn push_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.post(&format!("{}/{}", QUEUE_URL, entry.queue), entry).await?;
        Ok(())
    }
}
