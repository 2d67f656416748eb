//! One capture cycle: fold the input counters into the current activity
//! window and store the window once it is full.
//!
//! Called from the poller every few seconds. AFK time is accrued per tick
//! whenever the input hook has been idle for longer than the threshold.

use crate::db::db::Db;
use crate::db::kb_mouse_activity::KbMouseActivity;
use crate::db::timers::Timers;
use crate::libs::config::{MonitorConfig, TenantConfig};
use crate::libs::input_hook::{InputCounters, InputSnapshot};
use crate::libs::kb_mouse::KbMouseActivityService;
use crate::libs::messages::Message;
use crate::libs::outcome::Outcome;
use crate::{msg_debug, msg_error};
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct CaptureWindow {
    started_at: DateTime<Utc>,
    last_tick: Instant,
    afk_seconds: f64,
    input: InputSnapshot,
}

impl CaptureWindow {
    fn open(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_tick: Instant::now(),
            afk_seconds: 0.0,
            input: InputSnapshot::default(),
        }
    }
}

pub struct CaptureCycle {
    counters: Arc<InputCounters>,
    activities: KbMouseActivityService,
    timers: Timers,
    monitor: MonitorConfig,
    tenant: TenantConfig,
    window: Mutex<CaptureWindow>,
}

impl CaptureCycle {
    pub fn new(db: &Db, counters: Arc<InputCounters>, monitor: MonitorConfig, tenant: TenantConfig) -> Self {
        Self {
            counters,
            activities: KbMouseActivityService::new(db),
            timers: Timers::new(db),
            monitor,
            tenant,
            window: Mutex::new(CaptureWindow::open(Utc::now())),
        }
    }

    /// Accrues counters and AFK time, flushing when the window is full.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Option<KbMouseActivity>> {
        let full = {
            let mut window = self.window.lock();
            let elapsed = window.last_tick.elapsed();
            window.last_tick = Instant::now();
            if self.counters.idle_for() >= self.monitor.afk_threshold() {
                window.afk_seconds += elapsed.as_secs_f64();
            }
            window.input.absorb(self.counters.take());

            let open_for = (now - window.started_at).to_std().unwrap_or_default();
            open_for >= self.monitor.flush_interval()
        };

        if full {
            self.flush(now)
        } else {
            Ok(None)
        }
    }

    /// Stores the current window, if it saw anything, and opens a new one at `now`.
    ///
    /// A window that fails to store is folded back into the live one, so the
    /// next flush writes its counters.
    pub fn flush(&self, now: DateTime<Utc>) -> Result<Option<KbMouseActivity>> {
        let mut window = std::mem::replace(&mut *self.window.lock(), CaptureWindow::open(now));
        window.input.absorb(self.counters.take());

        if window.input.is_empty() && window.afk_seconds <= 0.0 {
            msg_debug!(Message::CaptureIdle);
            return Ok(None);
        }

        let activity = match self.build_activity(&window, now) {
            Ok(activity) => activity,
            Err(e) => {
                self.restore(window);
                return Err(e);
            }
        };
        match self.activities.save(&activity) {
            Outcome::Done(stored) => {
                msg_debug!(Message::CaptureFlushed(stored.kb_press_count, activity_mouse_events(&stored)));
                Ok(Some(stored))
            }
            Outcome::Skipped(_) => Ok(None),
            Outcome::Failed(e) => {
                msg_error!(Message::ActivityWriteFailed(e.to_string()));
                self.restore(window);
                Err(e.into())
            }
        }
    }

    fn restore(&self, failed: CaptureWindow) {
        let mut live = self.window.lock();
        let mut input = failed.input;
        input.absorb(std::mem::take(&mut live.input));
        live.input = input;
        live.afk_seconds += failed.afk_seconds;
        live.started_at = failed.started_at.min(live.started_at);
    }

    fn build_activity(&self, window: &CaptureWindow, now: DateTime<Utc>) -> Result<KbMouseActivity> {
        let running = self.timers.find_last_one()?.filter(|timer| timer.is_running());
        let window_secs = (now - window.started_at).num_milliseconds().max(0) as f64 / 1000.0;

        let mut activity = KbMouseActivity::new(window.started_at, now);
        activity.timer_id = running.and_then(|timer| timer.id);
        activity.tenant_id = non_empty(&self.tenant.tenant_id);
        activity.organization_id = non_empty(&self.tenant.organization_id);
        activity.remote_id = non_empty(&self.tenant.remote_user_id);
        activity.kb_press_count = window.input.key_presses;
        activity.kb_sequence = window.input.key_sequence.clone();
        activity.mouse_left_click_count = window.input.left_clicks;
        activity.mouse_right_click_count = window.input.right_clicks;
        activity.mouse_movements_count = window.input.mouse_movements;
        activity.mouse_wheel_count = window.input.wheel;
        activity.afk_duration = window.afk_seconds.min(window_secs);
        Ok(activity)
    }
}

fn activity_mouse_events(activity: &KbMouseActivity) -> i64 {
    activity.mouse_left_click_count + activity.mouse_right_click_count + activity.mouse_movements_count + activity.mouse_wheel_count
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
