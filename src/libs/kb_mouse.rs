//! Sync-eligible keyboard/mouse activity windows.
//!
//! Updates and deletes without a row id are logged no-ops; reads degrade to `None`.

use crate::db::db::Db;
use crate::db::kb_mouse_activity::{KbMouseActivities, KbMouseActivity, KbMouseActivityPatch};
use crate::db::repository::Criteria;
use crate::libs::messages::Message;
use crate::libs::outcome::Outcome;
use crate::{msg_debug, msg_error, msg_warning};

#[derive(Clone)]
pub struct KbMouseActivityService {
    activities: KbMouseActivities,
}

impl KbMouseActivityService {
    pub fn new(db: &Db) -> Self {
        Self {
            activities: KbMouseActivities::new(db),
        }
    }

    /// Stores a new window.
    pub fn save(&self, activity: &KbMouseActivity) -> Outcome<KbMouseActivity> {
        match self.activities.save(activity) {
            Ok(stored) => {
                msg_debug!(Message::ActivitySaved(stored.id.unwrap_or_default()));
                Outcome::Done(stored)
            }
            Err(e) => {
                msg_error!(Message::ActivityWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Applies `patch` to the window named by `patch.id`.
    pub fn update(&self, patch: &KbMouseActivityPatch) -> Outcome<usize> {
        let Some(id) = patch.id else {
            msg_warning!(Message::ActivityIdMissing);
            return Outcome::Skipped("missing activity id");
        };

        match self.activities.update(id, patch) {
            Ok(updated) => {
                msg_debug!(Message::ActivityUpdated(id));
                Outcome::Done(updated)
            }
            Err(e) => {
                msg_error!(Message::ActivityWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Deletes the window named by `patch.id`.
    pub fn remove(&self, patch: &KbMouseActivityPatch) -> Outcome<usize> {
        let Some(id) = patch.id else {
            msg_warning!(Message::ActivityIdMissing);
            return Outcome::Skipped("missing activity id");
        };

        match self.activities.delete(&Criteria::id(id)) {
            Ok(removed) => {
                msg_debug!(Message::ActivityRemoved(id));
                Outcome::Done(removed)
            }
            Err(e) => {
                msg_error!(Message::ActivityWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Oldest unsynced window for this user and organization, `None` on miss or read failure.
    pub fn retrieve(&self, remote_id: &str, organization_id: &str, tenant_id: &str) -> Option<KbMouseActivity> {
        self.activities
            .find_oldest(remote_id, organization_id, tenant_id)
            .unwrap_or_else(|e| {
                msg_error!(Message::ActivityReadFailed(e.to_string()));
                None
            })
    }

    /// Folds `activity` into the pending window of the same owner, or stores it as a new one.
    pub fn upsert(&self, activity: &KbMouseActivity) -> Outcome<KbMouseActivity> {
        let owner = (
            activity.remote_id.as_deref(),
            activity.organization_id.as_deref(),
            activity.tenant_id.as_deref(),
        );
        let existing = match owner {
            (Some(remote_id), Some(organization_id), Some(tenant_id)) => self.retrieve(remote_id, organization_id, tenant_id),
            _ => None,
        };
        let Some(existing) = existing else {
            return self.save(activity);
        };

        let mut screenshots = existing.screenshots.clone();
        screenshots.extend(activity.screenshots.iter().cloned());
        let mut kb_sequence = existing.kb_sequence.clone();
        kb_sequence.extend(activity.kb_sequence.iter().copied());
        let mut active_windows = existing.active_windows.clone();
        active_windows.extend(activity.active_windows.iter().cloned());
        let patch = KbMouseActivityPatch {
            id: existing.id,
            time_end: Some(activity.time_end.max(existing.time_end)),
            kb_press_count: Some(existing.kb_press_count + activity.kb_press_count),
            mouse_left_click_count: Some(existing.mouse_left_click_count + activity.mouse_left_click_count),
            mouse_right_click_count: Some(existing.mouse_right_click_count + activity.mouse_right_click_count),
            mouse_movements_count: Some(existing.mouse_movements_count + activity.mouse_movements_count),
            mouse_wheel_count: Some(existing.mouse_wheel_count + activity.mouse_wheel_count),
            kb_sequence: Some(kb_sequence),
            active_windows: Some(active_windows),
            afk_duration: Some(existing.afk_duration + activity.afk_duration),
            screenshots: Some(screenshots),
            synced: None,
        };

        match self.update(&patch) {
            Outcome::Done(_) => match existing.id.map(|id| self.activities.find_one_by_id(id)) {
                Some(Ok(Some(merged))) => Outcome::Done(merged),
                Some(Err(e)) => {
                    msg_error!(Message::ActivityReadFailed(e.to_string()));
                    Outcome::Failed(e)
                }
                _ => Outcome::Skipped("activity vanished during upsert"),
            },
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
            Outcome::Failed(e) => Outcome::Failed(e),
        }
    }
}
