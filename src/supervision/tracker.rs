//! Supervision tracker: the `user_id -> expires_at` map.
//!
//! Every mutation is mirrored to the [`SupervisionStore`] as a whole-map
//! snapshot. Save failures are logged and otherwise ignored: the in-memory
//! map stays authoritative for the running process.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::clock::Clock;
use super::store::{Records, SupervisionStore};
use crate::error::AppError;

/// One live record as shown by the list command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSupervision {
    pub user_id: String,
    /// Whole minutes left, rounded down, never negative.
    pub remaining_minutes: i64,
}

pub struct SupervisionTracker {
    records: Records,
    store: Box<dyn SupervisionStore>,
    clock: Arc<dyn Clock>,
}

impl SupervisionTracker {
    /// Restore the persisted map and sweep anything that expired while the
    /// bot was down.
    pub fn load(store: Box<dyn SupervisionStore>, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let records = store.load()?;
        let mut tracker = Self { records, store, clock };
        let swept = tracker.cleanup_expired();
        info!(
            restored = tracker.records.len(),
            expired = swept.len(),
            "supervision state loaded"
        );
        Ok(tracker)
    }

    /// `true` iff `user_id` has a record that has not yet expired.
    pub fn is_supervising(&self, user_id: &str) -> bool {
        self.records
            .get(user_id)
            .is_some_and(|&expires_at| expires_at > self.clock.now())
    }

    /// Put every id under supervision until `now + minutes * 60`.
    ///
    /// An existing record is overwritten, not extended. A zero-minute
    /// request would produce an already-expired record, so it removes the
    /// id instead. Returns the expiry that was applied.
    pub fn supervise(&mut self, user_ids: &[String], minutes: u32) -> i64 {
        let now = self.clock.now();
        let expires_at = now + i64::from(minutes) * 60;

        for id in user_ids {
            if expires_at > now {
                self.records.insert(id.clone(), expires_at);
            } else {
                self.records.remove(id);
            }
        }

        info!(users = ?user_ids, minutes, expires_at, "supervision set");
        self.persist();
        expires_at
    }

    /// Drop the records for `user_ids`; returns how many existed.
    pub fn unsupervise(&mut self, user_ids: &[String]) -> usize {
        let removed = user_ids
            .iter()
            .filter(|id| self.records.remove(id.as_str()).is_some())
            .count();

        info!(users = ?user_ids, removed, "supervision lifted");
        self.persist();
        removed
    }

    /// Remove exactly the records with `expires_at <= now`. Persists only
    /// when something was removed.
    pub fn cleanup_expired(&mut self) -> Vec<String> {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|&(_, &expires_at)| expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        if expired.is_empty() {
            return expired;
        }

        for id in &expired {
            self.records.remove(id);
        }
        self.persist();
        debug!(expired = ?expired, "expired supervisions swept");
        expired
    }

    /// Sweep, then report every live record ordered by user id.
    pub fn list_active(&mut self) -> Vec<ActiveSupervision> {
        self.cleanup_expired();
        let now = self.clock.now();
        self.records
            .iter()
            .map(|(id, &expires_at)| ActiveSupervision {
                user_id: id.clone(),
                remaining_minutes: (expires_at - now).div_euclid(60).max(0),
            })
            .collect()
    }

    /// Expiry for `user_id`, live or not.
    pub fn expires_at(&self, user_id: &str) -> Option<i64> {
        self.records.get(user_id).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.records) {
            warn!(error = %e, "failed to persist supervision state");
        }
    }
}
