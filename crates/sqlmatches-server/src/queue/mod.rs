//! Tracks matches that are open and still waiting for a demo.
//!
//! Every operation takes the queue lock for a single map update, so `open`,
//! `finalize` and `sweep` are linearizable per match id. Nothing holds the
//! lock across I/O: the pipeline keeps an entry while its demo is in transit
//! and releases it with [`PendingQueue::finalize`] once the outcome is recorded.

mod error;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use jiff::{SignedDuration, Timestamp};

pub use self::error::{QueueError, QueueResult};
use crate::TRACING_TARGET_QUEUE;

/// Match timeout used when none is configured: three hours.
pub const DEFAULT_MATCH_TIMEOUT: SignedDuration = SignedDuration::from_hours(3);

/// In-process pending-match queue.
#[derive(Debug)]
pub struct PendingQueue {
    entries: Mutex<HashMap<String, Timestamp>>,
    timeout: SignedDuration,
}

impl PendingQueue {
    /// Creates an empty queue expiring entries older than `timeout`.
    pub fn new(timeout: SignedDuration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// The configured match timeout.
    pub fn timeout(&self) -> SignedDuration {
        self.timeout
    }

    /// Opens `match_id` now.
    pub fn open(&self, match_id: &str) -> QueueResult<()> {
        self.open_at(match_id, Timestamp::now())
    }

    /// Opens `match_id` as of `opened_at`.
    pub fn open_at(&self, match_id: &str, opened_at: Timestamp) -> QueueResult<()> {
        let mut entries = self.lock();
        match entries.entry(match_id.to_owned()) {
            Entry::Occupied(_) => Err(QueueError::DuplicateMatch(match_id.to_owned())),
            Entry::Vacant(slot) => {
                slot.insert(opened_at);
                tracing::debug!(
                    target: TRACING_TARGET_QUEUE,
                    match_id = %match_id,
                    "Match opened"
                );
                Ok(())
            }
        }
    }

    /// Whether `match_id` is open.
    pub fn is_open(&self, match_id: &str) -> bool {
        self.lock().contains_key(match_id)
    }

    /// Removes `match_id`. Exactly one of any concurrent `finalize` and
    /// `sweep` calls wins an entry.
    pub fn finalize(&self, match_id: &str) -> QueueResult<()> {
        match self.lock().remove(match_id) {
            Some(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_QUEUE,
                    match_id = %match_id,
                    "Match finalized"
                );
                Ok(())
            }
            None => Err(QueueError::UnknownMatch(match_id.to_owned())),
        }
    }

    /// Removes and returns every entry older than the timeout as of `now`,
    /// sorted by id.
    pub fn sweep(&self, now: Timestamp) -> Vec<String> {
        self.sweep_except(now, |_| false)
    }

    /// Like [`PendingQueue::sweep`], but keeps entries for which `busy`
    /// returns true, however old. `busy` runs under the queue lock.
    pub fn sweep_except(&self, now: Timestamp, busy: impl Fn(&str) -> bool) -> Vec<String> {
        let mut expired = Vec::new();
        {
            let mut entries = self.lock();
            entries.retain(|match_id, opened_at| {
                let alive = now.duration_since(*opened_at) <= self.timeout || busy(match_id);
                if !alive {
                    expired.push(match_id.clone());
                }
                alive
            });
        }

        expired.sort_unstable();
        if !expired.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_QUEUE,
                expired = expired.len(),
                "Swept abandoned matches"
            );
        }
        expired
    }

    /// Number of open matches.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Timestamp>> {
        // A panic while holding the lock leaves the map consistent; every
        // critical section is a single map operation.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::UNIX_EPOCH + SignedDuration::from_secs(secs)
    }

    #[test]
    fn open_twice_is_duplicate() -> anyhow::Result<()> {
        let queue = PendingQueue::default();
        queue.open_at("m", at(0))?;

        assert_eq!(
            queue.open_at("m", at(5)),
            Err(QueueError::DuplicateMatch("m".to_owned()))
        );
        assert_eq!(queue.len(), 1);
        Ok(())
    }

    #[test]
    fn second_finalize_is_unknown() -> anyhow::Result<()> {
        let queue = PendingQueue::default();
        queue.open_at("m", at(0))?;
        queue.finalize("m")?;

        assert_eq!(
            queue.finalize("m"),
            Err(QueueError::UnknownMatch("m".to_owned()))
        );
        assert!(!queue.is_open("m"));
        assert!(queue.is_empty());
        Ok(())
    }

    #[test]
    fn sweep_respects_timeout_boundary() -> anyhow::Result<()> {
        let queue = PendingQueue::new(SignedDuration::from_hours(3));
        queue.open_at("m", at(0))?;

        assert!(queue.sweep(at(3 * 3600)).is_empty());
        assert_eq!(queue.sweep(at(3 * 3600 + 1)), vec!["m".to_owned()]);
        Ok(())
    }

    #[test]
    fn uploaded_match_is_not_swept_and_abandoned_match_is_swept_once() -> anyhow::Result<()> {
        let hour = 3600;
        let queue = PendingQueue::new(SignedDuration::from_hours(3));
        queue.open_at("M1", at(0))?;
        queue.open_at("M2", at(0))?;

        // M1 gets its demo at t=1h.
        queue.finalize("M1")?;
        assert!(!queue.sweep(at(hour)).contains(&"M1".to_owned()));

        assert_eq!(queue.sweep(at(3 * hour + 1)), vec!["M2".to_owned()]);
        assert!(queue.sweep(at(4 * hour)).is_empty());
        assert!(queue.sweep(at(100 * hour)).is_empty());
        Ok(())
    }

    #[test]
    fn busy_entries_outlive_the_timeout() -> anyhow::Result<()> {
        let queue = PendingQueue::new(SignedDuration::from_secs(10));
        queue.open_at("busy", at(0))?;
        queue.open_at("idle", at(0))?;

        let expired = queue.sweep_except(at(60), |match_id| match_id == "busy");
        assert_eq!(expired, vec!["idle".to_owned()]);
        assert!(queue.is_open("busy"));

        assert_eq!(queue.sweep(at(60)), vec!["busy".to_owned()]);
        Ok(())
    }

    #[test]
    fn finalize_after_sweep_is_unknown() -> anyhow::Result<()> {
        let queue = PendingQueue::new(SignedDuration::from_secs(10));
        queue.open_at("m", at(0))?;
        queue.sweep(at(11));

        assert_eq!(
            queue.finalize("m"),
            Err(QueueError::UnknownMatch("m".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn concurrent_sweeps_report_each_id_once() -> anyhow::Result<()> {
        let queue = Arc::new(PendingQueue::new(SignedDuration::from_secs(1)));
        for i in 0..500 {
            queue.open_at(&format!("m{i}"), at(0))?;
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || queue.sweep(at(60)))
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            let swept = handle
                .join()
                .map_err(|_| anyhow::anyhow!("sweep thread panicked"))?;
            total += swept.len();
            seen.extend(swept);
        }

        assert_eq!(total, 500);
        assert_eq!(seen.len(), 500);
        Ok(())
    }

    #[test]
    fn finalize_and_sweep_race_has_one_winner() -> anyhow::Result<()> {
        let queue = Arc::new(PendingQueue::new(SignedDuration::from_secs(1)));
        for i in 0..200 {
            queue.open_at(&format!("m{i}"), at(0))?;
        }

        let finalizer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                (0..200)
                    .filter(|i| queue.finalize(&format!("m{i}")).is_ok())
                    .count()
            })
        };
        let swept = queue.sweep(at(60)).len();
        let finalized = finalizer
            .join()
            .map_err(|_| anyhow::anyhow!("finalize thread panicked"))?;

        assert_eq!(swept + finalized, 200);
        assert!(queue.is_empty());
        Ok(())
    }
}
