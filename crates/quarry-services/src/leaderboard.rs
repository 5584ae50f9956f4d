//! Top-N leaderboard refreshed from the progress change stream.
//!
//! A burst of change notifications arms a trailing debounce; one refresh
//! request goes out after `leaderboard_debounce_ms` of quiet.

use bevy_ecs::prelude::*;
use crossbeam_channel::Receiver;
use quarry_config::PersistenceConfig;
use tracing::{debug, warn};

use crate::pending::{Pending, poll_slot};
use crate::traits::{LeaderboardEntry, ProgressChange, ProgressStore};

#[derive(Resource, Debug)]
pub struct Leaderboard {
    size: usize,
    debounce_ms: u64,
    changes: Option<Receiver<ProgressChange>>,
    dirty_since: Option<u64>,
    refreshing: Option<Pending<Vec<LeaderboardEntry>>>,
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            size: config.leaderboard_size,
            debounce_ms: config.leaderboard_debounce_ms,
            changes: None,
            dirty_since: None,
            refreshing: None,
            entries: Vec::new(),
        }
    }

    /// Subscribes to changes and requests the initial listing.
    pub fn start(&mut self, store: &dyn ProgressStore) {
        self.changes = Some(store.subscribe_changes());
        self.refreshing = Some(store.load_leaderboard(self.size));
    }

    /// Highest tokens first.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Returns `true` when the listing was replaced during this call.
    pub fn poll(&mut self, now: u64, store: &dyn ProgressStore) -> bool {
        let received = self.changes.as_ref().map_or(0, |rx| rx.try_iter().count());
        if received > 0 {
            self.dirty_since = Some(now);
        }

        let mut updated = false;
        match poll_slot(&mut self.refreshing) {
            Some(Ok(mut entries)) => {
                entries.sort_by(|a, b| {
                    b.tokens
                        .cmp(&a.tokens)
                        .then_with(|| a.username.cmp(&b.username))
                });
                entries.truncate(self.size);
                debug!(count = entries.len(), "Leaderboard refreshed");
                self.entries = entries;
                updated = true;
            }
            Some(Err(e)) => warn!("Leaderboard refresh failed: {e}"),
            None => {}
        }

        let due = self
            .dirty_since
            .is_some_and(|at| now.saturating_sub(at) >= self.debounce_ms);
        if due && self.refreshing.is_none() {
            self.dirty_since = None;
            self.refreshing = Some(store.load_leaderboard(self.size));
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::traits::{ProgressRecord, ProgressUpdate};

    fn update(name: &str, tokens: u64) -> ProgressUpdate {
        ProgressUpdate {
            username: name.to_string(),
            tokens,
            total_mined: tokens / 1_000,
            public_key: None,
            updated_at: 0,
        }
    }

    #[test]
    fn test_initial_listing_sorted_and_truncated() {
        let backend = InMemoryBackend::new();
        for (i, tokens) in [3_000u64, 9_000, 1_000, 5_000].into_iter().enumerate() {
            backend.put_record(
                &format!("u{i}"),
                ProgressRecord {
                    username: format!("p{i}"),
                    tokens,
                    total_mined: 0,
                    public_key: None,
                    updated_at: 0,
                },
            );
        }
        let mut board = Leaderboard::new(&PersistenceConfig {
            leaderboard_size: 3,
            ..Default::default()
        });
        board.start(&backend);
        assert!(board.poll(0, &backend));
        let tokens: Vec<u64> = board.entries().iter().map(|e| e.tokens).collect();
        assert_eq!(tokens, vec![9_000, 5_000, 3_000]);
    }

    #[test]
    fn test_burst_triggers_one_debounced_refresh() {
        let backend = InMemoryBackend::new();
        let mut board = Leaderboard::new(&PersistenceConfig::default());
        board.start(&backend);
        board.poll(0, &backend);
        let baseline = backend.leaderboard_queries();

        for t in 0..5u64 {
            backend.save_progress(&format!("u{t}"), update("x", t * 100));
            board.poll(t * 100, &backend);
        }
        board.poll(400 + 999, &backend);
        assert_eq!(backend.leaderboard_queries(), baseline);

        board.poll(400 + 1_000, &backend);
        assert_eq!(backend.leaderboard_queries(), baseline + 1);
        assert!(board.poll(400 + 1_001, &backend));
        assert_eq!(board.entries().len(), 5);
    }
}
