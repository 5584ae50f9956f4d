//! Progress persistence driven from the frame loop.
//!
//! On start the record for the signed-in user is requested. A missing record
//! registers a new player with an immediate save. Afterwards every change
//! arms a trailing debounce, and a single save goes out once the player has
//! been quiet for `save_debounce_ms`. A failed save re-arms the debounce.
//!
//! A failed load leaves play running as an unsynced new player. Saves stay
//! suspended and the load is retried every `load_retry_ms`, so an outage can
//! never overwrite a stored record with an empty one.

use bevy_ecs::prelude::*;
use quarry_config::PersistenceConfig;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::pending::{Pending, poll_slot};
use crate::traits::{AuthService, AuthUser, ProgressRecord, ProgressStore, ProgressUpdate};

/// The local values a save writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalProgress {
    pub tokens: u64,
    pub total_mined: u64,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Stored progress arrived. Callers add it to whatever was earned locally
    /// before the load completed, then call `mark_changed` if that was
    /// anything, since the pending debounce is dropped here.
    Loaded(ProgressRecord),
    NewPlayer,
    LoadFailed(ServiceError),
    Saved,
    SaveFailed(ServiceError),
}

#[derive(Debug)]
enum LoadState {
    NoUser,
    Loading(Pending<Option<ProgressRecord>>),
    Retrying { at: u64 },
    Ready,
}

#[derive(Resource, Debug)]
pub struct ProgressSync {
    config: PersistenceConfig,
    user: Option<AuthUser>,
    load: LoadState,
    changed_at: Option<u64>,
    saving: Option<Pending<()>>,
}

impl ProgressSync {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            user: None,
            load: LoadState::NoUser,
            changed_at: None,
            saving: None,
        }
    }

    /// Requests the stored record for the signed-in user, if there is one.
    pub fn start(&mut self, auth: &dyn AuthService, store: &dyn ProgressStore) {
        self.user = auth.current_user();
        self.load = match &self.user {
            Some(user) => {
                info!(user = %user.id, "Loading progress");
                LoadState::Loading(store.load_progress(&user.id))
            }
            None => {
                info!("No signed-in user, progress will not be persisted");
                LoadState::NoUser
            }
        };
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    /// True once the stored record is known (loaded or confirmed absent).
    pub fn is_synced(&self) -> bool {
        matches!(self.load, LoadState::Ready)
    }

    pub fn save_in_flight(&self) -> bool {
        self.saving.is_some()
    }

    /// Arms (or re-arms) the save debounce.
    pub fn mark_changed(&mut self, now: u64) {
        if self.user.is_some() {
            self.changed_at = Some(now);
        }
    }

    /// Advances the load and save state machines.
    pub fn poll(
        &mut self,
        now: u64,
        store: &dyn ProgressStore,
        local: &LocalProgress,
    ) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        self.poll_load(now, store, local, &mut events);
        self.poll_save(now, &mut events);

        let due = self
            .changed_at
            .is_some_and(|at| now.saturating_sub(at) >= self.config.save_debounce_ms);
        if due && self.is_synced() && self.saving.is_none() {
            self.changed_at = None;
            self.begin_save(now, store, local);
        }
        events
    }

    fn poll_load(
        &mut self,
        now: u64,
        store: &dyn ProgressStore,
        local: &LocalProgress,
        events: &mut Vec<ProgressEvent>,
    ) {
        let Some(user_id) = self.user.as_ref().map(|u| u.id.clone()) else {
            return;
        };

        if let LoadState::Retrying { at } = self.load {
            if now >= at {
                info!(user = %user_id, "Retrying progress load");
                self.load = LoadState::Loading(store.load_progress(&user_id));
            }
        }

        let result = match &mut self.load {
            LoadState::Loading(pending) => pending.poll(),
            _ => None,
        };

        match result {
            Some(Ok(Some(record))) => {
                info!(tokens = record.tokens, total_mined = record.total_mined, "Progress loaded");
                self.load = LoadState::Ready;
                self.changed_at = None;
                events.push(ProgressEvent::Loaded(record));
            }
            Some(Ok(None)) => {
                info!(user = %user_id, "No stored progress, registering new player");
                self.load = LoadState::Ready;
                events.push(ProgressEvent::NewPlayer);
                self.begin_save(now, store, local);
            }
            Some(Err(e)) => {
                warn!("Progress load failed, continuing unsynced: {e}");
                self.load = LoadState::Retrying {
                    at: now.saturating_add(self.config.load_retry_ms),
                };
                events.push(ProgressEvent::LoadFailed(e));
            }
            None => {}
        }
    }

    fn poll_save(&mut self, now: u64, events: &mut Vec<ProgressEvent>) {
        match poll_slot(&mut self.saving) {
            Some(Ok(())) => events.push(ProgressEvent::Saved),
            Some(Err(e)) => {
                warn!("Progress save failed, will retry: {e}");
                self.changed_at.get_or_insert(now);
                events.push(ProgressEvent::SaveFailed(e));
            }
            None => {}
        }
    }

    fn begin_save(&mut self, now: u64, store: &dyn ProgressStore, local: &LocalProgress) {
        let Some(user) = &self.user else {
            return;
        };
        let update = ProgressUpdate {
            username: user.username.clone(),
            tokens: local.tokens,
            total_mined: local.total_mined,
            public_key: local.public_key.clone().or_else(|| user.wallet_public_key.clone()),
            updated_at: now,
        };
        self.saving = Some(store.save_progress(&user.id, update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;

    const DEBOUNCE: u64 = 1_000;

    fn local(tokens: u64, total_mined: u64) -> LocalProgress {
        LocalProgress {
            tokens,
            total_mined,
            public_key: None,
        }
    }

    fn signed_in() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.sign_in("u1", "alice", Some("pub-alice"));
        backend
    }

    #[test]
    fn test_existing_record_is_loaded() {
        let backend = signed_in();
        backend.put_record(
            "u1",
            ProgressRecord {
                username: "alice".into(),
                tokens: 4_000,
                total_mined: 3,
                public_key: Some("pub-alice".into()),
                updated_at: 0,
            },
        );
        let mut sync = ProgressSync::new(PersistenceConfig::default());
        sync.start(&backend, &backend);
        let events = sync.poll(0, &backend, &local(0, 0));
        assert!(matches!(&events[..], [ProgressEvent::Loaded(r)] if r.tokens == 4_000));
        assert!(sync.is_synced());
    }

    #[test]
    fn test_new_player_is_registered() {
        let backend = signed_in();
        let mut sync = ProgressSync::new(PersistenceConfig::default());
        sync.start(&backend, &backend);
        let events = sync.poll(0, &backend, &local(0, 0));
        assert_eq!(events, vec![ProgressEvent::NewPlayer, ProgressEvent::Saved]);
        assert_eq!(backend.save_count(), 1);
        let record = backend.record("u1").unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.public_key.as_deref(), Some("pub-alice"));
    }

    #[test]
    fn test_changes_are_debounced_into_one_save() {
        let backend = signed_in();
        let mut sync = ProgressSync::new(PersistenceConfig::default());
        sync.start(&backend, &backend);
        sync.poll(0, &backend, &local(0, 0));
        sync.poll(1, &backend, &local(0, 0));
        let baseline = backend.save_count();

        for (t, tokens) in [(100, 500), (400, 1_000), (700, 1_500)] {
            sync.mark_changed(t);
            sync.poll(t, &backend, &local(tokens, tokens / 500));
        }
        sync.poll(700 + DEBOUNCE - 1, &backend, &local(1_500, 3));
        assert_eq!(backend.save_count(), baseline);

        sync.poll(700 + DEBOUNCE, &backend, &local(1_500, 3));
        sync.poll(700 + DEBOUNCE + 1, &backend, &local(1_500, 3));
        assert_eq!(backend.save_count(), baseline + 1);
        assert_eq!(backend.record("u1").unwrap().tokens, 1_500);
    }

    #[test]
    fn test_failed_save_retries_next_window() {
        let backend = signed_in();
        let mut sync = ProgressSync::new(PersistenceConfig::default());
        sync.start(&backend, &backend);
        sync.poll(0, &backend, &local(0, 0));
        sync.poll(1, &backend, &local(0, 0));

        backend.fail_saves(true);
        sync.mark_changed(10);
        sync.poll(10 + DEBOUNCE, &backend, &local(500, 1));
        let events = sync.poll(11 + DEBOUNCE, &backend, &local(500, 1));
        assert!(matches!(&events[..], [ProgressEvent::SaveFailed(_)]));

        backend.fail_saves(false);
        sync.poll(11 + 2 * DEBOUNCE, &backend, &local(500, 1));
        sync.poll(12 + 2 * DEBOUNCE, &backend, &local(500, 1));
        assert_eq!(backend.record("u1").unwrap().tokens, 500);
    }

    #[test]
    fn test_load_failure_suspends_saves_and_retries() {
        let backend = signed_in();
        backend.put_record(
            "u1",
            ProgressRecord {
                username: "alice".into(),
                tokens: 9_000,
                total_mined: 9,
                public_key: None,
                updated_at: 0,
            },
        );
        backend.fail_loads(true);
        let config = PersistenceConfig::default();
        let mut sync = ProgressSync::new(config.clone());
        sync.start(&backend, &backend);

        let events = sync.poll(0, &backend, &local(0, 0));
        assert!(matches!(&events[..], [ProgressEvent::LoadFailed(_)]));

        sync.mark_changed(100);
        sync.poll(100 + DEBOUNCE, &backend, &local(1_000, 1));
        assert_eq!(backend.record("u1").unwrap().tokens, 9_000, "stored record untouched");

        backend.fail_loads(false);
        sync.poll(config.load_retry_ms - 1, &backend, &local(1_000, 1));
        let events = sync.poll(config.load_retry_ms, &backend, &local(1_000, 1));
        assert!(matches!(&events[..], [ProgressEvent::Loaded(r)] if r.tokens == 9_000));
        assert_eq!(backend.save_count(), 0, "no save until the caller merges");
    }

    #[test]
    fn test_no_user_never_saves() {
        let backend = InMemoryBackend::new();
        let mut sync = ProgressSync::new(PersistenceConfig::default());
        sync.start(&backend, &backend);
        sync.mark_changed(0);
        assert!(sync.poll(5_000, &backend, &local(100, 1)).is_empty());
        assert_eq!(backend.save_count(), 0);
    }
}
