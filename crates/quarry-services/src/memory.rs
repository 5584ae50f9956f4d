//! In-process backend implementing every collaborator trait.
//!
//! Used by the headless simulator and tests. Requests resolve immediately
//! unless deferred mode is on, in which case they queue until [`flush`]
//! so callers can observe in-flight states. Each collaborator can be told to
//! fail.
//!
//! [`flush`]: InMemoryBackend::flush

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::error::ServiceError;
use crate::pending::{Completer, Pending, pending};
use crate::traits::{
    AuthService, AuthUser, LeaderboardEntry, ProgressChange, ProgressRecord, ProgressStore,
    ProgressUpdate, WalletService, WithdrawalReceipt,
};

type Job = Box<dyn FnOnce(&mut MemoryState) + Send>;

#[derive(Default)]
struct MemoryState {
    user: Option<AuthUser>,
    records: HashMap<String, ProgressRecord>,
    subscribers: Vec<Sender<ProgressChange>>,
    transfers: Vec<(String, u64, String)>,
    deferred: bool,
    queue: Vec<Job>,
    fail_loads: bool,
    fail_saves: bool,
    fail_withdrawals: Option<String>,
    saves: usize,
    leaderboard_queries: usize,
}

/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `job` now, or queues it in deferred mode.
    fn submit<T: Send + 'static>(
        &self,
        job: impl FnOnce(&mut MemoryState) -> Result<T, ServiceError> + Send + 'static,
    ) -> Pending<T> {
        let (completer, pending) = pending::<T>();
        let run = move |state: &mut MemoryState| completer.complete(job(state));
        let mut state = self.lock();
        if state.deferred {
            state.queue.push(Box::new(run));
        } else {
            run(&mut *state);
        }
        pending
    }

    // --- Test and simulator controls ---

    pub fn sign_in(&self, id: &str, username: &str, public_key: Option<&str>) {
        self.lock().user = Some(AuthUser {
            id: id.to_string(),
            username: username.to_string(),
            wallet_public_key: public_key.map(str::to_string),
        });
    }

    pub fn put_record(&self, user_id: &str, record: ProgressRecord) {
        self.lock().records.insert(user_id.to_string(), record);
    }

    pub fn record(&self, user_id: &str) -> Option<ProgressRecord> {
        self.lock().records.get(user_id).cloned()
    }

    pub fn set_deferred(&self, deferred: bool) {
        self.lock().deferred = deferred;
    }

    /// Resolves every queued request in submission order.
    pub fn flush(&self) {
        let mut state = self.lock();
        let jobs = std::mem::take(&mut state.queue);
        for job in jobs {
            job(&mut *state);
        }
    }

    pub fn fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    pub fn fail_withdrawals(&self, message: Option<&str>) {
        self.lock().fail_withdrawals = message.map(str::to_string);
    }

    /// Completed transfers as `(public_key, amount, signature)`.
    pub fn transfers(&self) -> Vec<(String, u64, String)> {
        self.lock().transfers.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn leaderboard_queries(&self) -> usize {
        self.lock().leaderboard_queries
    }
}

impl AuthService for InMemoryBackend {
    fn current_user(&self) -> Option<AuthUser> {
        self.lock().user.clone()
    }

    fn sign_out(&self) -> Pending<()> {
        self.submit(|state| {
            state.user = None;
            Ok(())
        })
    }
}

impl ProgressStore for InMemoryBackend {
    fn load_progress(&self, user_id: &str) -> Pending<Option<ProgressRecord>> {
        let user_id = user_id.to_string();
        self.submit(move |state| {
            if state.fail_loads {
                return Err(ServiceError::Unavailable("progress table unreachable".into()));
            }
            Ok(state.records.get(&user_id).cloned())
        })
    }

    fn save_progress(&self, user_id: &str, update: ProgressUpdate) -> Pending<()> {
        let user_id = user_id.to_string();
        self.submit(move |state| {
            if state.fail_saves {
                return Err(ServiceError::Unavailable("progress table unreachable".into()));
            }
            state.saves += 1;
            let change = ProgressChange {
                user_id: user_id.clone(),
                tokens: update.tokens,
            };
            let public_key = update
                .public_key
                .or_else(|| state.records.get(&user_id).and_then(|r| r.public_key.clone()));
            state.records.insert(
                user_id,
                ProgressRecord {
                    username: update.username,
                    tokens: update.tokens,
                    total_mined: update.total_mined,
                    public_key,
                    updated_at: update.updated_at,
                },
            );
            state.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
            Ok(())
        })
    }

    fn load_leaderboard(&self, limit: usize) -> Pending<Vec<LeaderboardEntry>> {
        self.submit(move |state| {
            state.leaderboard_queries += 1;
            let mut entries: Vec<LeaderboardEntry> = state
                .records
                .values()
                .map(|r| LeaderboardEntry {
                    username: r.username.clone(),
                    tokens: r.tokens,
                    total_mined: r.total_mined,
                })
                .collect();
            entries.sort_by(|a, b| b.tokens.cmp(&a.tokens));
            entries.truncate(limit);
            Ok(entries)
        })
    }

    fn subscribe_changes(&self) -> Receiver<ProgressChange> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock().subscribers.push(tx);
        rx
    }
}

impl WalletService for InMemoryBackend {
    fn request_withdrawal(&self, public_key: &str, amount: u64) -> Pending<WithdrawalReceipt> {
        let public_key = public_key.to_string();
        self.submit(move |state| {
            if let Some(message) = &state.fail_withdrawals {
                return Err(ServiceError::Rejected(message.clone()));
            }
            if amount == 0 {
                return Err(ServiceError::Rejected("nothing to transfer".into()));
            }
            let signature = format!("sig-{}-{amount}", state.transfers.len() + 1);
            debug!(%public_key, amount, %signature, "Transfer settled");
            state.transfers.push((public_key, amount, signature.clone()));
            Ok(WithdrawalReceipt { signature })
        })
    }
}
