//! Collaborator interfaces and the records they exchange.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::pending::Pending;

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub wallet_public_key: Option<String>,
}

/// Persisted player-progress row, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub username: String,
    pub tokens: u64,
    pub total_mined: u64,
    pub public_key: Option<String>,
    /// Unix milliseconds of the last write.
    pub updated_at: u64,
}

/// Fields written by a progress save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub username: String,
    pub tokens: u64,
    pub total_mined: u64,
    pub public_key: Option<String>,
    pub updated_at: u64,
}

/// Change notification from the progress table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressChange {
    pub user_id: String,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub tokens: u64,
    pub total_mined: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub signature: String,
}

pub trait AuthService: Send + Sync {
    /// Signed-in user, if any. Progress load and save require one.
    fn current_user(&self) -> Option<AuthUser>;

    fn sign_out(&self) -> Pending<()>;
}

pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` means the user has no record yet.
    fn load_progress(&self, user_id: &str) -> Pending<Option<ProgressRecord>>;

    fn save_progress(&self, user_id: &str, update: ProgressUpdate) -> Pending<()>;

    /// Top players by tokens, highest first.
    fn load_leaderboard(&self, limit: usize) -> Pending<Vec<LeaderboardEntry>>;

    /// Stream of row changes, for leaderboard refresh.
    fn subscribe_changes(&self) -> Receiver<ProgressChange>;
}

pub trait WalletService: Send + Sync {
    /// Transfers `amount` tokens to `public_key`.
    fn request_withdrawal(&self, public_key: &str, amount: u64) -> Pending<WithdrawalReceipt>;
}

/// Handles to every backend collaborator.
#[derive(Resource, Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthService>,
    pub progress: Arc<dyn ProgressStore>,
    pub wallet: Arc<dyn WalletService>,
}

impl Backend {
    /// Uses one service for every collaborator.
    pub fn from_shared<S>(service: S) -> Self
    where
        S: AuthService + ProgressStore + WalletService + 'static,
    {
        let service = Arc::new(service);
        Self {
            auth: service.clone(),
            progress: service.clone(),
            wallet: service,
        }
    }
}
