//! The local player record.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable account identifier issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret that never leaves the local session: not serializable and
/// redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalSecret(String);

impl LocalSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LocalSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalSecret(..)")
    }
}

/// Wallet key pair. The public key is shared with the transfer and
/// persistence collaborators; the private key stays local.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletKeys {
    pub public_key: Option<String>,
    pub private_key: Option<LocalSecret>,
}

/// State owned by the local session. `tokens` and `total_mined` change only
/// through [`WorldStore`](crate::WorldStore) transitions.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: PlayerId,
    pub username: String,
    pub wallet: WalletKeys,
    pub(crate) tokens: u64,
    pub(crate) total_mined: u64,
    pub position: Vec3,
    pub yaw: f32,
}

impl LocalPlayer {
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            wallet: WalletKeys::default(),
            tokens: 0,
            total_mined: 0,
            position: Vec3::ZERO,
            yaw: 0.0,
        }
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn total_mined(&self) -> u64 {
        self.total_mined
    }
}
