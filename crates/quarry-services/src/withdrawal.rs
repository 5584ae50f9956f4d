//! At most one token transfer in flight.

use bevy_ecs::prelude::*;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::pending::Pending;
use crate::traits::{WalletService, WithdrawalReceipt};

#[derive(Resource, Debug, Default)]
pub struct WithdrawalFlow {
    in_flight: Option<(u64, Pending<WithdrawalReceipt>)>,
}

impl WithdrawalFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a transfer. Returns `false` if one is already running.
    pub fn request(&mut self, wallet: &dyn WalletService, public_key: &str, amount: u64) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        info!(amount, "Withdrawal requested");
        self.in_flight = Some((amount, wallet.request_withdrawal(public_key, amount)));
        true
    }

    /// Returns the requested amount and the outcome once the transfer settles.
    pub fn poll(&mut self) -> Option<(u64, Result<WithdrawalReceipt, ServiceError>)> {
        let (amount, pending) = self.in_flight.as_mut()?;
        let result = pending.poll()?;
        let amount = *amount;
        self.in_flight = None;
        if let Err(e) = &result {
            warn!(amount, "Withdrawal failed: {e}");
        }
        Some((amount, result))
    }
}
