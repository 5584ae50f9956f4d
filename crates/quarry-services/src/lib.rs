//! Backend collaborators (auth, progress persistence, wallet transfers) and
//! the frame-driven flows that talk to them without blocking.

pub mod error;
pub mod leaderboard;
pub mod memory;
pub mod pending;
pub mod progress;
pub mod traits;
pub mod withdrawal;

pub use error::ServiceError;
pub use leaderboard::Leaderboard;
pub use memory::InMemoryBackend;
pub use pending::{Completer, Pending, pending};
pub use progress::{LocalProgress, ProgressEvent, ProgressSync};
pub use traits::{
    AuthService, AuthUser, Backend, LeaderboardEntry, ProgressChange, ProgressRecord, ProgressStore,
    ProgressUpdate, WalletService, WithdrawalReceipt,
};
pub use withdrawal::WithdrawalFlow;
