//! Multiplayer layer: presence payloads, remote-player reconciliation,
//! roster dedup by stable user id, chat, and outbound presence sync.

pub mod chat;
pub mod color;
pub mod presence;
pub mod remote;
pub mod roster;
pub mod sync;

pub use chat::{ChatLog, ChatMessage, ChatRejection, RateTracker};
pub use color::player_color;
pub use presence::PresencePayload;
pub use remote::RemotePlayer;
pub use roster::RemoteRoster;
pub use sync::{InboundSummary, PresenceSync};
