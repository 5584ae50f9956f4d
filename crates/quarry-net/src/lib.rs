//! Realtime channel boundary: pub/sub broadcast plus presence, the
//! in-process loopback hub, outbound throttling, and reconnect backoff.

pub mod channel;
pub mod error;
pub mod loopback;
pub mod reconnection;
pub mod throttle;

pub use channel::{
    ChannelEvent, ConnectionState, ConnectionStateWatch, Envelope, PresenceMeta, RealtimeChannel,
    SessionKey,
};
pub use error::ChannelError;
pub use loopback::{LoopbackChannel, LoopbackHub};
pub use reconnection::{ReconnectConfig, ReconnectState};
pub use throttle::BroadcastThrottle;
