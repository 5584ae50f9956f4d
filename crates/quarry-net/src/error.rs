/// Errors surfaced by a [`RealtimeChannel`](crate::RealtimeChannel).
///
/// All of them are transient from the game's point of view: they are logged
/// and the reconnect loop takes over.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("channel closed by the hub")]
    Closed,
    #[error("connection refused")]
    Refused,
}
