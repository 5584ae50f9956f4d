/// Errors reported by backend collaborators. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("request dropped before completing")]
    Dropped,
}
