//! One-shot request handles polled from the frame loop.
//!
//! A collaborator returns a [`Pending`] immediately and resolves it later
//! through the paired [`Completer`]. The frame loop calls
//! [`Pending::poll`] once per tick; nothing blocks.

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::ServiceError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Receiving half of an in-flight request.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<ServiceResult<T>>,
}

/// Sending half of an in-flight request.
#[derive(Debug)]
pub struct Completer<T> {
    tx: oneshot::Sender<ServiceResult<T>>,
}

/// Creates a linked completer/pending pair.
pub fn pending<T>() -> (Completer<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Pending { rx })
}

impl<T> Pending<T> {
    /// Already-resolved handle.
    pub fn ready(result: ServiceResult<T>) -> Self {
        let (completer, pending) = pending();
        completer.complete(result);
        pending
    }

    /// Returns the result once available. A completer dropped without
    /// answering resolves to [`ServiceError::Dropped`]. Must not be polled
    /// again after it returned `Some`.
    pub fn poll(&mut self) -> Option<ServiceResult<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(ServiceError::Dropped)),
        }
    }
}

impl<T> Completer<T> {
    pub fn complete(self, result: ServiceResult<T>) {
        // Requester may be gone.
        let _ = self.tx.send(result);
    }
}

/// Polls an optional in-flight request, clearing the slot once it resolves.
pub fn poll_slot<T>(slot: &mut Option<Pending<T>>) -> Option<ServiceResult<T>> {
    let result = slot.as_mut()?.poll()?;
    *slot = None;
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_on_later_poll() {
        let (completer, mut pending) = pending::<u32>();
        assert!(pending.poll().is_none());
        completer.complete(Ok(7));
        assert_eq!(pending.poll(), Some(Ok(7)));
    }

    #[test]
    fn test_dropped_completer() {
        let (completer, mut pending) = pending::<u32>();
        drop(completer);
        assert_eq!(pending.poll(), Some(Err(ServiceError::Dropped)));
    }

    #[test]
    fn test_poll_slot_clears() {
        let mut slot = Some(Pending::ready(Ok(1u8)));
        assert_eq!(poll_slot(&mut slot), Some(Ok(1)));
        assert!(slot.is_none());
        assert_eq!(poll_slot(&mut slot), None);
    }
}
