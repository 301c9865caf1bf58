//! One-shot handle for a pending throttle request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::ThrottleError;

/// Outcome of one throttle request: the delay that was applied, or why the
/// request was not admitted.
pub type ThrottleResult = std::result::Result<Duration, ThrottleError>;

/// Resolves exactly once with the [`ThrottleResult`] of a throttle request.
///
/// Dropping the handle does not cancel the request; the admission task runs
/// to completion either way.
#[derive(Debug)]
#[must_use = "a throttle handle does nothing unless awaited"]
pub struct ThrottleHandle {
    rx: oneshot::Receiver<ThrottleResult>,
}

impl ThrottleHandle {
    /// Create a connected sender/handle pair.
    pub(crate) fn channel() -> (oneshot::Sender<ThrottleResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Handle that is already resolved with `result`.
    #[cfg(test)]
    pub(crate) fn ready(result: ThrottleResult) -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(result);
        handle
    }
}

impl Future for ThrottleHandle {
    type Output = ThrottleResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ThrottleError::Aborted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[tokio::test]
    async fn test_ready_handle() {
        let handle = ThrottleHandle::ready(Err(ThrottleError::DeadlineExceeded));
        assert_eq!(handle.await, Err(ThrottleError::DeadlineExceeded));
    }

    #[test]
    fn test_pending_until_sent() {
        let (tx, handle) = ThrottleHandle::channel();
        let mut handle = task::spawn(handle);

        assert_pending!(handle.poll());

        tx.send(Ok(Duration::from_millis(5))).unwrap();
        assert!(handle.is_woken());
        assert_ready_eq!(handle.poll(), Ok(Duration::from_millis(5)));
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_aborted() {
        let (tx, handle) = ThrottleHandle::channel();
        drop(tx);
        assert_eq!(handle.await, Err(ThrottleError::Aborted));
    }
}
