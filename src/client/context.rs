//! Cancellation and deadlines for blocking client calls.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancelled {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Context carries a caller's cancellation signal and deadline into every
/// blocking call made on its behalf.
///
/// Contexts are cheap to clone; clones share the same cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`Context`] created from it. Dropping the handle does not
/// cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Context::default()
    }

    /// A context with an explicit cancel handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Context {
                deadline: None,
                cancel: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    /// Derives a context that also expires after `timeout`. An earlier
    /// parent deadline wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Context {
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, if it is.
    pub fn err(&self) -> Option<Cancelled> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Cancelled::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `fut` to completion unless the context is cancelled or its
    /// deadline passes first, in which case `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if let Some(reason) = self.err() {
            return Err(reason);
        }
        let mut cancel = self.cancel.clone();
        tokio::select! {
            output = fut => Ok(output),
            _ = wait_cancelled(cancel.as_mut()) => Err(Cancelled::Cancelled),
            _ = wait_deadline(self.deadline) => Err(Cancelled::DeadlineExceeded),
        }
    }

    /// Sleeps for `duration`, waking early if the context is done.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.run(tokio::time::sleep(duration)).await
    }
}

async fn wait_cancelled(rx: Option<&mut watch::Receiver<bool>>) {
    let Some(rx) = rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // A dropped handle can never cancel.
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
