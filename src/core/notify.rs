//! Drain notification and flush completion awaitables.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// Callback invoked every time the queue drains.
pub type DrainCallback = Arc<dyn Fn() + Send + Sync>;

/// How drain transitions are reported, fixed when the queue is built.
pub(crate) enum DrainNotifier {
    /// Repeatable callback, invoked on every drain.
    Callback(DrainCallback),
    /// Single-shot awaitables; all pending ones settle on the next drain and
    /// later calls to `drained()` get fresh ones.
    Awaitable { waiters: Vec<oneshot::Sender<()>> },
}

impl DrainNotifier {
    pub fn awaitable() -> Self {
        Self::Awaitable {
            waiters: Vec::new(),
        }
    }

    pub const fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Register a waiter for the next drain. `None` in callback mode.
    pub fn register(&mut self) -> Option<oneshot::Receiver<()>> {
        match self {
            Self::Callback(_) => None,
            Self::Awaitable { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Some(rx)
            }
        }
    }

    /// Capture what has to be signalled for one drain transition.
    ///
    /// Awaitable waiters are taken so the next registration starts a new
    /// cycle.
    pub fn take_signal(&mut self) -> DrainSignal {
        match self {
            Self::Callback(cb) => DrainSignal::Callback(Arc::clone(cb)),
            Self::Awaitable { waiters } => DrainSignal::Waiters(std::mem::take(waiters)),
        }
    }
}

impl fmt::Debug for DrainNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("DrainNotifier::Callback"),
            Self::Awaitable { waiters } => f
                .debug_struct("DrainNotifier::Awaitable")
                .field("waiters", &waiters.len())
                .finish(),
        }
    }
}

/// A drain transition captured under the state lock, fired after release.
pub(crate) enum DrainSignal {
    Callback(DrainCallback),
    Waiters(Vec<oneshot::Sender<()>>),
}

impl fmt::Debug for DrainSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("DrainSignal::Callback"),
            Self::Waiters(waiters) => write!(f, "DrainSignal::Waiters({})", waiters.len()),
        }
    }
}

impl DrainSignal {
    pub fn fire(self) {
        match self {
            Self::Callback(cb) => cb(),
            Self::Waiters(waiters) => {
                for waiter in waiters {
                    // Receivers dropped by callers who stopped waiting.
                    let _ = waiter.send(());
                }
            }
        }
    }
}

/// Awaitable that settles the next time the queue drains.
///
/// Obtained from `TaskQueue::drained`. Settles immediately when the queue
/// was already idle at the time it was requested.
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct Drained {
    rx: Option<oneshot::Receiver<()>>,
}

impl Drained {
    pub(crate) const fn ready() -> Self {
        Self { rx: None }
    }

    pub(crate) const fn pending(rx: oneshot::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }
}

impl Future for Drained {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.rx.as_mut() {
            None => Poll::Ready(()),
            // A cancelled waiter means the queue itself is gone; nothing is
            // left to drain.
            Some(rx) => Pin::new(rx).poll(cx).map(|_| ()),
        }
    }
}

/// Awaitable returned by `TaskQueue::flush`.
///
/// Settles once every task that was active or backlogged when the flush
/// started has settled, successfully or not.
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct FlushHandle {
    rx: oneshot::Receiver<()>,
}

impl FlushHandle {
    pub(crate) const fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx }
    }
}

impl Future for FlushHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}
