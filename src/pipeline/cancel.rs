//! One-shot cancellation shared by every thread of a pipeline run.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::Receiver;
use parking_lot::Mutex;

type Closer = Box<dyn FnOnce() + Send>;

/// A broadcast stop signal.
///
/// Raising it is idempotent. Workers poll [`is_cancelled`] between
/// records, and every queue registered with [`close_on_cancel`] is closed
/// so that threads blocked on a full or empty queue wake up.
///
/// [`is_cancelled`]: CancelToken::is_cancelled
/// [`close_on_cancel`]: CancelToken::close_on_cancel
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    raised: AtomicBool,
    closers: Mutex<Vec<Closer>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if self.inner.raised.swap(true, Ordering::SeqCst) {
            return;
        }
        let closers = std::mem::take(&mut *self.inner.closers.lock());
        for close in closers {
            close();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Run `f` when the token is raised, or now if it already was.
    pub fn on_cancel(&self, f: impl FnOnce() + Send + 'static) {
        let mut closers = self.inner.closers.lock();
        if self.is_cancelled() {
            drop(closers);
            f();
        } else {
            closers.push(Box::new(f));
        }
    }

    /// Close `queue` when the token is raised.
    pub fn close_on_cancel<T: Send + 'static>(&self, queue: &Receiver<T>) {
        let queue = queue.clone();
        self.on_cancel(move || {
            queue.close();
        });
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
