//! Process-wide cancellation signal

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Cloneable shutdown signal
///
/// Triggering is sticky: a worker that starts waiting after the trigger
/// returns immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    triggered: AtomicBool,
    notify: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create an untriggered signal
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel::<()>(1);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                notify,
            }),
        }
    }

    /// Trigger the signal. Returns `false` if it was already triggered.
    pub fn trigger(&self) -> bool {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        // No receiver is fine: late waiters see the flag
        let _ = self.inner.notify.send(());
        true
    }

    /// Signal has been triggered
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once the signal is triggered
    pub async fn cancelled(&self) {
        let mut rx = self.inner.notify.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}
