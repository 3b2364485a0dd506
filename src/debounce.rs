//! Debounced toggle primitive.
//!
//! A press starts a hold timer; a release before expiry cancels with no
//! effect; expiry performs the configured action exactly once and clears
//! the pending state. Re-pressing while a delay is outstanding restarts
//! it. Each instance has at most one outstanding delay, and cancellation
//! is idempotent.
//!
//! Used for the chatbox toggle and the per-channel interactive-mode
//! toggles, where an accidental tap must not flip device behavior.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default hold duration before the action fires.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(1);

/// A delayed, cancellable action trigger.
#[derive(Debug)]
pub struct DebouncedToggle {
    hold: Duration,
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    // Generation guards against a stale timer firing after a re-press:
    // only the task whose generation is still current may act.
    generation: AtomicU64,
    pending: Mutex<Option<CancellationToken>>,
}

impl Default for DebouncedToggle {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD)
    }
}

impl DebouncedToggle {
    /// Creates a toggle with the given hold duration.
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            inner: Arc::new(Inner {
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Registers a press: starts (or restarts) the hold timer, running
    /// `action` if it expires without a release.
    pub fn press<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();

        if let Some(prev) = self
            .inner
            .pending
            .lock()
            .expect("debounce lock")
            .replace(token.clone())
        {
            prev.cancel();
        }

        let inner = Arc::clone(&self.inner);
        let hold = self.hold;
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(hold) => {
                    if inner.generation.load(Ordering::SeqCst) == generation {
                        *inner.pending.lock().expect("debounce lock") = None;
                        action().await;
                    }
                }
            }
        });
    }

    /// Registers a release: cancels any pending delay. Idempotent.
    pub fn release(&self) {
        if let Some(token) = self.inner.pending.lock().expect("debounce lock").take() {
            token.cancel();
        }
    }

    /// Whether a delay is currently outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.lock().expect("debounce lock").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counter() -> (Arc<AtomicU32>, impl Fn() + Clone) {
        let count = Arc::new(AtomicU32::new(0));
        let fired = Arc::clone(&count);
        (count, move || {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_within_hold_cancels() {
        let toggle = DebouncedToggle::default();
        let (count, fire) = counter();

        toggle.press(move || async move { fire() });
        settle().await;
        tokio::time::advance(Duration::from_millis(500)).await;
        toggle.release();
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!toggle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_press_fires_exactly_once() {
        let toggle = DebouncedToggle::default();
        let (count, fire) = counter();

        // The timer task has to be polled so its sleep registers before
        // the clock moves.
        toggle.press(move || async move { fire() });
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!toggle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repress_restarts_delay() {
        let toggle = DebouncedToggle::default();
        let (count, fire) = counter();

        let fire2 = fire.clone();
        toggle.press(move || async move { fire() });
        settle().await;
        tokio::time::advance(Duration::from_millis(900)).await;
        settle().await;

        // Re-press just before expiry: the clock starts over
        toggle.press(move || async move { fire2() });
        settle().await;
        tokio::time::advance(Duration::from_millis(900)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_is_idempotent() {
        let toggle = DebouncedToggle::default();
        let (count, fire) = counter();

        toggle.press(move || async move { fire() });
        settle().await;
        toggle.release();
        toggle.release();
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
