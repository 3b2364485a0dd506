//! Fire-mode state machine.
//!
//! A fire sequence is a temporary strength boost held while a control is
//! pressed: IDLE → ARMED on press, ARMED → IDLE on release. At most one
//! sequence may be armed process-wide, covering both channels; fire is
//! a rare, user-intentional action, so sequences for A and B simply
//! serialize against each other.
//!
//! Each transition issues one strength command and then suspends on the
//! coordinator's confirmation wait until the device reports a fresh
//! snapshot. The wait has no timeout: an unresponsive session stalls
//! fire mode indefinitely (known limitation, matches the source device
//! protocol's lack of command acks).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::device::{Channel, DeviceSession, Result, StrengthOp};
use crate::error::StateError;
use crate::state::CoordinatorState;

/// Fixed delay before evaluating a start/stop request, absorbing the
/// duplicate press/release edges the avatar feed produces.
pub const PRECHECK_DELAY: Duration = Duration::from_millis(10);

/// Process-wide fire-mode controller.
#[derive(Debug, Default)]
pub struct FireController {
    // Spans the device call and the confirmation wait; the one critical
    // section in the crate that covers multiple suspension points.
    sequence: Mutex<()>,
    active: AtomicBool,
    origin_a: AtomicU32,
    origin_b: AtomicU32,
}

impl FireController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fire sequence is currently armed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Requests a transition: `engage` arms, `!engage` restores.
    ///
    /// Conflicting requests (start while armed, stop while idle) are
    /// rejected with a debug log and no state change.
    ///
    /// # Errors
    ///
    /// Returns the session error if the strength command fails; the
    /// controller is returned to a consistent state first and no retry
    /// is attempted.
    pub async fn set_active(
        &self,
        engage: bool,
        channel: Channel,
        step: u32,
        state: &CoordinatorState,
        device: &dyn DeviceSession,
    ) -> Result<()> {
        tokio::time::sleep(PRECHECK_DELAY).await;

        if engage && self.is_active() {
            debug!(%channel, "{}", StateError::AlreadyArmed);
            return Ok(());
        }
        if !engage && !self.is_active() {
            debug!(%channel, "{}", StateError::NotArmed);
            return Ok(());
        }

        let _guard = self.sequence.lock().await;
        if engage {
            self.start(channel, step, state, device).await
        } else {
            self.stop(channel, state, device).await
        }
    }

    async fn start(
        &self,
        channel: Channel,
        step: u32,
        state: &CoordinatorState,
        device: &dyn DeviceSession,
    ) -> Result<()> {
        // Another sequence may have armed while we waited for the lock
        if self.active.swap(true, Ordering::SeqCst) {
            debug!(%channel, "{}", StateError::AlreadyArmed);
            return Ok(());
        }

        let Some(snapshot) = state.snapshot() else {
            // Without a snapshot there is no origin to restore to, and
            // the confirmation wait would stall until one arrives.
            self.active.store(false, Ordering::SeqCst);
            debug!(%channel, "fire start ignored: no device snapshot yet");
            return Ok(());
        };

        let (origin, limit) = snapshot.channel(channel);
        self.origin(channel).store(origin, Ordering::SeqCst);
        let target = origin.saturating_add(step).min(limit);
        info!(%channel, origin, target, "fire armed");

        let confirmed = state.confirmation();
        if let Err(e) = device
            .set_strength(channel, StrengthOp::SetTo, target)
            .await
        {
            self.active.store(false, Ordering::SeqCst);
            return Err(e);
        }
        confirmed.await;
        Ok(())
    }

    async fn stop(
        &self,
        channel: Channel,
        state: &CoordinatorState,
        device: &dyn DeviceSession,
    ) -> Result<()> {
        if !self.is_active() {
            debug!(%channel, "{}", StateError::NotArmed);
            return Ok(());
        }

        let origin = self.origin(channel).load(Ordering::SeqCst);
        info!(%channel, origin, "fire released");

        let confirmed = state.confirmation();
        let result = device
            .set_strength(channel, StrengthOp::SetTo, origin)
            .await;
        if result.is_ok() {
            confirmed.await;
        }
        // Idle again even on failure; no retry inside fire mode
        self.active.store(false, Ordering::SeqCst);
        result
    }

    const fn origin(&self, channel: Channel) -> &AtomicU32 {
        match channel {
            Channel::A => &self.origin_a,
            Channel::B => &self.origin_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceEvent, SimSession};
    use std::sync::Arc;

    /// Forwards sim snapshots into the coordinator state, standing in
    /// for the device event loop.
    fn forward_snapshots(
        state: Arc<CoordinatorState>,
        mut rx: tokio::sync::mpsc::Receiver<DeviceEvent>,
    ) {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let DeviceEvent::Strength(snap) = event {
                    state.apply_snapshot(snap);
                }
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_idle_is_noop() {
        let state = Arc::new(CoordinatorState::new());
        let (session, mut rx) = SimSession::new(100, 100);
        let fire = FireController::new();

        fire.set_active(false, Channel::A, 30, &state, &session)
            .await
            .unwrap();

        assert!(!fire.is_active());
        // No command was issued, so the sim emitted nothing
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_snapshot_is_ignored() {
        let state = Arc::new(CoordinatorState::new());
        let (session, mut rx) = SimSession::new(100, 100);
        let fire = FireController::new();

        fire.set_active(true, Channel::A, 30, &state, &session)
            .await
            .unwrap();

        assert!(!fire.is_active());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop_restores_origin() {
        let state = Arc::new(CoordinatorState::new());
        let (session, rx) = SimSession::new(100, 100);
        let session = Arc::new(session);
        forward_snapshots(Arc::clone(&state), rx);

        session
            .set_strength(Channel::A, StrengthOp::SetTo, 10)
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(state.channel(Channel::A).strength(), 10);

        let fire = FireController::new();
        fire.set_active(true, Channel::A, 30, &state, session.as_ref())
            .await
            .unwrap();
        assert!(fire.is_active());
        assert_eq!(state.channel(Channel::A).strength(), 40);

        fire.set_active(false, Channel::A, 30, &state, session.as_ref())
            .await
            .unwrap();
        assert!(!fire.is_active());
        assert_eq!(state.channel(Channel::A).strength(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_clamped_to_limit() {
        let state = Arc::new(CoordinatorState::new());
        let (session, rx) = SimSession::new(100, 100);
        let session = Arc::new(session);
        forward_snapshots(Arc::clone(&state), rx);

        session
            .set_strength(Channel::B, StrengthOp::SetTo, 90)
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let fire = FireController::new();
        fire.set_active(true, Channel::B, 30, &state, session.as_ref())
            .await
            .unwrap();
        assert_eq!(state.channel(Channel::B).strength(), 100);
    }
}
