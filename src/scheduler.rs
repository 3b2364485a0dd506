//! Waveform scheduler.
//!
//! Periodically refills both device pulse queues from the catalog, and
//! services immediate "set waveform now" overrides. The periodic task
//! never terminates: session errors are logged, backed off, and the
//! cadence resumes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::{Channel, DeviceSession};
use crate::error::{PulselinkError, StateError};
use crate::state::CoordinatorState;
use crate::waveform::{self, OVERRIDE_REPEATS};

/// Cadence of the periodic pulse-queue refill.
pub const REFILL_INTERVAL: Duration = Duration::from_secs(3);

/// Backoff after a failed refill before rejoining the cadence.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Spawns the refill task.
///
/// Nothing is submitted until the first strength snapshot arrives; the
/// device rejects pulse data before it has announced itself.
pub fn spawn(
    state: Arc<CoordinatorState>,
    device: Arc<dyn DeviceSession>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REFILL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("waveform scheduler stopped");
                    break;
                }
                _ = interval.tick() => {}
            }

            if !state.has_snapshot() {
                continue;
            }

            if let Err(e) = refill(&state, device.as_ref()).await {
                warn!(error = %e, "pulse queue refill failed; backing off");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    })
}

/// One refill pass: clear and resubmit each channel's selected waveform.
async fn refill(state: &CoordinatorState, device: &dyn DeviceSession) -> crate::device::Result<()> {
    for channel in [Channel::A, Channel::B] {
        let index = state.channel(channel).waveform_index();
        let Some(wf) = waveform::get(index) else {
            // select_waveform bounds-checks, so this only trips if the
            // catalog shrinks across versions
            continue;
        };
        debug!(%channel, waveform = wf.name, "refilling pulse queue");
        device.clear_pulses(channel).await?;
        device.add_pulses(channel, &wf.repeated(wf.repeats())).await?;
    }
    Ok(())
}

/// Immediately switches a channel to a new waveform, bypassing the
/// cadence: clears the queue, submits three repeats, and updates the
/// selection so the next periodic cycle continues from it.
///
/// # Errors
///
/// Returns [`StateError::WaveformOutOfRange`] for an unknown index, or
/// the session error if a device call fails.
pub async fn set_waveform_now(
    state: &CoordinatorState,
    device: &dyn DeviceSession,
    channel: Channel,
    index: usize,
) -> crate::error::Result<()> {
    let Some(wf) = waveform::get(index) else {
        return Err(StateError::WaveformOutOfRange {
            index,
            size: waveform::CATALOG.len(),
        }
        .into());
    };

    state.channel(channel).select_waveform(index);
    info!(%channel, waveform = wf.name, "waveform override");
    device
        .clear_pulses(channel)
        .await
        .map_err(PulselinkError::from)?;
    device
        .add_pulses(channel, &wf.repeated(OVERRIDE_REPEATS))
        .await
        .map_err(PulselinkError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{SimSession, StrengthOp};

    #[tokio::test]
    async fn test_override_queues_three_repeats_and_selects() {
        let (session, _rx) = SimSession::new(100, 100);
        let state = CoordinatorState::new();

        set_waveform_now(&state, &session, Channel::B, 10)
            .await
            .unwrap();

        let ripple = waveform::get(10).unwrap();
        assert_eq!(session.pulses_queued(), ripple.segments.len() * 3);
        assert_eq!(state.channel(Channel::B).waveform_index(), 10);
    }

    #[tokio::test]
    async fn test_override_rejects_out_of_range() {
        let (session, _rx) = SimSession::new(100, 100);
        let state = CoordinatorState::new();

        let err = set_waveform_now(&state, &session, Channel::A, 99)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PulselinkError::State(StateError::WaveformOutOfRange { index: 99, .. })
        ));
        assert_eq!(session.pulses_queued(), 0);
        assert_eq!(state.channel(Channel::A).waveform_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_waits_for_snapshot() {
        let (session, _rx) = SimSession::new(100, 100);
        let session = Arc::new(session);
        let state = Arc::new(CoordinatorState::new());
        let cancel = CancellationToken::new();

        let handle = spawn(Arc::clone(&state), Arc::clone(&session) as _, cancel.clone());

        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.pulses_queued(), 0, "no snapshot, no submission");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_refills_after_snapshot() {
        let (session, mut rx) = SimSession::new(100, 100);
        let session = Arc::new(session);
        let state = Arc::new(CoordinatorState::new());
        let cancel = CancellationToken::new();

        // Seed a snapshot through a strength command
        session
            .set_strength(Channel::A, StrengthOp::SetTo, 0)
            .await
            .unwrap();
        if let Some(crate::device::DeviceEvent::Strength(snap)) = rx.recv().await {
            state.apply_snapshot(snap);
        }

        let handle = spawn(Arc::clone(&state), Arc::clone(&session) as _, cancel.clone());

        tokio::time::advance(Duration::from_secs(4)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // Default waveform (index 0, short) on both channels, 5 repeats each
        let breathe = waveform::get(0).unwrap();
        assert!(session.pulses_queued() >= breathe.segments.len() * 5 * 2);

        cancel.cancel();
        handle.await.unwrap();
    }
}
