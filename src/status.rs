//! Status broadcaster.
//!
//! Publishes a multi-line status string to the remote chatbox every few
//! seconds while enabled. Disabling publishes one empty string (clearing
//! the remote display) and then stays silent until re-enabled.

use std::sync::Arc;

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::device::Channel;
use crate::osc::OscPublisher;
use crate::state::CoordinatorState;
use crate::waveform;

/// Cadence of status publishes.
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(3);

/// Backoff after a failed publish.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Renders the status string for the current coordinator state.
///
/// Before the first snapshot there is nothing meaningful to show, so a
/// fixed "not connected" message is rendered instead.
#[must_use]
pub fn render(state: &CoordinatorState) -> String {
    let Some(snap) = state.snapshot() else {
        return "device not connected".to_string();
    };

    let mode = |channel: Channel| {
        if state.channel(channel).interactive() {
            "interactive"
        } else {
            "panel"
        }
    };
    let pulse_name = |channel: Channel| {
        waveform::get(state.channel(channel).waveform_index()).map_or("?", |w| w.name)
    };
    let current = match state.selected_channel() {
        Channel::A => format!("[A]: {} B: {}", snap.a, snap.b),
        Channel::B => format!("A: {} [B]: {}", snap.a, snap.b),
    };

    format!(
        "MAX A: {} B: {}\n\
         Mode A: {} B: {}\n\
         Pulse A: {} B: {}\n\
         Fire Step: {}\n\
         Current: {}",
        snap.a_limit,
        snap.b_limit,
        mode(Channel::A),
        mode(Channel::B),
        pulse_name(Channel::A),
        pulse_name(Channel::B),
        state.fire_step(),
        current,
    )
}

/// Spawns the broadcast task.
pub fn spawn(
    state: Arc<CoordinatorState>,
    publisher: Arc<dyn OscPublisher>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Starts true so a coordinator launched with the chatbox off
        // still clears any stale remote display once.
        let mut was_enabled = true;
        let mut interval = tokio::time::interval(BROADCAST_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("status broadcaster stopped");
                    break;
                }
                _ = interval.tick() => {}
            }

            let result = if state.chatbox_enabled() {
                was_enabled = true;
                publisher.publish_status(&render(&state)).await
            } else if was_enabled {
                // Only a successful clear counts; a failed one is
                // retried after the backoff.
                let cleared = publisher.publish_status("").await;
                if cleared.is_ok() {
                    was_enabled = false;
                }
                cleared
            } else {
                Ok(())
            };

            if let Err(e) = result {
                warn!(error = %e, "status publish failed; backing off");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    })
}
