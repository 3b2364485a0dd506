//! Device session abstraction.
//!
//! The [`DeviceSession`] trait is the coordinator's only view of the
//! session transport: strength commands, pulse-queue management, and
//! rebind after a disconnect. Inbound traffic (strength snapshots,
//! feedback buttons, disconnect notices) arrives as [`DeviceEvent`]s
//! over an mpsc channel owned by whoever constructed the session.
//!
//! The trait uses `&self` with interior mutability so the session can be
//! shared behind an `Arc` across the router, the periodic tasks, and the
//! damage bridge.

use std::fmt;

use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::waveform::PulseSegment;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// One of the two independent device output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel A.
    A,
    /// Channel B.
    B,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Strength command operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthOp {
    /// Set the channel strength to an absolute value.
    SetTo,
    /// Increase the channel strength by a delta.
    Increase,
    /// Decrease the channel strength by a delta.
    Decrease,
}

/// The device's self-reported strengths and limits.
///
/// Each snapshot fully replaces the previous one (last-value-wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrengthSnapshot {
    /// Current strength on channel A.
    pub a: u32,
    /// Current strength on channel B.
    pub b: u32,
    /// Hard strength limit on channel A.
    pub a_limit: u32,
    /// Hard strength limit on channel B.
    pub b_limit: u32,
}

impl StrengthSnapshot {
    /// Returns the (strength, limit) pair for a channel.
    #[must_use]
    pub const fn channel(&self, channel: Channel) -> (u32, u32) {
        match channel {
            Channel::A => (self.a, self.a_limit),
            Channel::B => (self.b, self.b_limit),
        }
    }
}

/// Inbound event from the device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Fresh strength snapshot.
    Strength(StrengthSnapshot),
    /// The remote app pressed a feedback button (informational).
    Feedback(u8),
    /// The remote client disconnected; the coordinator should rebind.
    Disconnected,
}

/// Async command surface of the device session collaborator.
#[async_trait::async_trait]
pub trait DeviceSession: Send + Sync {
    /// Issues a strength command on one channel.
    async fn set_strength(&self, channel: Channel, op: StrengthOp, value: u32) -> Result<()>;

    /// Clears the channel's queued pulse segments.
    async fn clear_pulses(&self, channel: Channel) -> Result<()>;

    /// Appends pulse segments to the channel's queue.
    ///
    /// The device caps the number of queued segments per submission;
    /// callers are responsible for sizing `segments` accordingly.
    async fn add_pulses(&self, channel: Channel, segments: &[PulseSegment]) -> Result<()>;

    /// Re-establishes the session after a reported disconnect.
    ///
    /// Suspends until the handshake completes.
    async fn rebind(&self) -> Result<()>;
}

// ============================================================================
// In-Memory Session
// ============================================================================

/// In-memory device session for dry runs and tests.
///
/// Applies strength commands to an internal [`StrengthSnapshot`]
/// (clamped to the channel limit) and echoes the result back as a
/// [`DeviceEvent::Strength`], mimicking the device's 1 Hz-ish report
/// loop with zero latency. Pulse-queue calls are counted and dropped.
pub struct SimSession {
    snapshot: std::sync::Mutex<StrengthSnapshot>,
    events: mpsc::Sender<DeviceEvent>,
    pulses_queued: std::sync::atomic::AtomicUsize,
}

impl SimSession {
    /// Creates a session with the given channel limits, plus the event
    /// receiver to feed the coordinator.
    #[must_use]
    pub fn new(a_limit: u32, b_limit: u32) -> (Self, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let session = Self {
            snapshot: std::sync::Mutex::new(StrengthSnapshot {
                a: 0,
                b: 0,
                a_limit,
                b_limit,
            }),
            events: tx,
            pulses_queued: std::sync::atomic::AtomicUsize::new(0),
        };
        (session, rx)
    }

    /// Emits the initial snapshot, as a freshly bound device would.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the event channel is gone.
    pub async fn announce(&self) -> Result<()> {
        let snap = *self.snapshot.lock().expect("snapshot lock");
        self.emit(DeviceEvent::Strength(snap)).await
    }

    /// Emits a disconnect notice, as the remote app closing would.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the event channel is gone.
    pub async fn disconnect(&self) -> Result<()> {
        self.emit(DeviceEvent::Disconnected).await
    }

    /// Total number of segments queued via [`DeviceSession::add_pulses`].
    #[must_use]
    pub fn pulses_queued(&self) -> usize {
        self.pulses_queued.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn emit(&self, event: DeviceEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| SessionError::Closed("event feed dropped".to_string()))
    }
}

#[async_trait::async_trait]
impl DeviceSession for SimSession {
    async fn set_strength(&self, channel: Channel, op: StrengthOp, value: u32) -> Result<()> {
        let snap = {
            let mut snap = self.snapshot.lock().expect("snapshot lock");
            let (current, limit) = snap.channel(channel);
            let next = match op {
                StrengthOp::SetTo => value,
                StrengthOp::Increase => current.saturating_add(value),
                StrengthOp::Decrease => current.saturating_sub(value),
            }
            .min(limit);
            match channel {
                Channel::A => snap.a = next,
                Channel::B => snap.b = next,
            }
            *snap
        };
        self.emit(DeviceEvent::Strength(snap)).await
    }

    async fn clear_pulses(&self, _channel: Channel) -> Result<()> {
        Ok(())
    }

    async fn add_pulses(&self, _channel: Channel, segments: &[PulseSegment]) -> Result<()> {
        self.pulses_queued
            .fetch_add(segments.len(), std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn rebind(&self) -> Result<()> {
        self.announce().await
    }
}
