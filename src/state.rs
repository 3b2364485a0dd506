//! Shared coordinator state.
//!
//! One [`CoordinatorState`] instance is constructed at startup and passed
//! by `Arc` into every component: the router, both periodic tasks, the
//! fire controller, and the damage bridge. There are no ambient
//! singletons.
//!
//! The scalars are atomics written on a last-writer-wins basis: device
//! state is idempotently re-asserted every scheduler cycle, so a lost
//! update is corrected within one cadence. The only cross-await-point
//! mutual exclusion in the crate lives in the fire controller, not here.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::device::{Channel, StrengthSnapshot};
use crate::waveform;

/// Per-channel mutable state.
#[derive(Debug)]
pub struct ChannelState {
    strength: AtomicU32,
    limit: AtomicU32,
    waveform: AtomicUsize,
    interactive: AtomicBool,
}

impl ChannelState {
    fn new(waveform_index: usize) -> Self {
        Self {
            strength: AtomicU32::new(0),
            limit: AtomicU32::new(0),
            waveform: AtomicUsize::new(waveform_index),
            interactive: AtomicBool::new(false),
        }
    }

    /// Current strength as last reported by the device.
    #[must_use]
    pub fn strength(&self) -> u32 {
        self.strength.load(Ordering::SeqCst)
    }

    /// Hard strength limit as last reported by the device.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.load(Ordering::SeqCst)
    }

    /// Overrides the recorded strength, clamped to the limit.
    ///
    /// Used by the damage bridge to re-base the fire origin before a
    /// death penalty; normal updates come from snapshots.
    pub fn override_strength(&self, value: u32) {
        let clamped = value.min(self.limit());
        self.strength.store(clamped, Ordering::SeqCst);
    }

    /// Selected waveform catalog index.
    #[must_use]
    pub fn waveform_index(&self) -> usize {
        self.waveform.load(Ordering::SeqCst)
    }

    /// Selects a waveform; out-of-catalog indices are ignored.
    pub fn select_waveform(&self, index: usize) {
        if index < waveform::CATALOG.len() {
            self.waveform.store(index, Ordering::SeqCst);
        }
    }

    /// Whether interactive (proximity-driven) mode is on.
    #[must_use]
    pub fn interactive(&self) -> bool {
        self.interactive.load(Ordering::SeqCst)
    }

    /// Flips interactive mode; returns the new value.
    pub fn toggle_interactive(&self) -> bool {
        self.interactive.fetch_xor(true, Ordering::SeqCst) ^ true
    }
}

/// Process-wide coordinator state shared by all components.
#[derive(Debug)]
pub struct CoordinatorState {
    a: ChannelState,
    b: ChannelState,
    selected: AtomicU8,
    panel_control: AtomicBool,
    chatbox_enabled: AtomicBool,
    fire_step: AtomicU32,
    online: AtomicBool,
    has_snapshot: AtomicBool,
    snapshot_seq: watch::Sender<u64>,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorState {
    /// Default fire-mode strength step.
    pub const DEFAULT_FIRE_STEP: u32 = 30;

    /// Creates state with default settings: channel A selected, panel
    /// control and chatbox on, device offline, no snapshot seen.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: ChannelState::new(0),
            b: ChannelState::new(0),
            selected: AtomicU8::new(0),
            panel_control: AtomicBool::new(true),
            chatbox_enabled: AtomicBool::new(true),
            fire_step: AtomicU32::new(Self::DEFAULT_FIRE_STEP),
            online: AtomicBool::new(false),
            has_snapshot: AtomicBool::new(false),
            snapshot_seq: watch::Sender::new(0),
        }
    }

    /// The state for one channel.
    #[must_use]
    pub const fn channel(&self, channel: Channel) -> &ChannelState {
        match channel {
            Channel::A => &self.a,
            Channel::B => &self.b,
        }
    }

    /// Applies a fresh device snapshot (full replacement) and wakes any
    /// task waiting on [`Self::confirmation`].
    pub fn apply_snapshot(&self, snap: StrengthSnapshot) {
        self.a.strength.store(snap.a, Ordering::SeqCst);
        self.a.limit.store(snap.a_limit, Ordering::SeqCst);
        self.b.strength.store(snap.b, Ordering::SeqCst);
        self.b.limit.store(snap.b_limit, Ordering::SeqCst);
        self.has_snapshot.store(true, Ordering::SeqCst);
        self.snapshot_seq.send_modify(|seq| *seq += 1);
    }

    /// Whether at least one snapshot has ever been received.
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot.load(Ordering::SeqCst)
    }

    /// Reconstructs the latest snapshot, or `None` before the first one.
    #[must_use]
    pub fn snapshot(&self) -> Option<StrengthSnapshot> {
        if !self.has_snapshot() {
            return None;
        }
        Some(StrengthSnapshot {
            a: self.a.strength(),
            b: self.b.strength(),
            a_limit: self.a.limit(),
            b_limit: self.b.limit(),
        })
    }

    /// A confirmation wait: resolves once a snapshot newer than the
    /// moment of this call arrives.
    ///
    /// Create the future BEFORE issuing the device command, then await
    /// it after; the captured sequence number is what makes it a
    /// barrier rather than a race. Snapshots that arrived earlier do
    /// not satisfy the wait.
    #[must_use]
    pub fn confirmation(&self) -> impl std::future::Future<Output = ()> + Send + use<> {
        let mut rx = self.snapshot_seq.subscribe();
        async move {
            // Err means the state was dropped; nothing left to confirm.
            let _ = rx.changed().await;
        }
    }

    /// Channel targeted by single-channel panel commands.
    #[must_use]
    pub fn selected_channel(&self) -> Channel {
        if self.selected.load(Ordering::SeqCst) == 0 {
            Channel::A
        } else {
            Channel::B
        }
    }

    /// Sets the selected channel.
    pub fn select_channel(&self, channel: Channel) {
        let raw = match channel {
            Channel::A => 0,
            Channel::B => 1,
        };
        self.selected.store(raw, Ordering::SeqCst);
    }

    /// Whether the panel-control gate is open.
    #[must_use]
    pub fn panel_control(&self) -> bool {
        self.panel_control.load(Ordering::SeqCst)
    }

    /// Opens or closes the panel-control gate.
    pub fn set_panel_control(&self, enabled: bool) {
        self.panel_control.store(enabled, Ordering::SeqCst);
    }

    /// Whether status broadcasting is enabled.
    #[must_use]
    pub fn chatbox_enabled(&self) -> bool {
        self.chatbox_enabled.load(Ordering::SeqCst)
    }

    /// Enables or disables status broadcasting.
    pub fn set_chatbox_enabled(&self, enabled: bool) {
        self.chatbox_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Flips status broadcasting; returns the new value.
    pub fn toggle_chatbox(&self) -> bool {
        self.chatbox_enabled.fetch_xor(true, Ordering::SeqCst) ^ true
    }

    /// Fire-mode strength step.
    #[must_use]
    pub fn fire_step(&self) -> u32 {
        self.fire_step.load(Ordering::SeqCst)
    }

    /// Sets the fire-mode strength step.
    pub fn set_fire_step(&self, step: u32) {
        self.fire_step.store(step, Ordering::SeqCst);
    }

    /// Whether the device session is currently bound.
    #[must_use]
    pub fn online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Marks the device session online or offline.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}
