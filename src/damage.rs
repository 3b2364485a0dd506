//! Game-overlay damage bridge.
//!
//! Consumes JSON event frames from the game overlay's WebSocket feed and
//! turns them into channel-A strength: damage accumulates into a percent
//! (capped at 100), a once-per-second decay tick bleeds it off and
//! re-asserts the mapped strength, and a death triggers a timed
//! fire-mode penalty held in its own task while decay and frame intake
//! keep running. The bridge never touches channel B.
//!
//! The accumulator is authoritative here, not on the device: the decay
//! tick overwrites whatever strength the device reports, except while a
//! fire sequence is armed or the session is offline.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::DamageConfig;
use crate::device::{Channel, DeviceSession, StrengthOp};
use crate::error::{ConfigError, ProtocolError};
use crate::fire::FireController;
use crate::state::CoordinatorState;

/// Cadence of the damage decay tick.
pub const DECAY_INTERVAL: Duration = Duration::from_secs(1);

/// Accumulator ceiling, in percent.
pub const MAX_PERCENT: u32 = 100;

/// One event frame from the overlay feed.
///
/// Frames carry more fields than these; everything unrecognized is
/// ignored so overlay updates don't break the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "Type")]
pub enum OverlayEvent {
    /// The player took damage.
    #[serde(rename = "DAMAGED")]
    Damaged {
        /// Damage amount, in percent points.
        #[serde(rename = "Value")]
        value: u32,
    },
    /// The player survived the round.
    #[serde(rename = "SAVED")]
    Saved,
    /// Life-state change; `false` means the player died.
    #[serde(rename = "ALIVE")]
    Alive {
        /// Whether the player is alive.
        #[serde(rename = "Value")]
        alive: bool,
    },
    /// End-of-round statistics (informational).
    #[serde(rename = "STATS")]
    Stats,
    /// The overlay identified the local player.
    #[serde(rename = "CONNECTED")]
    Connected {
        /// Player display name.
        #[serde(rename = "DisplayName", default)]
        display_name: String,
    },
}

/// Validated damage tuning, resolved from [`DamageConfig`].
#[derive(Debug, Clone)]
pub struct DamageSettings {
    /// Percent removed per decay tick.
    pub decay_per_tick: u32,
    /// Channel-A strength at 100 % accumulated damage.
    pub strength_multiplier: u32,
    /// Fire-mode step used for the death penalty.
    pub penalty_strength: u32,
    /// Death-penalty hold duration.
    pub penalty_duration: Duration,
}

impl DamageSettings {
    /// Resolves the raw config section into typed settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the penalty duration is unparsable.
    pub fn from_config(config: &DamageConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            decay_per_tick: config.decay_per_tick,
            strength_multiplier: config.strength_multiplier,
            penalty_strength: config.penalty_strength,
            penalty_duration: config.penalty_duration()?,
        })
    }
}

impl Default for DamageSettings {
    fn default() -> Self {
        Self {
            decay_per_tick: 2,
            strength_multiplier: 60,
            penalty_strength: 30,
            penalty_duration: Duration::from_secs(5),
        }
    }
}

/// Damage-to-strength bridge.
pub struct DamageBridge {
    state: Arc<CoordinatorState>,
    device: Arc<dyn DeviceSession>,
    fire: Arc<FireController>,
    settings: DamageSettings,
    percent: AtomicU32,
    overlay_online: AtomicBool,
    penalty_active: AtomicBool,
}

impl DamageBridge {
    /// Creates an idle bridge.
    #[must_use]
    pub fn new(
        state: Arc<CoordinatorState>,
        device: Arc<dyn DeviceSession>,
        fire: Arc<FireController>,
        settings: DamageSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            device,
            fire,
            settings,
            percent: AtomicU32::new(0),
            overlay_online: AtomicBool::new(false),
            penalty_active: AtomicBool::new(false),
        })
    }

    /// Current accumulated damage percent.
    #[must_use]
    pub fn percent(&self) -> u32 {
        self.percent.load(Ordering::SeqCst)
    }

    /// Whether the overlay feed is currently connected.
    #[must_use]
    pub fn overlay_online(&self) -> bool {
        self.overlay_online.load(Ordering::SeqCst)
    }

    /// Records overlay feed connectivity (driven by the feed task).
    pub fn set_overlay_online(&self, online: bool) {
        self.overlay_online.store(online, Ordering::SeqCst);
        info!(online, "overlay feed state changed");
    }

    /// Parses one raw frame and applies it. Malformed frames are dropped
    /// at debug level.
    pub async fn handle_frame(self: &Arc<Self>, raw: &str) {
        match serde_json::from_str::<OverlayEvent>(raw) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => debug!("{}", ProtocolError::Json(e)),
        }
    }

    /// Applies one overlay event.
    pub async fn handle_event(self: &Arc<Self>, event: OverlayEvent) {
        match event {
            OverlayEvent::Damaged { value } => {
                let next = self.percent().saturating_add(value).min(MAX_PERCENT);
                self.percent.store(next, Ordering::SeqCst);
                info!(damage = value, percent = next, "damage taken");
            }
            OverlayEvent::Saved => {
                self.percent.store(0, Ordering::SeqCst);
                info!("player saved; damage cleared");
                if !self.state.online() {
                    return;
                }
                // A still-armed sequence (usually a held death penalty)
                // would restore its origin on release and overwrite the
                // zero, so end it first.
                if self.fire.is_active() {
                    if let Err(e) = self
                        .fire
                        .set_active(false, Channel::A, 0, &self.state, self.device.as_ref())
                        .await
                    {
                        warn!(error = %e, "fire release on save failed");
                    }
                }
                if let Err(e) = self
                    .device
                    .set_strength(Channel::A, StrengthOp::SetTo, 0)
                    .await
                {
                    warn!(error = %e, "failed to zero channel after save");
                }
            }
            OverlayEvent::Alive { alive } => {
                if !alive {
                    self.percent.store(MAX_PERCENT, Ordering::SeqCst);
                    warn!(
                        hold = ?self.settings.penalty_duration,
                        "player died; applying penalty"
                    );
                    self.spawn_death_penalty();
                }
            }
            OverlayEvent::Stats => trace!("round stats ignored"),
            OverlayEvent::Connected { display_name } => {
                info!(player = %display_name, "overlay identified local player");
            }
        }
    }

    /// Starts the penalty in its own task so the decay cadence and
    /// frame intake keep running during the hold. Single-flight: a
    /// death while a penalty is still held only re-pins the percent.
    fn spawn_death_penalty(self: &Arc<Self>) {
        if self.penalty_active.swap(true, Ordering::SeqCst) {
            debug!("death penalty already in progress");
            return;
        }
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            bridge.death_penalty().await;
            bridge.penalty_active.store(false, Ordering::SeqCst);
        });
    }

    /// Death penalty: re-base the fire origin at full-damage strength
    /// and hold a fire sequence for the configured duration.
    async fn death_penalty(&self) {
        if !self.state.online() {
            return;
        }

        // Rewriting the recorded strength makes the fire origin the
        // full-damage level, so release lands there instead of on the
        // pre-death strength.
        self.state
            .channel(Channel::A)
            .override_strength(self.settings.strength_multiplier);

        if let Err(e) = self
            .fire
            .set_active(
                true,
                Channel::A,
                self.settings.penalty_strength,
                &self.state,
                self.device.as_ref(),
            )
            .await
        {
            warn!(error = %e, "penalty fire start failed");
            return;
        }

        tokio::time::sleep(self.settings.penalty_duration).await;

        if let Err(e) = self
            .fire
            .set_active(
                false,
                Channel::A,
                self.settings.penalty_strength,
                &self.state,
                self.device.as_ref(),
            )
            .await
        {
            warn!(error = %e, "penalty fire release failed");
        }
    }

    /// One decay tick: bleed the accumulator and re-assert channel A.
    ///
    /// Skipped while the session is offline or a fire sequence is armed;
    /// fire owns the channel for its duration.
    pub async fn decay_tick(&self) {
        let decayed = self
            .percent()
            .saturating_sub(self.settings.decay_per_tick);
        self.percent.store(decayed, Ordering::SeqCst);

        if !self.state.online() || self.fire.is_active() {
            return;
        }

        let target = decayed * self.settings.strength_multiplier / MAX_PERCENT;
        if target == self.state.channel(Channel::A).strength() {
            return;
        }

        debug!(percent = decayed, target, "decay tick");
        if let Err(e) = self
            .device
            .set_strength(Channel::A, StrengthOp::SetTo, target)
            .await
        {
            warn!(error = %e, "decay strength update failed");
        }
    }
}

impl std::fmt::Debug for DamageBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DamageBridge")
            .field("percent", &self.percent())
            .field("overlay_online", &self.overlay_online())
            .finish_non_exhaustive()
    }
}

/// Spawns the bridge task: frames in, decay on a fixed cadence.
///
/// The feed closing ends the task; the coordinator treats that as the
/// overlay going away, not as an error.
pub fn spawn(
    bridge: Arc<DamageBridge>,
    mut frames: mpsc::Receiver<String>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DECAY_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("damage bridge stopped");
                    break;
                }
                _ = interval.tick() => bridge.decay_tick().await,
                frame = frames.recv() => match frame {
                    Some(raw) => bridge.handle_frame(&raw).await,
                    None => {
                        debug!("damage feed closed");
                        break;
                    }
                },
            }
        }
    })
}
