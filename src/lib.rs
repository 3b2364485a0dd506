//! `pulselink` - session coordinator for two-channel e-stim devices
//!
//! Bridges a remote device session, an avatar-parameter control panel,
//! and an optional game-overlay damage feed into one coordinator: a
//! message router with a panel-control gate, a fire-mode state machine,
//! a periodic waveform scheduler, a status broadcaster, and a
//! damage-driven strength modulator.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod damage;
pub mod debounce;
pub mod device;
pub mod error;
pub mod fire;
pub mod handlers;
pub mod logging;
pub mod osc;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod waveform;
