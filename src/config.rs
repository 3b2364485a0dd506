//! Runtime settings.
//!
//! Typed YAML configuration with full defaults: an empty file (or no
//! file at all) yields a usable coordinator. Validation happens once at
//! load; after that the settings are frozen and handed out by value.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::waveform;

/// Root settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Listener and peer endpoints.
    pub network: NetworkSettings,
    /// Panel-control defaults.
    pub controller: ControllerSettings,
    /// Data-driven custom float mappings.
    pub mappings: Vec<CustomMapping>,
    /// Damage-bridge tuning.
    pub damage: DamageConfig,
}

/// Listener and peer endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    /// Address the session transport binds to.
    pub bind_addr: String,
    /// Device session (WebSocket) port.
    pub session_port: u16,
    /// Avatar-parameter receive port.
    pub osc_recv_port: u16,
    /// Avatar-parameter send port (chatbox, mirrored values).
    pub osc_send_port: u16,
    /// Game-overlay damage feed URL.
    pub overlay_url: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            session_port: 5678,
            osc_recv_port: 9001,
            osc_send_port: 9000,
            overlay_url: "ws://127.0.0.1:11398".to_string(),
        }
    }
}

/// Panel-control defaults applied to the coordinator state at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSettings {
    /// Initial fire-mode strength step.
    pub fire_step: u32,
    /// Whether status broadcasting starts enabled.
    pub chatbox_enabled: bool,
    /// Whether the panel-control gate starts open.
    pub panel_control: bool,
    /// Initial waveform catalog index for channel A.
    pub waveform_a: usize,
    /// Initial waveform catalog index for channel B.
    pub waveform_b: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fire_step: 30,
            chatbox_enabled: true,
            panel_control: true,
            waveform_a: 0,
            waveform_b: 0,
        }
    }
}

/// A user-defined float address mapped to one or both channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomMapping {
    /// Full address path, e.g. `/avatar/parameters/Tail_Stretch`.
    pub address: String,
    /// Route to channel A.
    pub channel_a: bool,
    /// Route to channel B.
    pub channel_b: bool,
}

/// Damage-bridge tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DamageConfig {
    /// Whether the damage bridge runs at all.
    pub enabled: bool,
    /// Accumulator percent removed per decay tick.
    pub decay_per_tick: u32,
    /// Strength at 100 % accumulated damage.
    pub strength_multiplier: u32,
    /// Fire-mode step used for the death penalty.
    pub penalty_strength: u32,
    /// Death-penalty hold duration (humantime string, e.g. `"5s"`).
    pub penalty_duration: String,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            decay_per_tick: 2,
            strength_multiplier: 60,
            penalty_strength: 30,
            penalty_duration: "5s".to_string(),
        }
    }
}

impl DamageConfig {
    /// Parses the penalty hold duration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable string.
    pub fn penalty_duration(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.penalty_duration).map_err(|_| ConfigError::InvalidValue {
            field: "damage.penalty_duration".to_string(),
            value: self.penalty_duration.clone(),
            expected: "a duration such as '5s' or '500ms'".to_string(),
        })
    }
}

/// Loads and validates settings from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file is missing, unparsable, or fails
/// range validation.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;
    let settings: Settings =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::InvalidValue`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check_range(field: &str, value: u32, max: u32) -> Result<(), ConfigError> {
            if value > max {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    expected: format!("0..={max}"),
                });
            }
            Ok(())
        }

        check_range("controller.fire_step", self.controller.fire_step, 100)?;
        check_range("damage.decay_per_tick", self.damage.decay_per_tick, 10)?;
        check_range(
            "damage.strength_multiplier",
            self.damage.strength_multiplier,
            200,
        )?;
        check_range("damage.penalty_strength", self.damage.penalty_strength, 100)?;
        self.damage.penalty_duration()?;

        for (field, index) in [
            ("controller.waveform_a", self.controller.waveform_a),
            ("controller.waveform_b", self.controller.waveform_b),
        ] {
            if index >= waveform::CATALOG.len() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: index.to_string(),
                    expected: format!("a catalog index below {}", waveform::CATALOG.len()),
                });
            }
        }

        for mapping in &self.mappings {
            if !mapping.address.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "mappings.address".to_string(),
                    value: mapping.address.clone(),
                    expected: "an address path starting with '/'".to_string(),
                });
            }
        }

        Ok(())
    }
}
