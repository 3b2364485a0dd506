//! Avatar-parameter protocol values and the outbound publisher.
//!
//! Inbound messages are (address, value) pairs; outbound traffic is a
//! status string for the remote chatbox plus arbitrary (address, value)
//! mirroring. The concrete UDP transport lives with the session
//! collaborators, behind [`OscPublisher`].

use std::fmt;

use crate::error::SessionError;

/// A single inbound protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// Slash-separated address path.
    pub address: String,
    /// First (and only) argument.
    pub value: OscValue,
}

impl OscMessage {
    /// Convenience constructor.
    #[must_use]
    pub fn new(address: impl Into<String>, value: OscValue) -> Self {
        Self {
            address: address.into(),
            value,
        }
    }
}

/// An avatar-parameter argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscValue {
    /// Boolean parameter (buttons arrive as a press/release pair).
    Bool(bool),
    /// Integer parameter (page selection).
    Int(i32),
    /// Float parameter, [-1, 1] generally, [0, 1] for proximity signals.
    Float(f32),
}

impl OscValue {
    /// Interprets the value as a press/engage edge.
    #[must_use]
    pub fn pressed(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(i) => i > 0,
            Self::Float(f) => f > 0.0,
        }
    }

    /// The value as a float, if it is one.
    #[must_use]
    pub const fn as_float(self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(f),
            Self::Bool(_) | Self::Int(_) => None,
        }
    }

    /// The value as an integer, if it is one.
    #[must_use]
    pub const fn as_int(self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(i),
            Self::Bool(_) | Self::Float(_) => None,
        }
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Outbound publisher for status strings and mirrored values.
#[async_trait::async_trait]
pub trait OscPublisher: Send + Sync {
    /// Publishes the multi-line status string to the remote chatbox.
    async fn publish_status(&self, message: &str) -> Result<(), SessionError>;

    /// Publishes an arbitrary (address, value) pair.
    async fn publish_value(&self, address: &str, value: OscValue) -> Result<(), SessionError>;
}

/// Publisher that logs outbound traffic instead of sending it.
///
/// Stands in for the UDP transport in dry runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl OscPublisher for LogPublisher {
    async fn publish_status(&self, message: &str) -> Result<(), SessionError> {
        if message.is_empty() {
            tracing::debug!("remote display cleared");
        } else {
            tracing::info!(status = %message.replace('\n', " | "), "status broadcast");
        }
        Ok(())
    }

    async fn publish_value(&self, address: &str, value: OscValue) -> Result<(), SessionError> {
        tracing::debug!(address, %value, "value mirrored");
        Ok(())
    }
}
