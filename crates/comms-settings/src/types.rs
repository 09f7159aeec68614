//! Settings types.
//!
//! Durations are stored as milliseconds so the JSON file stays readable;
//! accessor methods convert them to [`Duration`].

use std::time::Duration;

use comms_core::constants;
use comms_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Largest accepted liveness window, in milliseconds (one hour).
pub const MAX_PONG_WAIT_MS: u64 = 3_600_000;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommsSettings {
    /// Session deadlines, sizes and queue capacities.
    pub socket: SocketSettings,
    /// Registry actor settings.
    pub messenger: MessengerSettings,
    /// Relay node network settings.
    pub node: NodeSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl CommsSettings {
    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        self.socket.validate()?;
        if self.messenger.command_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "messenger.commandCapacity must be at least 1".into(),
            ));
        }
        if self.node.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "node.maxConnections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Per-session timing and sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketSettings {
    /// Deadline for each outbound write, in milliseconds.
    pub write_deadline_ms: u64,
    /// Deadline for the opening handshake, in milliseconds.
    pub read_deadline_ms: u64,
    /// Liveness window, in milliseconds. The ping period is derived from it.
    pub pong_wait_ms: u64,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
    /// WebSocket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// WebSocket write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Linger after sending a close frame on interrupt, in milliseconds.
    pub interrupt_grace_ms: u64,
    /// Capacity of the decoded inbound queue.
    pub inbound_capacity: usize,
    /// Capacity of the outbound payload queue.
    pub outbound_capacity: usize,
}

impl Default for SocketSettings {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            write_deadline_ms: constants::WRITE_DEADLINE.as_millis() as u64,
            read_deadline_ms: constants::READ_DEADLINE.as_millis() as u64,
            pong_wait_ms: constants::PONG_WAIT.as_millis() as u64,
            max_message_size: constants::MAX_MESSAGE_SIZE,
            read_buffer_size: constants::READ_BUFFER_SIZE,
            write_buffer_size: constants::WRITE_BUFFER_SIZE,
            interrupt_grace_ms: constants::INTERRUPT_GRACE_PERIOD.as_millis() as u64,
            inbound_capacity: 64,
            outbound_capacity: 64,
        }
    }
}

impl SocketSettings {
    /// Write deadline.
    pub fn write_deadline(&self) -> Duration {
        Duration::from_millis(self.write_deadline_ms)
    }

    /// Handshake deadline.
    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }

    /// Liveness window.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Heartbeat interval (9/10 of the pong wait).
    pub fn ping_period(&self) -> Duration {
        constants::ping_period_for(self.pong_wait())
    }

    /// Interrupt grace period.
    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_millis(self.interrupt_grace_ms)
    }

    /// Check that the liveness window leaves room for a heartbeat and that
    /// sizes are usable.
    pub fn validate(&self) -> Result<()> {
        if self.pong_wait_ms > MAX_PONG_WAIT_MS {
            return Err(SettingsError::InvalidValue(format!(
                "socket.pongWaitMs ({}) exceeds {MAX_PONG_WAIT_MS}",
                self.pong_wait_ms
            )));
        }
        if self.ping_period().is_zero() || self.pong_wait() <= self.ping_period() {
            return Err(SettingsError::InvalidValue(format!(
                "socket.pongWaitMs ({}) leaves no room for a heartbeat",
                self.pong_wait_ms
            )));
        }
        if self.write_deadline_ms == 0 || self.read_deadline_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "socket deadlines must be non-zero".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "socket.maxMessageSize must be non-zero".into(),
            ));
        }
        if self.inbound_capacity == 0 || self.outbound_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "socket queue capacities must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Registry actor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessengerSettings {
    /// Capacity of each of the actor's command channels.
    pub command_capacity: usize,
}

impl Default for MessengerSettings {
    fn default() -> Self {
        Self {
            command_capacity: 64,
        }
    }
}

/// Relay node network settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns).
    pub port: u16,
    /// Maximum concurrent WebSocket sessions.
    pub max_connections: usize,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7890,
            max_connections: 256,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn socket_defaults_match_protocol_constants() {
        let s = SocketSettings::default();
        assert_eq!(s.write_deadline(), Duration::from_secs(10));
        assert_eq!(s.read_deadline(), Duration::from_secs(10));
        assert_eq!(s.pong_wait(), Duration::from_secs(60));
        assert_eq!(s.ping_period(), Duration::from_secs(54));
        assert_eq!(s.interrupt_grace(), Duration::from_secs(4));
        assert_eq!(s.read_buffer_size, 1024);
        assert_eq!(s.write_buffer_size, 1024);
    }

    #[test]
    fn ping_period_follows_pong_wait() {
        let s = SocketSettings {
            pong_wait_ms: 1000,
            ..SocketSettings::default()
        };
        assert_eq!(s.ping_period(), Duration::from_millis(900));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn tiny_pong_wait_rejected() {
        let s = SocketSettings {
            pong_wait_ms: 1,
            ..SocketSettings::default()
        };
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn pong_wait_above_one_hour_rejected() {
        let mut s = SocketSettings {
            pong_wait_ms: MAX_PONG_WAIT_MS,
            ..SocketSettings::default()
        };
        assert!(s.validate().is_ok());
        s.pong_wait_ms = u64::MAX;
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn zero_capacity_rejected() {
        let s = SocketSettings {
            inbound_capacity: 0,
            ..SocketSettings::default()
        };
        assert!(s.validate().is_err());

        let mut all = CommsSettings::default();
        all.messenger.command_capacity = 0;
        assert!(all.validate().is_err());
    }

    #[test]
    fn zero_max_connections_rejected() {
        let mut all = CommsSettings::default();
        all.node.max_connections = 0;
        assert_matches!(all.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("maxConnections"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(CommsSettings::default()).unwrap();
        assert_eq!(json["socket"]["pongWaitMs"], 60_000);
        assert_eq!(json["messenger"]["commandCapacity"], 64);
        assert_eq!(json["node"]["maxConnections"], 256);
        assert_eq!(json["logging"]["format"], "compact");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: CommsSettings =
            serde_json::from_str(r#"{"node":{"port":9000}}"#).unwrap();
        assert_eq!(s.node.port, 9000);
        assert_eq!(s.node.host, "127.0.0.1");
        assert_eq!(s.socket, SocketSettings::default());
    }
}
