//! Runtime deadline and heartbeat policy for one session.

use std::time::Duration;

use comms_core::constants;
use comms_settings::SocketSettings;

use crate::error::SessionError;

/// Timing, sizing and queueing policy applied to a session.
///
/// [`SocketPolicy::default`] reproduces the protocol constants exactly; tests
/// and embedded peers may shorten the windows as long as the pong wait still
/// exceeds the ping period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketPolicy {
    /// Deadline for each outbound write.
    pub write_deadline: Duration,
    /// Deadline for the opening handshake.
    pub read_deadline: Duration,
    /// Liveness window re-armed by every pong.
    pub pong_wait: Duration,
    /// Heartbeat interval.
    pub ping_period: Duration,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
    /// WebSocket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// WebSocket write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Linger after the interrupt close frame.
    pub interrupt_grace: Duration,
    /// Capacity of the decoded inbound queue.
    pub inbound_capacity: usize,
    /// Capacity of the outbound payload queue.
    pub outbound_capacity: usize,
}

impl Default for SocketPolicy {
    fn default() -> Self {
        Self {
            write_deadline: constants::WRITE_DEADLINE,
            read_deadline: constants::READ_DEADLINE,
            pong_wait: constants::PONG_WAIT,
            ping_period: constants::PING_PERIOD,
            max_message_size: constants::MAX_MESSAGE_SIZE,
            read_buffer_size: constants::READ_BUFFER_SIZE,
            write_buffer_size: constants::WRITE_BUFFER_SIZE,
            interrupt_grace: constants::INTERRUPT_GRACE_PERIOD,
            inbound_capacity: 64,
            outbound_capacity: 64,
        }
    }
}

impl SocketPolicy {
    /// Build a policy from loaded settings.
    pub fn from_settings(settings: &SocketSettings) -> Self {
        Self {
            write_deadline: settings.write_deadline(),
            read_deadline: settings.read_deadline(),
            pong_wait: settings.pong_wait(),
            ping_period: settings.ping_period(),
            max_message_size: settings.max_message_size,
            read_buffer_size: settings.read_buffer_size,
            write_buffer_size: settings.write_buffer_size,
            interrupt_grace: settings.interrupt_grace(),
            inbound_capacity: settings.inbound_capacity,
            outbound_capacity: settings.outbound_capacity,
        }
    }

    /// Replace the liveness window, re-deriving the ping period from it.
    #[must_use]
    pub fn with_pong_wait(mut self, pong_wait: Duration) -> Self {
        self.pong_wait = pong_wait;
        self.ping_period = constants::ping_period_for(pong_wait);
        self
    }

    /// Check that a heartbeat always fits inside the liveness window.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.ping_period.is_zero() {
            return Err(SessionError::InvalidPolicy("ping period is zero".into()));
        }
        if self.pong_wait <= self.ping_period {
            return Err(SessionError::InvalidPolicy(format!(
                "pong wait {:?} must exceed ping period {:?}",
                self.pong_wait, self.ping_period
            )));
        }
        if self.inbound_capacity == 0 || self.outbound_capacity == 0 {
            return Err(SessionError::InvalidPolicy(
                "queue capacities must be at least 1".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(SessionError::InvalidPolicy(
                "max message size is zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_reproduces_constants() {
        let p = SocketPolicy::default();
        assert_eq!(p.write_deadline, Duration::from_secs(10));
        assert_eq!(p.pong_wait, Duration::from_secs(60));
        assert_eq!(p.ping_period, Duration::from_secs(54));
        assert_eq!(p.max_message_size, 4096);
        assert_eq!(p.interrupt_grace, Duration::from_secs(4));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn from_default_settings_equals_default() {
        let p = SocketPolicy::from_settings(&SocketSettings::default());
        assert_eq!(p, SocketPolicy::default());
    }

    #[test]
    fn with_pong_wait_rederives_ping_period() {
        let p = SocketPolicy::default().with_pong_wait(Duration::from_secs(1));
        assert_eq!(p.ping_period, Duration::from_millis(900));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn ping_period_not_below_pong_wait_is_rejected() {
        let p = SocketPolicy {
            ping_period: Duration::from_secs(60),
            ..SocketPolicy::default()
        };
        assert_matches!(p.validate(), Err(SessionError::InvalidPolicy(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let p = SocketPolicy {
            outbound_capacity: 0,
            ..SocketPolicy::default()
        };
        assert!(p.validate().is_err());
    }
}
