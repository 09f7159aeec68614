//! # comms-settings
//!
//! Configuration for sessions, the messenger, the relay node and logging.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CommsSettings::default()`], which carry the
//!    protocol timing constants from `comms_core::constants`
//! 2. **User file**: `~/.comms/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COMMS_*` overrides (highest priority)
//!
//! The merged result is validated before it is returned.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = CommsSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = CommsSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.socket.pong_wait_ms, 60_000);
        assert_eq!(settings.socket.max_message_size, 4096);
        assert_eq!(settings.node.host, "127.0.0.1");
        assert_eq!(settings.logging.level, "info");
    }
}
