//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CommsSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `COMMS_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use comms_core::logging::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{CommsSettings, MAX_PONG_WAIT_MS};

/// Resolve the path to the settings file (`~/.comms/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".comms").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CommsSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or values failing validation
/// are errors.
pub fn load_settings_from_path(path: &Path) -> Result<CommsSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `lookup` instead of
/// the process environment.
pub fn load_with<F>(path: &Path, lookup: F) -> Result<CommsSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(CommsSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Syntax {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CommsSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `COMMS_*` overrides resolved through `lookup`.
///
/// Each variable has strict parsing rules; invalid values are ignored with a
/// warning and the file/default value is kept.
pub fn apply_overrides<F>(settings: &mut CommsSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Node ────────────────────────────────────────────────────────
    if let Some(v) = env.string("COMMS_HOST") {
        settings.node.host = v;
    }
    if let Some(v) = env.u16("COMMS_PORT", 0, 65535) {
        settings.node.port = v;
    }
    if let Some(v) = env.usize("COMMS_MAX_CONNECTIONS", 1, 100_000) {
        settings.node.max_connections = v;
    }

    // ── Socket ──────────────────────────────────────────────────────
    if let Some(v) = env.u64("COMMS_WRITE_DEADLINE_MS", 1, 600_000) {
        settings.socket.write_deadline_ms = v;
    }
    if let Some(v) = env.u64("COMMS_READ_DEADLINE_MS", 1, 600_000) {
        settings.socket.read_deadline_ms = v;
    }
    if let Some(v) = env.u64("COMMS_PONG_WAIT_MS", 10, MAX_PONG_WAIT_MS) {
        settings.socket.pong_wait_ms = v;
    }
    if let Some(v) = env.usize("COMMS_MAX_MESSAGE_SIZE", 1, 64 * 1024 * 1024) {
        settings.socket.max_message_size = v;
    }
    if let Some(v) = env.u64("COMMS_INTERRUPT_GRACE_MS", 0, 600_000) {
        settings.socket.interrupt_grace_ms = v;
    }

    // ── Messenger ───────────────────────────────────────────────────
    if let Some(v) = env.usize("COMMS_MESSENGER_CAPACITY", 1, 1_000_000) {
        settings.messenger.command_capacity = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("COMMS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("COMMS_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "COMMS_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = (self.lookup)(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = (self.lookup)(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
