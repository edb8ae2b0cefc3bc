//! Runtime configuration read from the environment.

use crate::logic::Rect;
use chrono::Duration;
use std::env;
use std::str::FromStr;

const FOOTER_HEIGHT: f64 = 40.0;
const MARGIN_X: f64 = 15.0;
const MARGIN_Y: f64 = 10.0;

/// Longest accepted formation timeout or retention window (30 days).
pub const MAX_WINDOW_SECS: i64 = 30 * 24 * 3600;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// How long members have to confirm a proposed team.
    pub formation_timeout_secs: i64,
    /// How long closed formations are kept so late answers get a clear error.
    pub formation_retention_secs: i64,
    pub sweep_interval_secs: u64,
    pub bracket_width: f64,
    pub bracket_height: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            formation_timeout_secs: 300,
            formation_retention_secs: 3600,
            sweep_interval_secs: 30,
            bracket_width: 1280.0,
            bracket_height: 720.0,
        }
    }
}

/// Trimmed, non-empty value of `key`.
fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_value(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}

/// Clamp a window in seconds to `min..=MAX_WINDOW_SECS`, warning when it had to change.
fn env_window(key: &str, default: i64, min: i64) -> i64 {
    let secs = env_parse(key, default);
    let clamped = secs.clamp(min, MAX_WINDOW_SECS);
    if clamped != secs {
        log::warn!("{}={} is out of range, using {}", key, secs, clamped);
    }
    clamped
}

impl Config {
    /// Read HOST, PORT, FORMATION_TIMEOUT_SECS, FORMATION_RETENTION_SECS,
    /// SWEEP_INTERVAL_SECS, BRACKET_WIDTH and BRACKET_HEIGHT, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_value("HOST").unwrap_or(d.host),
            port: env_parse("PORT", d.port),
            formation_timeout_secs: env_window(
                "FORMATION_TIMEOUT_SECS",
                d.formation_timeout_secs,
                1,
            ),
            formation_retention_secs: env_window(
                "FORMATION_RETENTION_SECS",
                d.formation_retention_secs,
                0,
            ),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", d.sweep_interval_secs).max(1),
            bracket_width: env_parse("BRACKET_WIDTH", d.bracket_width),
            bracket_height: env_parse("BRACKET_HEIGHT", d.bracket_height),
        }
    }

    /// Values set directly on the struct are kept within `0..=MAX_WINDOW_SECS`.
    pub fn formation_timeout(&self) -> Duration {
        Duration::seconds(self.formation_timeout_secs.clamp(0, MAX_WINDOW_SECS))
    }

    pub fn formation_retention(&self) -> Duration {
        Duration::seconds(self.formation_retention_secs.clamp(0, MAX_WINDOW_SECS))
    }

    /// Drawing area inside the canvas: side margins, a top margin and a footer strip.
    pub fn bracket_bounds(&self) -> Rect {
        bracket_bounds(self.bracket_width, self.bracket_height)
    }
}

/// Bracket area for a canvas of `width` x `height`.
pub fn bracket_bounds(width: f64, height: f64) -> Rect {
    Rect::new(
        MARGIN_X,
        MARGIN_Y,
        (width - MARGIN_X * 2.0).max(0.0),
        (height - FOOTER_HEIGHT - MARGIN_Y).max(0.0),
    )
}
