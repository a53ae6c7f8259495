//! Configuration shared by the ingestion loop, the render tick and the shell.
//!
//! A [`ScopeConfig`] can be persisted as JSON so the shell remembers the last
//! address and scale presets between runs. Only settings are stored, never
//! samples.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::planner::ScaleMode;
use crate::error::{Result, ScopeError};

/// Substrings of diagnostic chatter that boards print while booting.
pub const DEFAULT_DENYLIST: [&str; 3] = ["initializing", "successful", "failed"];

// ─────────────────────────────────────────────────────────────────────────────
// ScopeConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// | Field                | Purpose |
/// |----------------------|---------|
/// | `capacity`           | Samples retained per column (window width N) |
/// | `batch_limit`        | Records folded per render tick at most |
/// | `x_tick_step`        | Spacing of X-axis ticks, in samples |
/// | `separator`          | Field separator of the wire format |
/// | `denylist`           | Case-insensitive substrings marking noise lines |
/// | `poll_interval_ms`   | Ingestion loop sleep between source reads |
/// | `error_backoff_ms`   | Sleep after a failed source read |
/// | `settle_delay_ms`    | Wait after opening before the first read |
/// | `render_interval_ms` | Repaint cadence requested by the shell |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub capacity: usize,
    pub batch_limit: usize,
    pub x_tick_step: u64,
    pub separator: char,
    pub denylist: Vec<String>,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub settle_delay_ms: u64,
    pub render_interval_ms: u64,

    // ── Shell ────────────────────────────────────────────────────────────────
    /// Address pre-filled in the shell's address field.
    pub default_address: String,
    /// Scale modes offered by the Y-scale dropdown.
    pub scale_presets: Vec<ScaleMode>,
    /// Scale mode a new session starts with.
    pub initial_scale: ScaleMode,
    /// Native window title.
    pub title: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            batch_limit: 100,
            x_tick_step: 100,
            separator: ',',
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            poll_interval_ms: 1,
            error_backoff_ms: 10,
            settle_delay_ms: 0,
            render_interval_ms: 20,

            default_address: "COM3".to_string(),
            scale_presets: ScaleMode::presets(),
            initial_scale: ScaleMode::Auto,
            title: "Dynamic CSV Oscilloscope".to_string(),
        }
    }
}

impl ScopeConfig {
    /// Reject values that would make the window or the render tick degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ScopeError::Config("capacity must be at least 1".into()));
        }
        if self.batch_limit == 0 {
            return Err(ScopeError::Config("batch_limit must be at least 1".into()));
        }
        if self.x_tick_step == 0 {
            return Err(ScopeError::Config("x_tick_step must be at least 1".into()));
        }
        if self.separator.is_alphanumeric() || self.separator == '.' {
            return Err(ScopeError::Config(format!(
                "separator {:?} would collide with numeric fields",
                self.separator
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Like [`from_json`](Self::from_json), also returning the top-level keys
    /// the document set explicitly.
    pub fn from_json_with_keys(json: &str) -> Result<(Self, Vec<String>)> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let keys = value
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        let cfg: Self = serde_json::from_value(value)?;
        cfg.validate()?;
        Ok((cfg, keys))
    }

    /// Save the configuration to a JSON file at the given path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let txt = self.to_json()?;
        std::fs::write(path, txt).map_err(|source| ScopeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the configuration from a JSON file at the given path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).map_err(|source| ScopeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&txt)
    }

    /// Load from a JSON file, also returning the keys it set explicitly.
    pub fn load_with_keys(path: &Path) -> Result<(Self, Vec<String>)> {
        let txt = std::fs::read_to_string(path).map_err(|source| ScopeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_with_keys(&txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_oscilloscope() {
        let cfg = ScopeConfig::default();
        assert_eq!(cfg.capacity, 500);
        assert_eq!(cfg.batch_limit, 100);
        assert_eq!(cfg.x_tick_step, 100);
        assert_eq!(cfg.separator, ',');
        assert_eq!(cfg.render_interval(), Duration::from_millis(20));
        assert_eq!(cfg.scale_presets.len(), 7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let cfg = ScopeConfig {
            capacity: 0,
            ..ScopeConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ScopeError::Config(_))));
    }

    #[test]
    fn numeric_separator_is_rejected() {
        let cfg = ScopeConfig {
            separator: '.',
            ..ScopeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = ScopeConfig::from_json(r#"{ "capacity": 64, "scale_presets": ["Auto", "±2.5"] }"#)
            .unwrap();
        assert_eq!(cfg.capacity, 64);
        assert_eq!(cfg.batch_limit, 100);
        assert_eq!(cfg.scale_presets, vec![ScaleMode::Auto, ScaleMode::Fixed(2.5)]);
    }

    #[test]
    fn invalid_json_values_surface_as_errors() {
        assert!(ScopeConfig::from_json(r#"{ "capacity": 0 }"#).is_err());
        assert!(matches!(
            ScopeConfig::from_json("not json"),
            Err(ScopeError::ConfigFormat(_))
        ));
    }

    #[test]
    fn json_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "serialscope-config-{}.json",
            std::process::id()
        ));
        let cfg = ScopeConfig {
            default_address: "/dev/ttyACM0".into(),
            settle_delay_ms: 2000,
            ..ScopeConfig::default()
        };
        cfg.save_to_path(&path).unwrap();
        let restored = ScopeConfig::load_from_path(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(restored, cfg);
    }

    #[test]
    fn explicit_keys_are_reported() {
        let (cfg, keys) =
            ScopeConfig::from_json_with_keys(r#"{ "settle_delay_ms": 0, "capacity": 8 }"#).unwrap();
        assert_eq!(cfg.settle_delay_ms, 0);
        assert_eq!(cfg.capacity, 8);
        assert!(keys.iter().any(|k| k == "settle_delay_ms"));
        assert!(!keys.iter().any(|k| k == "batch_limit"));
    }

    #[test]
    fn missing_file_is_a_config_io_error() {
        let err = ScopeConfig::load_from_path(Path::new("/nonexistent/serialscope.json"))
            .unwrap_err();
        assert!(matches!(err, ScopeError::ConfigIo { .. }));
    }
}
