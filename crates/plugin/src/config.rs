//! Persisted plugin configuration (`player_batch.json`).
//!
//! Loading is lenient: missing keys take their defaults, an invalid
//! `permission` or `interval` is reset, and the normalized result is written
//! back so the file always lists every setting.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use troupe_batch::{CoreConfig, PlacementStyle, ReadinessConfig};

use crate::error::ConfigError;

/// File name of the configuration inside the plugin data folder.
pub const CONFIG_FILE: &str = "player_batch.json";

/// Readiness timings in human units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
	/// Seconds an actor may take to come online before its follow-ups are dropped.
	pub timeout_secs: f64,
	pub settle_ms: u64,
	pub action_gap_ms: u64,
	/// Poll period of the online-actor fallback; `0` disables polling.
	pub poll_interval_ms: u64,
}

impl Default for ReadinessSettings {
	fn default() -> Self {
		Self {
			timeout_secs: 10.0,
			settle_ms: 500,
			action_gap_ms: 200,
			poll_interval_ms: 1000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
	/// Prefix of every actor name.
	pub base_name: String,
	/// Minimum permission level required to run `!!plb`.
	pub permission: u32,
	/// Seconds between successive spawn commands.
	pub interval: f64,
	pub placement: PlacementStyle,
	pub readiness: ReadinessSettings,
	pub reject_collisions: bool,
}

impl Default for PluginConfig {
	fn default() -> Self {
		Self {
			base_name: "bot_".to_string(),
			permission: 0,
			interval: 0.0,
			placement: PlacementStyle::default(),
			readiness: ReadinessSettings::default(),
			reject_collisions: false,
		}
	}
}

impl PluginConfig {
	/// Loads `path`, creating it with defaults if missing, and writes the
	/// normalized configuration back.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			let config = Self::default();
			config.save(path)?;
			tracing::info!(path = %path.display(), "config.created");
			return Ok(config);
		}
		let text = fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_json(&text)?;
		config.save(path)?;
		Ok(config)
	}

	/// Like [`PluginConfig::load`], but falls back to defaults on any error.
	pub fn load_or_default(path: &Path) -> Self {
		match Self::load(path) {
			Ok(config) => config,
			Err(err) => {
				tracing::error!(path = %path.display(), error = %err, "config.load.failed");
				Self::default()
			}
		}
	}

	/// Parses a configuration, merging it over the defaults and sanitizing it.
	pub fn from_json(text: &str) -> Result<Self, ConfigError> {
		let Value::Object(loaded) = serde_json::from_str::<Value>(text)? else {
			return Err(ConfigError::NotAnObject);
		};
		let Value::Object(mut merged) = serde_json::to_value(Self::default())? else {
			return Err(ConfigError::NotAnObject);
		};
		merge(&mut merged, loaded);
		sanitize(&mut merged);
		Ok(serde_json::from_value(Value::Object(merged))?)
	}

	pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
		let io = |error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		};
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(io)?;
		}
		let mut text = serde_json::to_string_pretty(self)?;
		text.push('\n');
		fs::write(path, text).map_err(io)
	}

	/// Settings of the batch core.
	pub fn to_core_config(&self) -> CoreConfig {
		let r = &self.readiness;
		CoreConfig {
			base_name: self.base_name.clone(),
			interval: Duration::try_from_secs_f64(self.interval).unwrap_or_default(),
			placement: self.placement,
			readiness: ReadinessConfig {
				timeout: Duration::try_from_secs_f64(r.timeout_secs).unwrap_or(ReadinessConfig::default().timeout),
				settle: Duration::from_millis(r.settle_ms),
				action_gap: Duration::from_millis(r.action_gap_ms),
				poll_interval: (r.poll_interval_ms > 0).then(|| Duration::from_millis(r.poll_interval_ms)),
			},
			reject_collisions: self.reject_collisions,
		}
	}
}

/// Overlays `loaded` on `base`, one level deep for nested objects.
fn merge(base: &mut Map<String, Value>, loaded: Map<String, Value>) {
	for (key, value) in loaded {
		match value {
			Value::Object(update) if base.get(&key).is_some_and(Value::is_object) => {
				if let Some(Value::Object(inner)) = base.get_mut(&key) {
					inner.extend(update);
				}
			}
			value => {
				base.insert(key, value);
			}
		}
	}
}

fn sanitize(config: &mut Map<String, Value>) {
	if !config.get("permission").is_some_and(|v| v.as_u64().is_some_and(|p| p <= u64::from(u32::MAX))) {
		reset(config, "permission", Value::from(0));
	}
	if !config.get("interval").and_then(Value::as_f64).is_some_and(|secs| secs.is_finite() && secs >= 0.0) {
		reset(config, "interval", Value::from(0.0));
	}
	if !config.get("base_name").is_some_and(Value::is_string) {
		reset(config, "base_name", Value::from(PluginConfig::default().base_name));
	}
}

fn reset(config: &mut Map<String, Value>, key: &str, value: Value) {
	tracing::warn!(key, found = ?config.get(key), "config.reset");
	config.insert(key.to_string(), value);
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn missing_file_is_created_with_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("plugin").join(CONFIG_FILE);

		let config = PluginConfig::load(&path).unwrap();
		assert_eq!(config, PluginConfig::default());
		let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(written["base_name"], "bot_");
		assert_eq!(written["permission"], 0);
	}

	#[test]
	fn partial_file_is_merged_and_written_back() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		fs::write(&path, r#"{"base_name": "npc_", "readiness": {"settle_ms": 50}}"#).unwrap();

		let config = PluginConfig::load(&path).unwrap();
		assert_eq!(config.base_name, "npc_");
		assert_eq!(config.permission, 0);
		assert_eq!(config.readiness.settle_ms, 50);
		assert_eq!(config.readiness.action_gap_ms, 200);

		let reread = PluginConfig::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(reread, config);
	}

	#[test]
	fn invalid_permission_and_interval_reset() {
		for raw in [r#"{"permission": -2}"#, r#"{"permission": "admin"}"#, r#"{"permission": 1.5}"#] {
			assert_eq!(PluginConfig::from_json(raw).unwrap().permission, 0, "{raw}");
		}
		assert_eq!(PluginConfig::from_json(r#"{"permission": 3}"#).unwrap().permission, 3);
		assert_eq!(PluginConfig::from_json(r#"{"interval": -1}"#).unwrap().interval, 0.0);
		assert_eq!(PluginConfig::from_json(r#"{"interval": 0.5}"#).unwrap().interval, 0.5);
	}

	#[test]
	fn broken_file_falls_back_to_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		fs::write(&path, "{ not json").unwrap();

		assert!(matches!(PluginConfig::load(&path), Err(ConfigError::Json(_))));
		assert_eq!(PluginConfig::load_or_default(&path), PluginConfig::default());
		assert!(matches!(PluginConfig::from_json("[1, 2]"), Err(ConfigError::NotAnObject)));
	}

	#[test]
	fn core_config_carries_timings() {
		let config = PluginConfig::from_json(r#"{"interval": 1.5, "placement": "surface_snap", "readiness": {"poll_interval_ms": 0, "timeout_secs": 4}}"#).unwrap();
		let core = config.to_core_config();
		assert_eq!(core.interval, Duration::from_millis(1500));
		assert_eq!(core.placement, PlacementStyle::SurfaceSnap);
		assert_eq!(core.readiness.poll_interval, None);
		assert_eq!(core.readiness.timeout, Duration::from_secs(4));
		assert_eq!(core.base_name, "bot_");
	}
}
