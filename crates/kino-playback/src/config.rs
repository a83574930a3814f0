//! Configuration for the controller, its engine, and the control surface

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stream engine construction options
///
/// Keys follow the engine's camelCase naming so caller overrides can be
/// written the same way the engine documents them. Keys this struct does
/// not model are kept in `extra` and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Offload transmuxing to a worker thread
    pub enable_worker: bool,
    /// Low-latency live playback
    pub low_latency_mode: bool,
    /// Initial level index (engine picks when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_level: Option<usize>,
    /// Forward buffer target in seconds
    pub max_buffer_length: f64,
    /// Unmodelled engine options
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: false,
            low_latency_mode: true,
            start_level: None,
            max_buffer_length: 30.0,
            extra: Map::new(),
        }
    }
}

impl EngineConfig {
    /// Layer caller overrides onto the defaults, key by key
    pub fn with_overrides(overrides: &Map<String, Value>) -> Result<Self> {
        let mut merged = match serde_json::to_value(Self::default())? {
            Value::Object(map) => map,
            other => {
                return Err(Error::Internal(format!(
                    "engine defaults serialized to non-object: {}",
                    other
                )))
            }
        };

        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

/// Caller-supplied player inputs
///
/// Any change here tears the current session down and starts a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProps {
    /// Source URL (adaptive manifest or plain media file)
    pub src: String,
    /// Start playback as soon as the manifest is parsed
    #[serde(default)]
    pub autoplay: bool,
    /// Engine options layered onto [`EngineConfig::default`]
    #[serde(default)]
    pub engine_overrides: Map<String, Value>,
}

impl PlayerProps {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            autoplay: false,
            engine_overrides: Map::new(),
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_engine_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.engine_overrides.insert(key.into(), value.into());
        self
    }

    /// Parse props from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Merged engine configuration for this source
    pub fn engine_config(&self) -> Result<EngineConfig> {
        EngineConfig::with_overrides(&self.engine_overrides)
    }
}

/// Controller policy knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Consecutive unclassified-fatal restarts allowed before giving up.
    /// `None` retries forever.
    pub reinit_limit: Option<u32>,
}

/// Control surface options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Seconds skipped by the rewind/forward buttons
    pub seek_step_secs: f64,
    /// Touch layout; overlay clicks do not toggle playback
    pub mobile: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            seek_step_secs: 10.0,
            mobile: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_defaults_disable_worker() {
        let config = EngineConfig::default();
        assert!(!config.enable_worker);
        assert_eq!(config.max_buffer_length, 30.0);
    }

    #[test]
    fn test_overrides_layer_onto_defaults() {
        let overrides = json!({
            "maxBufferLength": 60.0,
            "startLevel": 2,
            "backBufferLength": 90
        });
        let config = EngineConfig::with_overrides(overrides.as_object().unwrap()).unwrap();

        assert!(!config.enable_worker);
        assert_eq!(config.max_buffer_length, 60.0);
        assert_eq!(config.start_level, Some(2));
        assert_eq!(config.extra.get("backBufferLength"), Some(&json!(90)));
    }

    #[test]
    fn test_override_can_enable_worker() {
        let props = PlayerProps::new("https://cdn.example.com/master.m3u8")
            .with_engine_override("enableWorker", true);
        assert!(props.engine_config().unwrap().enable_worker);
    }

    #[test]
    fn test_invalid_override_type() {
        let overrides = json!({ "enableWorker": "yes" });
        let err = EngineConfig::with_overrides(overrides.as_object().unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_props_from_json() {
        let props = PlayerProps::from_json(
            r#"{"src": "https://cdn.example.com/master.m3u8", "autoplay": true}"#,
        )
        .unwrap();
        assert!(props.autoplay);
        assert!(props.engine_overrides.is_empty());
    }
}
