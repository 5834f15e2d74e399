use std::env;

use foundation::math::LonLat;
use foundation::time::Millis;
use scene::{CrossOrigin, ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM};
use serde::{Deserialize, Serialize};

/// Viewer-wide defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// `[lon, lat]` used when neither a center nor an extent is supplied.
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    /// Highest zoom exposed on shared (public) views.
    pub shared_zoom_ceiling: f64,
    /// Period of the pending-location icon pulse.
    pub pulse_interval_ms: u64,
    /// `"anonymous"` or `"use-credentials"`.
    pub cross_origin: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_center: [0.0, 0.0],
            default_zoom: 2.0,
            shared_zoom_ceiling: 19.0,
            pulse_interval_ms: 300,
            cross_origin: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `ATLAS_*` variables over the defaults. Unparseable values fall
    /// back to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let f64_var = |key: &str, default: f64| -> f64 {
            lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        let config = Self {
            default_center: [
                f64_var("ATLAS_DEFAULT_LON", defaults.default_center[0]),
                f64_var("ATLAS_DEFAULT_LAT", defaults.default_center[1]),
            ],
            default_zoom: f64_var("ATLAS_DEFAULT_ZOOM", defaults.default_zoom),
            shared_zoom_ceiling: f64_var("ATLAS_SHARED_ZOOM_CEILING", defaults.shared_zoom_ceiling),
            pulse_interval_ms: lookup("ATLAS_PULSE_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pulse_interval_ms),
            cross_origin: lookup("ATLAS_CROSS_ORIGIN").filter(|v| !v.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(ENGINE_MIN_ZOOM..=ENGINE_MAX_ZOOM).contains(&self.default_zoom) {
            return Err(ConfigError::invalid("defaultZoom", "outside the engine zoom range"));
        }
        if !self.shared_zoom_ceiling.is_finite() || self.shared_zoom_ceiling < ENGINE_MIN_ZOOM {
            return Err(ConfigError::invalid("sharedZoomCeiling", "must be a non-negative zoom"));
        }
        if self.pulse_interval_ms == 0 {
            return Err(ConfigError::invalid("pulseIntervalMs", "must be positive"));
        }
        let [lon, lat] = self.default_center;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ConfigError::invalid("defaultCenter", "not a lon/lat pair"));
        }
        self.cross_origin()?;
        Ok(())
    }

    pub fn default_center(&self) -> LonLat {
        LonLat::from(self.default_center)
    }

    pub fn pulse_interval(&self) -> Millis {
        Millis(self.pulse_interval_ms)
    }

    pub fn cross_origin(&self) -> Result<Option<CrossOrigin>, ConfigError> {
        match self.cross_origin.as_deref() {
            None => Ok(None),
            Some("anonymous") => Ok(Some(CrossOrigin::Anonymous)),
            Some("use-credentials") => Ok(Some(CrossOrigin::UseCredentials)),
            Some(_) => Err(ConfigError::invalid(
                "crossOrigin",
                "expected \"anonymous\" or \"use-credentials\"",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid { field: &'static str, reason: &'static str },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid { field, reason }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "viewer config parse error: {msg}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid viewer config field {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use scene::CrossOrigin;

    use super::{ConfigError, ViewerConfig};

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(r#"{"defaultZoom": 4.5}"#).unwrap();
        assert_eq!(config.default_zoom, 4.5);
        assert_eq!(config.pulse_interval_ms, 300);
        assert_eq!(config.shared_zoom_ceiling, 19.0);
    }

    #[test]
    fn env_lookup_overrides_and_falls_back() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ATLAS_DEFAULT_ZOOM", "6"),
            ("ATLAS_PULSE_INTERVAL_MS", "not-a-number"),
            ("ATLAS_CROSS_ORIGIN", "use-credentials"),
        ]);
        let config = ViewerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.default_zoom, 6.0);
        assert_eq!(config.pulse_interval_ms, 300);
        assert_eq!(config.cross_origin().unwrap(), Some(CrossOrigin::UseCredentials));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            ViewerConfig::from_json_str(r#"{"defaultZoom": 40}"#).unwrap_err(),
            ConfigError::Invalid {
                field: "defaultZoom",
                reason: "outside the engine zoom range"
            }
        );
        assert!(ViewerConfig::from_json_str(r#"{"pulseIntervalMs": 0}"#).is_err());
        assert!(ViewerConfig::from_json_str(r#"{"crossOrigin": "sometimes"}"#).is_err());
        assert!(matches!(
            ViewerConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
