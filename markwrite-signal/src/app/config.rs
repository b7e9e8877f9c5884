//! Configuration Management

use crate::analysis::classifier::DEFAULT_MAX_SAMPLE_GAP;
use crate::analysis::smoothing::{
    KernelPolicy, DEFAULT_ORDER, DEFAULT_WINDOW, REDUCED_MIN_SAMPLES, REDUCED_ORDER, REDUCED_WINDOW,
};
use crate::analysis::velocity::VelocitySource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Smoothing kernel settings
    #[serde(default)]
    pub filter: FilterConfig,
    /// Velocity settings
    #[serde(default)]
    pub velocity: VelocityConfig,
    /// Sample-state classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Stroke segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

/// Smoothing kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Window length (odd)
    pub window: usize,
    /// Polynomial order (< window)
    pub order: usize,
    /// Fallback window for short series
    pub reduced_window: usize,
    pub reduced_order: usize,
    /// Minimum series length for the fallback kernel
    pub reduced_min_samples: usize,
}

/// Velocity configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Differentiate filtered or raw positions
    pub source: VelocitySource,
}

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Inter-sample interval above which the stream counts as re-entered
    pub max_sample_gap_secs: f64,
}

/// Segmentation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub min_stroke_samples: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            order: DEFAULT_ORDER,
            reduced_window: REDUCED_WINDOW,
            reduced_order: REDUCED_ORDER,
            reduced_min_samples: REDUCED_MIN_SAMPLES,
        }
    }
}

impl FilterConfig {
    pub fn policy(&self) -> KernelPolicy {
        KernelPolicy {
            window: self.window,
            order: self.order,
            reduced_window: self.reduced_window,
            reduced_order: self.reduced_order,
            reduced_min_samples: self.reduced_min_samples,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_sample_gap_secs: DEFAULT_MAX_SAMPLE_GAP,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self { min_stroke_samples: 3 }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.filter
            .policy()
            .validate()
            .map_err(|e| crate::Error::Config(format!("filter: {e}")))?;
        let gap = self.classifier.max_sample_gap_secs;
        if !(gap.is_finite() && gap > 0.0) {
            return Err(crate::Error::Config(format!(
                "max_sample_gap_secs must be > 0, got {gap}"
            )));
        }
        if self.segmentation.min_stroke_samples == 0 {
            return Err(crate::Error::Config("min_stroke_samples must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self, crate::Error> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".markwrite").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a value by dotted key, e.g. `filter.window`
    pub fn get(&self, key: &str) -> Result<String, crate::Error> {
        let table = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let (section, field) = split_key(key)?;
        table
            .get(section)
            .and_then(|s| s.get(field))
            .map(render_value)
            .ok_or_else(|| crate::Error::Config(format!("unknown configuration key '{key}'")))
    }

    /// Set a value by dotted key. The result is validated before it replaces `self`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), crate::Error> {
        let mut table = toml::Value::try_from(&*self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let (section, field) = split_key(key)?;

        let slot = table
            .get_mut(section)
            .and_then(|s| s.get_mut(field))
            .ok_or_else(|| crate::Error::Config(format!("unknown configuration key '{key}'")))?;
        *slot = parse_like(slot, value)
            .ok_or_else(|| crate::Error::Config(format!("invalid value '{value}' for '{key}'")))?;

        let updated: Config = table.try_into().map_err(|e| crate::Error::Config(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn split_key(key: &str) -> Result<(&str, &str), crate::Error> {
    key.split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty())
        .ok_or_else(|| crate::Error::Config(format!("key must look like 'section.field', got '{key}'")))
}

fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse `raw` into the same TOML type as `current`
fn parse_like(current: &toml::Value, raw: &str) -> Option<toml::Value> {
    match current {
        toml::Value::Integer(_) => raw.parse().ok().map(toml::Value::Integer),
        toml::Value::Float(_) => raw.parse().ok().map(toml::Value::Float),
        toml::Value::Boolean(_) => raw.parse().ok().map(toml::Value::Boolean),
        toml::Value::String(_) => Some(toml::Value::String(raw.to_string())),
        _ => None,
    }
}
