use crate::error::{AnalyticsError, AnalyticsResult};
use crate::services::cache::HashMode;
use crate::services::segments::{CapacityThresholds, SegmentThresholds};
use crate::services::timing::DEFAULT_MAX_INTERVAL_DAYS;
use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_INSIGHT_TOP_N: usize = 5;
const MAX_TIMING_DAYS: u32 = 3650;

pub(crate) fn overrides_path() -> Option<PathBuf> {
    env_optional_string("LEADGEN_CONFIG_PATH").map(PathBuf::from)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigOverrides {
    #[serde(default)]
    cache_hash_mode: Option<String>,
    #[serde(default)]
    timing_max_days: Option<u32>,
    #[serde(default)]
    segment_medium_threshold: Option<f64>,
    #[serde(default)]
    segment_enterprise_threshold: Option<f64>,
    #[serde(default)]
    capacity_medium_per_day: Option<f64>,
    #[serde(default)]
    capacity_high_per_day: Option<f64>,
    #[serde(default)]
    insight_top_n: Option<usize>,
}

fn load_overrides(path: &Path) -> Option<ConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read analytics config overrides; using defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse analytics config overrides; using defaults"
            );
            None
        }
    }
}

fn apply_overrides(config: &mut AnalyticsConfig, overrides: &ConfigOverrides) {
    if let Some(mode) = overrides.cache_hash_mode.as_deref() {
        match HashMode::parse(mode) {
            Some(mode) => config.cache_hash_mode = mode,
            None => tracing::warn!(value = mode, "unknown cache_hash_mode override ignored"),
        }
    }
    if let Some(days) = overrides.timing_max_days.filter(|v| *v != 0) {
        config.timing_max_days = days.min(MAX_TIMING_DAYS);
    }
    if let Some(value) = finite_non_negative(overrides.segment_medium_threshold) {
        config.segments.medium = value;
    }
    if let Some(value) = finite_non_negative(overrides.segment_enterprise_threshold) {
        config.segments.enterprise = value;
    }
    if let Some(value) = finite_non_negative(overrides.capacity_medium_per_day) {
        config.capacity.medium_per_day = value;
    }
    if let Some(value) = finite_non_negative(overrides.capacity_high_per_day) {
        config.capacity.high_per_day = value;
    }
    if let Some(top_n) = overrides.insight_top_n.filter(|v| *v != 0) {
        config.insight_top_n = top_n;
    }
}

fn apply_env(config: &mut AnalyticsConfig) {
    if let Some(raw) = env_optional_string("LEADGEN_CACHE_HASH_MODE") {
        match HashMode::parse(&raw) {
            Some(mode) => config.cache_hash_mode = mode,
            None => tracing::warn!(value = %raw, "unknown LEADGEN_CACHE_HASH_MODE ignored"),
        }
    }
    config.timing_max_days =
        env_u32("LEADGEN_TIMING_MAX_DAYS", config.timing_max_days).clamp(1, MAX_TIMING_DAYS);
    config.segments.medium = env_f64("LEADGEN_SEGMENT_MEDIUM_THRESHOLD", config.segments.medium);
    config.segments.enterprise = env_f64(
        "LEADGEN_SEGMENT_ENTERPRISE_THRESHOLD",
        config.segments.enterprise,
    );
    config.capacity.medium_per_day = env_f64(
        "LEADGEN_CAPACITY_MEDIUM_PER_DAY",
        config.capacity.medium_per_day,
    );
    config.capacity.high_per_day =
        env_f64("LEADGEN_CAPACITY_HIGH_PER_DAY", config.capacity.high_per_day);
    config.insight_top_n = (env_u64("LEADGEN_INSIGHT_TOP_N", config.insight_top_n as u64)
        as usize)
        .max(1);
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub cache_hash_mode: HashMode,
    /// Ceiling for matched stage intervals; longer gaps are treated as outliers.
    pub timing_max_days: u32,
    pub segments: SegmentThresholds,
    pub capacity: CapacityThresholds,
    pub insight_top_n: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_hash_mode: HashMode::default(),
            timing_max_days: DEFAULT_MAX_INTERVAL_DAYS,
            segments: SegmentThresholds::default(),
            capacity: CapacityThresholds::default(),
            insight_top_n: DEFAULT_INSIGHT_TOP_N,
        }
    }
}

impl AnalyticsConfig {
    /// Defaults, then the JSON overrides file, then `LEADGEN_*` env vars.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mut config = Self::default();
        if let Some(overrides) = overrides_path().and_then(|path| load_overrides(&path)) {
            apply_overrides(&mut config, &overrides);
        }
        apply_env(&mut config);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.segments.medium > self.segments.enterprise {
            return Err(AnalyticsError::invalid_config(format!(
                "segment medium threshold ({}) exceeds enterprise threshold ({})",
                self.segments.medium, self.segments.enterprise
            )));
        }
        if self.capacity.medium_per_day > self.capacity.high_per_day {
            return Err(AnalyticsError::invalid_config(format!(
                "capacity medium threshold ({}) exceeds high threshold ({})",
                self.capacity.medium_per_day, self.capacity.high_per_day
            )));
        }
        if self.timing_max_days == 0 {
            return Err(AnalyticsError::invalid_config(
                "timing_max_days must be at least 1",
            ));
        }
        Ok(())
    }
}

fn finite_non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    finite_non_negative(
        std::env::var(key)
            .ok()
            .and_then(|value| value.trim().parse::<f64>().ok()),
    )
    .unwrap_or(default)
}
