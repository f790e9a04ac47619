use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, Year, YearMapper};

/// Loading deadline used when the caller supplies nothing usable.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Interval between readiness checks while loading.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Top-level configuration structure for the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub surface_id: String,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub start_year: Year,
    pub start_muted: bool,
    pub track: TrackConfig,
    pub assets: AssetConfig,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            surface_id: "timeline".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            start_year: Year::START,
            start_muted: false,
            track: TrackConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn mapper(&self) -> Result<YearMapper> {
        YearMapper::new(self.track.left, self.track.width)
    }
}

/// Geometry of the slider track, in surface pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub left: f64,
    pub width: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            left: 40.0,
            width: 560.0,
        }
    }
}

/// Where the year images and audio clips live. Patterns substitute `{year}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: String,
    pub image_pattern: String,
    pub audio_pattern: String,
    pub loop_clip: String,
    pub ding_clip: String,
    /// The documented subset of years that have a background image.
    pub image_years: Vec<Year>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        let image_years = [
            1970, 1971, 1973, 1975, 1977, 1979, 1981, 1983, 1984, 1986, 1988, 1990, 1992, 1994,
            1996, 1998,
        ]
        .into_iter()
        .map(Year::clamped)
        .collect();

        Self {
            root: "assets".to_string(),
            image_pattern: "images/{year}.png".to_string(),
            audio_pattern: "audio/{year}.wav".to_string(),
            loop_clip: "audio/loop.wav".to_string(),
            ding_clip: "audio/ding.wav".to_string(),
            image_years,
        }
    }
}

impl AssetConfig {
    pub fn image_path(&self, year: Year) -> String {
        self.image_pattern.replace("{year}", &year.to_string())
    }

    pub fn audio_path(&self, year: Year) -> String {
        self.audio_pattern.replace("{year}", &year.to_string())
    }
}

/// Converts a caller-supplied timeout into a deadline. Anything that is not a
/// positive finite number of milliseconds yields the default.
pub fn sanitize_timeout(timeout_ms: Option<f64>) -> Duration {
    match timeout_ms {
        Some(ms) if ms.is_finite() && ms >= 1.0 => Duration::from_millis(ms as u64),
        _ => Duration::from_millis(DEFAULT_TIMEOUT_MS),
    }
}

/// Lenient parser for timeouts given as text, e.g. on the command line.
pub fn parse_timeout(raw: &str) -> Duration {
    sanitize_timeout(raw.trim().parse::<f64>().ok())
}
