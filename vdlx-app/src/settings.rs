use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use vdlx_analysis::ProcessorOptions;
use vdlx_detect::{ConfidenceBlinkConfig, GapBlinkConfig, PeakConfig};

/// Everything tunable in one JSON document: pipeline options plus each
/// detector's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub options: ProcessorOptions,
    /// Quantile reported alongside each median, mirrored around 0.5.
    pub quantile_threshold: f64,
    pub hand_peaks: PeakConfig,
    pub gaze_peaks: PeakConfig,
    pub gap_blinks: GapBlinkConfig,
    pub confidence_blinks: ConfidenceBlinkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            options: ProcessorOptions::default(),
            quantile_threshold: 0.1,
            hand_peaks: PeakConfig::hand(),
            gaze_peaks: PeakConfig::gaze(),
            gap_blinks: GapBlinkConfig::default(),
            confidence_blinks: ConfidenceBlinkConfig::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to the defaults when the
    /// file is missing or unreadable. A corrupt settings file should never
    /// block an analysis run.
    pub fn load(path: &Path) -> Settings {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Settings::default(),
        };

        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(error) => {
                warn!("ignoring corrupt settings at {}: {error}", path.display());
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
