use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;

use vdlx_analysis::{Processor, Summary, SummaryFormat, Trial};
use vdlx_core::{PupilCalibration, Recording};
use vdlx_detect::{
    Blink, ConfidenceBlinkDetector, GapBlinkDetector, GazeDataMiss, Peak, PeakDetector,
};

use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "vdlx", version, about = "Analyze multi-modal VR experiment recordings")]
pub struct Cli {
    /// Recording log file.
    recording: PathBuf,

    /// Pupil-size calibration recording.
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Settings file; created with defaults on the first run.
    #[arg(long, default_value = "vdlx-settings.json")]
    settings: PathBuf,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::List)]
    format: Format,

    /// Search for downward gaze excursions instead of upward ones.
    #[arg(long)]
    reverse_gaze: bool,

    /// Write detected peaks, blinks and trials to a JSON file.
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    List,
    Rows,
    RowHeaders,
}

impl From<Format> for SummaryFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::List => SummaryFormat::List,
            Format::Rows => SummaryFormat::Rows,
            Format::RowHeaders => SummaryFormat::RowHeaders,
        }
    }
}

/// Everything the pipeline detected, for downstream tooling.
#[derive(Serialize)]
struct Export<'a> {
    participant: &'a str,
    session: &'a str,
    hand_peaks: &'a [Peak],
    gaze_peaks: &'a [Peak],
    trials: &'a [Trial],
    gaze_data_misses: &'a [GazeDataMiss],
    blinks: &'a [Blink],
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.settings);

    let recording = Recording::load(&cli.recording)
        .with_context(|| format!("cannot load recording {}", cli.recording.display()))?;
    info!(
        "participant '{}', session '{}', {} records",
        recording.participant,
        recording.session,
        recording.records.len()
    );

    let calibration = match &cli.calibration {
        Some(path) => Some(
            PupilCalibration::load(path)
                .with_context(|| format!("cannot load calibration {}", path.display()))?,
        ),
        None => None,
    };

    let mut gaze_peak_detector = PeakDetector::new(settings.gaze_peaks.clone());
    if cli.reverse_gaze {
        gaze_peak_detector.reverse_direction();
    }

    let mut processor = Processor::new(
        settings.options,
        PeakDetector::new(settings.hand_peaks.clone()),
        gaze_peak_detector,
        GapBlinkDetector::new(settings.gap_blinks.clone()),
        ConfidenceBlinkDetector::new(settings.confidence_blinks.clone()),
    );
    processor.feed(&recording.records);

    let summary = Summary::new(
        &processor,
        settings.quantile_threshold,
        calibration.map(|c| c.size),
    );
    println!("{}", summary.render(cli.format.into()));

    if let Some(path) = &cli.export {
        let export = Export {
            participant: &recording.participant,
            session: &recording.session,
            hand_peaks: &processor.hand_peaks,
            gaze_peaks: &processor.gaze_peaks,
            trials: &processor.trials,
            gaze_data_misses: &processor.gaze_data_misses,
            blinks: &processor.blinks,
        };
        let file = File::create(path)
            .with_context(|| format!("cannot write export {}", path.display()))?;
        serde_json::to_writer_pretty(file, &export)?;
        info!("exported detections to {}", path.display());
    }

    // Keep the settings file around so the next run starts from the same
    // tuning, creating it on the first run.
    settings
        .save(&cli.settings)
        .with_context(|| format!("cannot save settings {}", cli.settings.display()))?;

    Ok(())
}
