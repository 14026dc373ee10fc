use serde::{Deserialize, Serialize};

use vdlx_core::{
    GazeDataSource, HandDataSource, Record, Sample, TimestampSource, TimestampedTaskEvent,
    gaze_samples, hand_samples, pupil_sizes, task_events,
};
use vdlx_detect::{
    Blink, ConfidenceBlinkDetector, GapBlinkDetector, GazeDataMiss, Peak, PeakConfig, PeakDetector,
};

use crate::trial::{Trial, match_trials};

/// Pipeline-wide options shared by series projection and trial matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorOptions {
    pub timestamp_source: TimestampSource,
    pub hand_data_source: HandDataSource,
    pub gaze_data_source: GazeDataSource,
    /// ms; how far a glance may start from the reach it belongs to.
    pub max_hand_gaze_delay: i64,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            timestamp_source: TimestampSource::System,
            hand_data_source: HandDataSource::IndexFinger,
            gaze_data_source: GazeDataSource::PitchRotation,
            max_hand_gaze_delay: 1500,
        }
    }
}

/// Runs every detector over one recording and keeps all intermediate
/// products for reporting. Re-running after a parameter change reprocesses
/// the records from scratch.
#[derive(Debug, Clone)]
pub struct Processor {
    pub options: ProcessorOptions,
    pub hand_peak_detector: PeakDetector,
    pub gaze_peak_detector: PeakDetector,
    pub gap_blink_detector: GapBlinkDetector,
    pub confidence_blink_detector: ConfidenceBlinkDetector,

    pub hand_samples: Vec<Sample>,
    pub gaze_samples: Vec<Sample>,
    pub hand_peaks: Vec<Peak>,
    pub gaze_peaks: Vec<Peak>,
    pub trials: Vec<Trial>,
    pub gaze_data_misses: Vec<GazeDataMiss>,
    pub blinks: Vec<Blink>,
    pub pupil_sizes: Vec<f64>,
    pub task_events: Vec<TimestampedTaskEvent>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(
            ProcessorOptions::default(),
            PeakDetector::new(PeakConfig::hand()),
            PeakDetector::new(PeakConfig::gaze()),
            GapBlinkDetector::default(),
            ConfidenceBlinkDetector::default(),
        )
    }
}

impl Processor {
    pub fn new(
        options: ProcessorOptions,
        hand_peak_detector: PeakDetector,
        gaze_peak_detector: PeakDetector,
        gap_blink_detector: GapBlinkDetector,
        confidence_blink_detector: ConfidenceBlinkDetector,
    ) -> Self {
        Self {
            options,
            hand_peak_detector,
            gaze_peak_detector,
            gap_blink_detector,
            confidence_blink_detector,
            hand_samples: Vec::new(),
            gaze_samples: Vec::new(),
            hand_peaks: Vec::new(),
            gaze_peaks: Vec::new(),
            trials: Vec::new(),
            gaze_data_misses: Vec::new(),
            blinks: Vec::new(),
            pupil_sizes: Vec::new(),
            task_events: Vec::new(),
        }
    }

    pub fn feed(&mut self, records: &[Record]) {
        let options = self.options;

        self.hand_samples = hand_samples(
            records,
            options.hand_data_source,
            options.timestamp_source,
        );
        self.gaze_samples = gaze_samples(
            records,
            options.gaze_data_source,
            options.timestamp_source,
        );

        self.hand_peaks = self.hand_peak_detector.find(&self.hand_samples);
        self.gaze_peaks = self.gaze_peak_detector.find(&self.gaze_samples);

        self.trials = match_trials(
            records,
            &self.hand_peaks,
            &self.gaze_peaks,
            options.timestamp_source,
            options.max_hand_gaze_delay,
        );

        self.gaze_data_misses = self.gap_blink_detector.find(&self.gaze_samples);
        self.blinks = self.confidence_blink_detector.find(
            records,
            options.timestamp_source,
            options.gaze_data_source,
        );

        self.pupil_sizes = pupil_sizes(records);
        self.task_events = task_events(records, options.timestamp_source);
    }
}
