use serde::{Deserialize, Serialize};
use tracing::debug;

use vdlx_core::{GazeDataSource, Record, TimestampSource};

/// A blink accepted by the multi-signal confidence detector. Unlike
/// [`GazeDataMiss`](crate::GazeDataMiss), carries no further classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blink {
    pub start_timestamp: i64,
    pub start_index: usize,
    pub end_timestamp: i64,
    pub end_index: usize,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBlinkConfig {
    /// ms
    pub blink_min_duration: i64,
    /// ms
    pub blink_max_duration: i64,
    /// Samples read on each side of a candidate when scoring it.
    pub buffer_size: usize,
    /// Expected gaze-rotation step entering the gap (degrees).
    pub eye_threshold_left: f64,
    /// Expected gaze-rotation step leaving the gap (degrees).
    pub eye_threshold_right: f64,
    /// Expected pupil-size step around the gap.
    pub pupil_size_threshold: f64,
    /// Expected pupil-openness drop entering the gap.
    pub pupil_openness_threshold: f64,
    /// Every channel must score above this for a candidate to be accepted.
    pub threshold_confidence: f64,
}

impl Default for ConfidenceBlinkConfig {
    fn default() -> Self {
        Self {
            blink_min_duration: 40,
            blink_max_duration: 350,
            buffer_size: 5,
            eye_threshold_left: -0.5,
            eye_threshold_right: -2.0,
            pupil_size_threshold: -0.1,
            pupil_openness_threshold: -0.15,
            threshold_confidence: 0.4,
        }
    }
}

/// Scans full records for blink-length sampling gaps and scores each
/// candidate on three independent channels: gaze-rotation step, pupil-size
/// step and pupil-openness step. Only a candidate where all three exceed
/// the confidence threshold becomes a blink.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceBlinkDetector {
    config: ConfidenceBlinkConfig,
}

// Left/right raw differences whose ratio leaves this band are asymmetric:
// the signal stepped and stayed there, which is not blink-like.
const SYMMETRY_BAND: (f64, f64) = (0.3, 3.0);

impl ConfidenceBlinkDetector {
    pub fn new(config: ConfidenceBlinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfidenceBlinkConfig {
        &self.config
    }

    pub fn find(
        &self,
        records: &[Record],
        timestamps: TimestampSource,
        gaze: GazeDataSource,
    ) -> Vec<Blink> {
        let mut blinks = Vec::new();

        let buffer = self.config.buffer_size;
        if records.len() <= buffer {
            return blinks;
        }

        let mut last_timestamp = timestamps.of(&records[buffer - 1]);
        let mut i = buffer;

        while i < records.len() {
            let timestamp = timestamps.of(&records[i]);
            let interval = timestamp - last_timestamp;

            if interval >= self.config.blink_min_duration
                && interval <= self.config.blink_max_duration
            {
                let eye = self.score(
                    records,
                    i,
                    self.config.eye_threshold_left,
                    self.config.eye_threshold_right,
                    false,
                    |r| gaze.of(r),
                );
                let pupil_size = self.score(
                    records,
                    i,
                    self.config.pupil_size_threshold,
                    self.config.pupil_size_threshold,
                    false,
                    Record::pupil_size,
                );
                // The lids reopen slowly, so only the closing edge of the
                // openness signal is informative.
                let pupil_openness = self.score(
                    records,
                    i,
                    self.config.pupil_openness_threshold,
                    self.config.pupil_openness_threshold,
                    true,
                    Record::pupil_openness,
                );

                let accept = [eye, pupil_size, pupil_openness]
                    .iter()
                    .all(|&confidence| confidence > self.config.threshold_confidence);

                if accept {
                    debug!(
                        "[{i}] {timestamp} blink: eye {eye:.2}, size {pupil_size:.2}, \
                         openness {pupil_openness:.2}"
                    );

                    blinks.push(Blink {
                        start_timestamp: last_timestamp,
                        start_index: i - 1,
                        end_timestamp: timestamp,
                        end_index: i,
                        duration: interval,
                    });

                    // Jump past the accepted window so its trailing edge is
                    // not re-detected.
                    i += buffer;
                }
            }

            last_timestamp = timestamp;
            i += 1;
        }

        blinks
    }

    /// Confidence in `[0, 1]` that the channel stepped like a blink around
    /// `index`: the change over `buffer_size` samples entering the gap (and,
    /// unless `ignore_right`, leaving it) is normalized by the expected step
    /// and squashed through a bounded soft sign. Single evaluation, no side
    /// effects.
    fn score(
        &self,
        records: &[Record],
        index: usize,
        threshold_left: f64,
        threshold_right: f64,
        ignore_right: bool,
        channel: impl Fn(&Record) -> f64,
    ) -> f64 {
        let buffer = self.config.buffer_size;
        if index < buffer || index + buffer >= records.len() {
            return 0.0;
        }

        let diff_left = channel(&records[index - 1]) - channel(&records[index - buffer]);
        let left = soft_sign(diff_left / threshold_left * 1.75);

        if ignore_right {
            return left.clamp(0.0, 1.0);
        }

        let diff_right = channel(&records[index]) - channel(&records[index + buffer - 1]);
        let ratio = if diff_right != 0.0 {
            diff_left / diff_right
        } else {
            f64::INFINITY
        };
        if !(SYMMETRY_BAND.0..=SYMMETRY_BAND.1).contains(&ratio) {
            return 0.0;
        }

        let right = soft_sign(diff_right / threshold_right * 1.75);
        left.min(right).clamp(0.0, 1.0)
    }
}

fn soft_sign(a: f64) -> f64 {
    a / (1.0 + a * a).sqrt()
}
