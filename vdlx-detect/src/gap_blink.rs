use serde::{Deserialize, Serialize};

use vdlx_core::Sample;

/// An interval where gaze tracking produced no samples: a blink, a long
/// tracking loss, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeDataMiss {
    pub start_timestamp: i64,
    pub start_index: usize,
    pub end_timestamp: i64,
    pub end_index: usize,
    pub duration: i64,
    pub is_blink: bool,
    pub is_long: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapBlinkConfig {
    /// ms; inter-sample gaps up to this long are normal sampling jitter.
    pub min_gaze_lost_interval: i64,
    /// ms
    pub blink_min_duration: i64,
    /// ms
    pub blink_max_duration: i64,
    /// ms; misses closer than this are one event split by a stray sample.
    pub merge_interval: i64,
    /// A blink returns gaze to the same angle; a larger level shift across
    /// the gap means the tracker lost the eye.
    pub blink_max_level_difference: f64,
    pub level_difference_buffer_size: usize,
}

impl Default for GapBlinkConfig {
    fn default() -> Self {
        Self {
            min_gaze_lost_interval: 40,
            blink_min_duration: 120,
            blink_max_duration: 350,
            merge_interval: 100,
            blink_max_level_difference: 6.0,
            level_difference_buffer_size: 3,
        }
    }
}

/// Detects gaze-data misses from timestamp gaps in the gaze series and
/// classifies each by duration, refined afterwards by the signal level on
/// both sides of the gap.
#[derive(Debug, Clone, Default)]
pub struct GapBlinkDetector {
    config: GapBlinkConfig,
}

impl GapBlinkDetector {
    pub fn new(config: GapBlinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GapBlinkConfig {
        &self.config
    }

    pub fn find(&self, samples: &[Sample]) -> Vec<GazeDataMiss> {
        let mut misses: Vec<GazeDataMiss> = Vec::new();

        let mut previous: Option<(usize, i64)> = None;
        let mut last_miss_end: Option<i64> = None;

        for (index, sample) in samples.iter().enumerate() {
            if let Some((previous_index, previous_timestamp)) = previous {
                let interval = sample.timestamp - previous_timestamp;
                if interval > self.config.min_gaze_lost_interval {
                    let merge = last_miss_end
                        .is_some_and(|end| previous_timestamp - end < self.config.merge_interval);

                    if let (true, Some(last)) = (merge, misses.last_mut()) {
                        // A stray sample split one loss in two: extend the
                        // previous miss instead of starting another.
                        let duration = sample.timestamp - last.start_timestamp;
                        *last = self.classified(
                            last.start_timestamp,
                            last.start_index,
                            sample.timestamp,
                            index,
                            duration,
                        );
                    } else {
                        misses.push(self.classified(
                            previous_timestamp,
                            previous_index,
                            sample.timestamp,
                            index,
                            interval,
                        ));
                    }

                    last_miss_end = Some(sample.timestamp);
                }
            }

            previous = Some((index, sample.timestamp));
        }

        self.refine_classification(samples, &mut misses);

        misses
    }

    fn classified(
        &self,
        start_timestamp: i64,
        start_index: usize,
        end_timestamp: i64,
        end_index: usize,
        duration: i64,
    ) -> GazeDataMiss {
        GazeDataMiss {
            start_timestamp,
            start_index,
            end_timestamp,
            end_index,
            duration,
            is_blink: duration >= self.config.blink_min_duration
                && duration <= self.config.blink_max_duration,
            is_long: duration > self.config.blink_max_duration,
        }
    }

    /// Downgrades `is_blink` when the mean level just before the miss and
    /// just after it differ too much. Downgrade only, never upgrade.
    fn refine_classification(&self, samples: &[Sample], misses: &mut [GazeDataMiss]) {
        for miss in misses.iter_mut() {
            let before = directional_mean(
                samples,
                miss.start_index,
                Walk::Backward,
                self.config.level_difference_buffer_size,
            );
            let after = directional_mean(
                samples,
                miss.end_index,
                Walk::Forward,
                self.config.level_difference_buffer_size,
            );

            if (before - after).abs() > self.config.blink_max_level_difference {
                miss.is_blink = false;
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Walk {
    Forward,
    Backward,
}

/// Mean over up to `size` samples walking from `start` in the given
/// direction; 0 when the walk leaves the series immediately.
fn directional_mean(samples: &[Sample], start: usize, walk: Walk, size: usize) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut index = start as isize;
    let step = match walk {
        Walk::Forward => 1isize,
        Walk::Backward => -1isize,
    };

    while index >= 0 && (index as usize) < samples.len() && count < size {
        sum += samples[index as usize].value;
        count += 1;
        index += step;
    }

    sum / count.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_at(timestamps: &[i64]) -> Vec<Sample> {
        timestamps.iter().map(|&t| Sample::new(t, 1.0)).collect()
    }

    fn detector() -> GapBlinkDetector {
        GapBlinkDetector::default()
    }

    #[test]
    fn classifies_a_blink_sized_gap() {
        // 150 ms without samples between t=20 and t=170.
        let misses = detector().find(&samples_at(&[0, 10, 20, 170, 180, 190]));

        assert_eq!(misses.len(), 1);
        let miss = misses[0];
        assert_eq!(miss.start_timestamp, 20);
        assert_eq!(miss.start_index, 2);
        assert_eq!(miss.end_timestamp, 170);
        assert_eq!(miss.end_index, 3);
        assert_eq!(miss.duration, 150);
        assert!(miss.is_blink);
        assert!(!miss.is_long);
    }

    #[test]
    fn blink_classification_boundaries() {
        let config = GapBlinkConfig::default();
        let detector = detector();

        // Exactly blink_min_duration.
        let misses = detector.find(&samples_at(&[0, 10, 10 + config.blink_min_duration]));
        assert!(misses[0].is_blink);

        // One ms shorter.
        let misses = detector.find(&samples_at(&[0, 10, 10 + config.blink_min_duration - 1]));
        assert_eq!(misses.len(), 1);
        assert!(!misses[0].is_blink);
        assert!(!misses[0].is_long);

        // Past blink_max_duration.
        let misses = detector.find(&samples_at(&[0, 10, 10 + config.blink_max_duration + 1]));
        assert!(!misses[0].is_blink);
        assert!(misses[0].is_long);
    }

    #[test]
    fn merges_gaps_split_by_a_stray_sample() {
        // Two 150 ms gaps with a 10 ms island between: one merged miss.
        let misses = detector().find(&samples_at(&[0, 10, 160, 170, 320, 330]));

        assert_eq!(misses.len(), 1);
        let miss = misses[0];
        assert_eq!(miss.start_timestamp, 10);
        assert_eq!(miss.end_timestamp, 320);
        assert_eq!(miss.duration, 310);
        assert!(miss.is_blink);

        // Same gaps but the stretch between them outlasts the merge
        // interval: two misses.
        let misses = detector().find(&samples_at(&[
            0, 10, 160, 170, 180, 190, 200, 210, 220, 230, 240, 250, 260, 270, 280, 430, 440,
        ]));
        assert_eq!(misses.len(), 2);
        assert_eq!(misses[0].duration, 150);
        assert_eq!(misses[1].duration, 150);
    }

    #[test]
    fn level_shift_downgrades_blink() {
        // A blink-length gap, but the gaze angle lands 20 degrees away.
        let samples = vec![
            Sample::new(0, 1.0),
            Sample::new(10, 1.0),
            Sample::new(20, 1.0),
            Sample::new(170, 21.0),
            Sample::new(180, 21.0),
            Sample::new(190, 21.0),
        ];

        let misses = detector().find(&samples);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].duration, 150);
        assert!(!misses[0].is_blink);
    }

    #[test]
    fn empty_and_gapless_input() {
        let detector = detector();

        assert!(detector.find(&[]).is_empty());
        assert!(detector.find(&samples_at(&[0, 10, 20, 30])).is_empty());
    }
}
