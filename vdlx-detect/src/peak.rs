use serde::{Deserialize, Serialize};
use tracing::debug;

use vdlx_core::stats;
use vdlx_core::Sample;

/// A detected excursion in a scalar series: bounded by the timestamps where
/// the sliding mean difference crossed the threshold, with the median value
/// over the excursion as its amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub start_index: usize,
    pub timestamp_start: i64,
    pub timestamp_end: i64,
    pub amplitude: f64,
}

impl Peak {
    pub fn duration(&self) -> i64 {
        self.timestamp_end - self.timestamp_start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakDirection {
    Up,
    Down,
}

/// Peak detector tuning. `buffer_size` is the width of the sliding window
/// whose two halves are averaged and compared; it is clamped to at least 3
/// wherever it is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    #[serde(deserialize_with = "clamped_buffer_size")]
    pub buffer_size: usize,
    pub peak_threshold: f64,
    pub ignorance_threshold: f64,
    /// ms; longer excursions are discarded as drift, not gestures.
    pub max_peak_duration: i64,
    /// ms between the previous peak's end and the next peak's start.
    pub min_inter_peak_interval: i64,
    pub direction: PeakDirection,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self::hand()
    }
}

impl PeakConfig {
    /// Tuning for the vertical hand-landmark series.
    pub fn hand() -> Self {
        Self {
            buffer_size: 12,
            peak_threshold: 1.5,
            ignorance_threshold: 20.0,
            max_peak_duration: 1500,
            min_inter_peak_interval: 1000,
            direction: PeakDirection::Up,
        }
    }

    /// Tuning for the gaze-rotation series. Rotation values are signed
    /// angles, so the ignorance threshold is parked far below any of them.
    pub fn gaze() -> Self {
        Self {
            ignorance_threshold: -1000.0,
            ..Self::hand()
        }
    }
}

fn clamped_buffer_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = usize::deserialize(deserializer)?;
    Ok(value.max(3))
}

/// Finds excursions in a sample series with a dual-window mean-difference
/// hysteresis: a peak opens when the mean of the window's newer half rises
/// `peak_threshold` above the older half, and closes on the opposite
/// crossing.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    config: PeakConfig,
}

impl PeakDetector {
    pub fn new(mut config: PeakConfig) -> Self {
        config.buffer_size = config.buffer_size.max(3);
        Self { config }
    }

    pub fn config(&self) -> &PeakConfig {
        &self.config
    }

    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.config.buffer_size = buffer_size.max(3);
    }

    /// Negates the peak threshold and flips the direction, so the same
    /// detector can search for negative-going excursions when the gaze
    /// series is peaked the other way.
    pub fn reverse_direction(&mut self) {
        self.config.peak_threshold = -self.config.peak_threshold;
        self.config.direction = match self.config.direction {
            PeakDirection::Up => PeakDirection::Down,
            PeakDirection::Down => PeakDirection::Up,
        };
    }

    /// Single forward pass over the series. Pure: repeated calls with the
    /// same input and configuration return identical results.
    pub fn find(&self, samples: &[Sample]) -> Vec<Peak> {
        let mut peaks = Vec::new();

        let buffer = self.config.buffer_size;
        let ignorance = match self.config.direction {
            PeakDirection::Up => self.config.ignorance_threshold,
            PeakDirection::Down => -self.config.ignorance_threshold,
        };

        let Some(mut i) = self.seek_buffer_head(samples, 0, ignorance) else {
            return peaks;
        };

        let mut in_peak = false;
        let mut timestamp_start = 0i64;
        let mut start_index = 0usize;
        let mut last_peak_end: Option<i64> = None;

        while i + 1 < samples.len() {
            i += 1;

            if self.is_below(samples[i].value, ignorance) {
                match self.seek_buffer_head(samples, i, ignorance) {
                    Some(head) => i = head,
                    None => break,
                }
            }

            let window = &samples[i - buffer..i];
            let (older, newer) = window.split_at(buffer / 2);
            let difference = window_mean(newer) - window_mean(older);

            let current = window[buffer / 2];
            let since_last_peak = match last_peak_end {
                Some(end) => current.timestamp - end,
                None => i64::MAX,
            };

            if !in_peak
                && self.is_above(difference, self.config.peak_threshold)
                && since_last_peak > self.config.min_inter_peak_interval
            {
                in_peak = true;
                timestamp_start = current.timestamp;
                start_index = i - buffer / 2;
            } else if in_peak && self.is_below(difference, -self.config.peak_threshold) {
                in_peak = false;

                let timestamp_end = current.timestamp;
                last_peak_end = Some(timestamp_end);

                if timestamp_end - timestamp_start < self.config.max_peak_duration {
                    let values: Vec<f64> =
                        samples[start_index..i].iter().map(|s| s.value).collect();
                    peaks.push(Peak {
                        start_index,
                        timestamp_start,
                        timestamp_end,
                        amplitude: stats::median(&values),
                    });
                } else {
                    debug!(
                        "[{start_index}] peak too long, dropped: {timestamp_start}-{timestamp_end} \
                         ({} ms)",
                        timestamp_end - timestamp_start
                    );
                }
            }
        }

        peaks
    }

    /// Advances the cursor past any run of ignored samples starting at
    /// `from`, then verifies that a full window of `buffer_size` consecutive
    /// valid samples follows, restarting the scan past any invalid sample it
    /// meets. Returns the index of the window's last sample, or `None` when
    /// not enough usable data remains.
    fn seek_buffer_head(&self, samples: &[Sample], from: usize, ignorance: f64) -> Option<usize> {
        let buffer = self.config.buffer_size;
        let mut start = from;

        'scan: loop {
            while start < samples.len() && self.is_below(samples[start].value, ignorance) {
                start += 1;
            }

            let end = start.checked_add(buffer)?;
            if end > samples.len() {
                return None;
            }

            for j in start + 1..end {
                if self.is_below(samples[j].value, ignorance) {
                    start = j + 1;
                    continue 'scan;
                }
            }

            return Some(end - 1);
        }
    }

    fn is_below(&self, value: f64, threshold: f64) -> bool {
        match self.config.direction {
            PeakDirection::Up => value < threshold,
            PeakDirection::Down => value > threshold,
        }
    }

    fn is_above(&self, value: f64, threshold: f64) -> bool {
        match self.config.direction {
            PeakDirection::Up => value > threshold,
            PeakDirection::Down => value < threshold,
        }
    }
}

fn window_mean(samples: &[Sample]) -> f64 {
    samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as i64 * 10, v))
            .collect()
    }

    fn detector(buffer_size: usize, threshold: f64) -> PeakDetector {
        PeakDetector::new(PeakConfig {
            buffer_size,
            peak_threshold: threshold,
            ignorance_threshold: -1000.0,
            ..PeakConfig::hand()
        })
    }

    fn plateau() -> Vec<Sample> {
        series(&[
            0.0, 0.0, 0.0, 0.0, 25.0, 25.0, 25.0, 25.0, 0.0, 0.0, 0.0, 0.0,
        ])
    }

    #[test]
    fn finds_a_plateau_peak() {
        let peaks = detector(4, 5.0).find(&plateau());

        assert_eq!(peaks.len(), 1);
        let peak = peaks[0];
        assert_eq!(peak.start_index, 3);
        assert_eq!(peak.timestamp_start, 30);
        assert_eq!(peak.timestamp_end, 70);
        assert_eq!(peak.amplitude, 25.0);
    }

    #[test]
    fn find_is_deterministic() {
        let detector = detector(4, 5.0);
        let samples = plateau();

        assert_eq!(detector.find(&samples), detector.find(&samples));
    }

    #[test]
    fn short_or_empty_input_yields_no_peaks() {
        let detector = detector(4, 5.0);

        assert!(detector.find(&[]).is_empty());
        assert!(detector.find(&series(&[0.0, 25.0, 0.0])).is_empty());
    }

    #[test]
    fn unterminated_peak_is_not_emitted() {
        // Rises and never comes back down.
        let samples = series(&[0.0, 0.0, 0.0, 0.0, 25.0, 25.0, 25.0, 25.0, 25.0]);
        assert!(detector(4, 5.0).find(&samples).is_empty());
    }

    #[test]
    fn overlong_peak_is_dropped() {
        let mut config = PeakConfig {
            buffer_size: 4,
            peak_threshold: 5.0,
            ignorance_threshold: -1000.0,
            ..PeakConfig::hand()
        };
        config.max_peak_duration = 30;

        assert!(PeakDetector::new(config).find(&plateau()).is_empty());
    }

    #[test]
    fn respects_min_inter_peak_interval() {
        let mut values = vec![0.0, 0.0, 0.0, 0.0];
        values.extend([25.0, 25.0, 25.0, 25.0]);
        values.extend([0.0, 0.0, 0.0, 0.0]);
        values.extend([25.0, 25.0, 25.0, 25.0]);
        values.extend([0.0, 0.0, 0.0, 0.0]);
        let samples = series(&values);

        let mut config = PeakConfig {
            buffer_size: 4,
            peak_threshold: 5.0,
            ignorance_threshold: -1000.0,
            ..PeakConfig::hand()
        };

        // Second rise starts ~40 ms after the first peak ends.
        config.min_inter_peak_interval = 60;
        assert_eq!(PeakDetector::new(config.clone()).find(&samples).len(), 1);

        config.min_inter_peak_interval = 10;
        let peaks = PeakDetector::new(config).find(&samples);
        assert_eq!(peaks.len(), 2);
        assert!(peaks[0].timestamp_end < peaks[1].timestamp_start);
    }

    #[test]
    fn ignorance_threshold_skips_invalid_runs() {
        // A dropout to -5000 inside flat data must not produce a peak.
        let samples = series(&[
            0.0, 0.0, 0.0, 0.0, -5000.0, -5000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ]);

        assert!(detector(4, 5.0).find(&samples).is_empty());
    }

    #[test]
    fn reversed_detector_finds_valleys() {
        let samples = series(&[
            0.0, 0.0, 0.0, 0.0, -25.0, -25.0, -25.0, -25.0, 0.0, 0.0, 0.0, 0.0,
        ]);

        // The gaze preset parks the ignorance threshold at -1000; after the
        // reversal it bounds the series from above instead.
        let mut detector = PeakDetector::new(PeakConfig {
            buffer_size: 4,
            peak_threshold: 5.0,
            ..PeakConfig::gaze()
        });
        detector.reverse_direction();

        let peaks = detector.find(&samples);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].amplitude, -25.0);
    }

    #[test]
    fn buffer_size_is_clamped() {
        let mut detector = PeakDetector::new(PeakConfig {
            buffer_size: 1,
            ..PeakConfig::hand()
        });
        assert_eq!(detector.config().buffer_size, 3);

        detector.set_buffer_size(0);
        assert_eq!(detector.config().buffer_size, 3);
    }
}
