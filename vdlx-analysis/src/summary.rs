use serde::{Deserialize, Serialize};

use vdlx_core::{Sample, stats};

use crate::bids::{Bid, TemporalBids};
use crate::processor::Processor;

/// How a summary is rendered: a readable list, spreadsheet row values, or
/// the matching row headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryFormat {
    List,
    Rows,
    RowHeaders,
}

/// Per-recording aggregates over the processor's outputs, ready to be
/// rendered for a report or pasted into a spreadsheet.
#[derive(Debug, Clone)]
pub struct Summary {
    quantile_threshold: f64,
    calibration_size: f64,

    hand_peak_count: usize,
    gaze_peak_count: usize,
    trial_count: usize,
    match_count: usize,
    correct_ratio: f64,

    response_times: Vec<f64>,
    gaze_advances: Vec<f64>,
    glance_durations: Vec<f64>,
    pupil_sizes: Vec<f64>,

    match_bids: Vec<Bid>,
    gaze_advance_bids: Vec<Bid>,

    miss_count: usize,
    gap_blink_count: usize,
    confidence_blink_count: usize,
    long_loss_count: usize,
}

// Aggregates over fewer peaks than this are noise and are masked in the
// row formats.
const MIN_PEAK_COUNT: usize = 10;

const BID_COUNT: usize = 5;

impl Summary {
    pub fn new(processor: &Processor, quantile_threshold: f64, calibration: Option<f64>) -> Self {
        let trials = &processor.trials;
        let matches: Vec<_> = trials.iter().filter(|t| t.has_hand_gaze_match()).collect();

        let response_times: Vec<f64> = trials
            .iter()
            .filter(|t| t.response_timestamp > 0)
            .map(|t| (t.response_timestamp - t.start_timestamp) as f64)
            .collect();

        // Sign flipped so that "the glance leads the reach" reads positive.
        let gaze_advances: Vec<f64> = matches
            .iter()
            .map(|t| -(t.gaze_hand_interval() as f64))
            .collect();

        let glance_durations: Vec<f64> = processor
            .gaze_peaks
            .iter()
            .map(|p| p.duration() as f64)
            .collect();

        let bids = TemporalBids::new(BID_COUNT);
        let gaze_advance_bids = bids.get(
            &matches
                .iter()
                .map(|t| Sample::new(t.start_timestamp, -(t.gaze_hand_interval() as f64)))
                .collect::<Vec<_>>(),
        );
        let match_bids = bids.get(
            &trials
                .iter()
                .map(|t| {
                    Sample::new(
                        t.start_timestamp,
                        if t.has_hand_gaze_match() { 1.0 } else { 0.0 },
                    )
                })
                .collect::<Vec<_>>(),
        );

        let correct = trials.iter().filter(|t| t.is_correct).count();

        Self {
            quantile_threshold,
            calibration_size: calibration.unwrap_or(0.0),
            hand_peak_count: processor.hand_peaks.len(),
            gaze_peak_count: processor.gaze_peaks.len(),
            trial_count: trials.len(),
            match_count: matches.len(),
            correct_ratio: if trials.is_empty() {
                f64::NAN
            } else {
                correct as f64 / trials.len() as f64
            },
            response_times,
            gaze_advances,
            glance_durations,
            pupil_sizes: processor.pupil_sizes.clone(),
            match_bids,
            gaze_advance_bids,
            miss_count: processor.gaze_data_misses.len(),
            gap_blink_count: processor
                .gaze_data_misses
                .iter()
                .filter(|m| m.is_blink)
                .count(),
            confidence_blink_count: processor.blinks.len(),
            long_loss_count: processor
                .gaze_data_misses
                .iter()
                .filter(|m| m.is_long)
                .count(),
        }
    }

    pub fn render(&self, format: SummaryFormat) -> String {
        match format {
            SummaryFormat::List => self.render_list(),
            SummaryFormat::Rows => self.render_rows(false),
            SummaryFormat::RowHeaders => self.render_rows(true),
        }
    }

    fn match_percentage(&self) -> f64 {
        if self.trial_count == 0 {
            f64::NAN
        } else {
            100.0 * self.match_count as f64 / self.trial_count as f64
        }
    }

    fn render_list(&self) -> String {
        let ql = self.quantile_threshold;
        let qh = 1.0 - ql;

        let (response_mean, response_std) = stats::mean_std(&self.response_times);
        let (advance_mean, advance_std) = stats::mean_std(&self.gaze_advances);
        let (glance_mean, glance_std) = stats::mean_std(&self.glance_durations);
        let (pupil_mean, pupil_std) = stats::mean_std(&self.pupil_sizes);
        let calibrated: Vec<f64> = self
            .pupil_sizes
            .iter()
            .map(|size| size - self.calibration_size)
            .collect();

        let advance_bids = self
            .gaze_advance_bids
            .iter()
            .map(|bid| format!("{:.0}", bid.mean.round()))
            .collect::<Vec<_>>()
            .join(" ");

        [
            format!(
                "Hand/Gaze peaks: {}/{}",
                self.hand_peak_count, self.gaze_peak_count
            ),
            format!(
                "  match count = {} ({}%)",
                self.match_count,
                f1(self.match_percentage())
            ),
            format!("Correct responses = {}%", f1(self.correct_ratio * 100.0)),
            "Response delay".to_string(),
            format!("  mean = {} ms (SD = {} ms)", f0(response_mean), f1(response_std)),
            format!(
                "  median = {} ms ({}..{} ms)",
                f0(stats::median(&self.response_times)),
                f0(stats::quantile(&self.response_times, ql)),
                f0(stats::quantile(&self.response_times, qh))
            ),
            "Gaze advance".to_string(),
            format!("  mean = {} ms (SD = {} ms)", f0(advance_mean), f1(advance_std)),
            format!(
                "  median = {} ms ({}..{} ms)",
                f0(stats::median(&self.gaze_advances)),
                f0(stats::quantile(&self.gaze_advances, ql)),
                f0(stats::quantile(&self.gaze_advances, qh))
            ),
            format!("  bids = {advance_bids}"),
            "Glance duration".to_string(),
            format!("  mean = {} ms (SD = {} ms)", f0(glance_mean), f0(glance_std)),
            format!(
                "  median = {} ms ({}..{} ms)",
                f0(stats::median(&self.glance_durations)),
                f0(stats::quantile(&self.glance_durations, ql)),
                f0(stats::quantile(&self.glance_durations, qh))
            ),
            "Pupil size".to_string(),
            format!("  mean = {} (SD = {})", f2(pupil_mean), f2(pupil_std)),
            format!(
                "  median = {} ({}..{})",
                f2(stats::median(&self.pupil_sizes)),
                f2(stats::quantile(&self.pupil_sizes, ql)),
                f2(stats::quantile(&self.pupil_sizes, qh))
            ),
            format!("  calibrated mean = {}", f2(stats::mean(&calibrated))),
            format!("Gaze-lost events: {}", self.miss_count),
            format!(
                "  blinks: {} or {}",
                self.gap_blink_count, self.confidence_blink_count
            ),
            format!("  eyes closed or lost: {}", self.long_loss_count),
        ]
        .join("\n")
    }

    fn render_rows(&self, headers_only: bool) -> String {
        let ql = self.quantile_threshold;
        let qh = 1.0 - ql;
        let reliable = self.hand_peak_count >= MIN_PEAK_COUNT;

        let (response_mean, response_std) = stats::mean_std(&self.response_times);
        let (advance_mean, advance_std) = stats::mean_std(&self.gaze_advances);
        let (glance_mean, glance_std) = stats::mean_std(&self.glance_durations);
        let (pupil_mean, pupil_std) = stats::mean_std(&self.pupil_sizes);

        let mut rows: Vec<(String, String)> = Vec::new();

        rows.push((
            "Hand peaks".into(),
            masked(reliable, self.hand_peak_count.to_string()),
        ));
        rows.push((
            "Gaze peaks".into(),
            masked(
                self.gaze_peak_count >= MIN_PEAK_COUNT,
                self.gaze_peak_count.to_string(),
            ),
        ));
        rows.push((
            "Peak matches, %".into(),
            masked(reliable, f1(self.match_percentage())),
        ));
        push_bid_rows(&mut rows, "Peak matches", &self.match_bids, reliable);

        rows.push(("Response time, mean".into(), f1(response_mean)));
        rows.push(("Response time, SD".into(), f1(response_std)));
        rows.push((
            "Response time, median".into(),
            f1(stats::median(&self.response_times)),
        ));
        rows.push((
            format!("Response time, quantile {:.0}%", ql * 100.0),
            f1(stats::quantile(&self.response_times, ql)),
        ));
        rows.push((
            format!("Response time, quantile {:.0}%", qh * 100.0),
            f1(stats::quantile(&self.response_times, qh)),
        ));

        rows.push(("Gaze-hand advance, mean".into(), f1(advance_mean)));
        rows.push(("Gaze-hand advance, SD".into(), f1(advance_std)));
        rows.push((
            "Gaze-hand advance, median".into(),
            f1(stats::median(&self.gaze_advances)),
        ));
        rows.push((
            format!("Gaze-hand advance, quantile {:.0}%", ql * 100.0),
            f1(stats::quantile(&self.gaze_advances, ql)),
        ));
        rows.push((
            format!("Gaze-hand advance, quantile {:.0}%", qh * 100.0),
            f1(stats::quantile(&self.gaze_advances, qh)),
        ));
        push_bid_rows(
            &mut rows,
            "Gaze-hand advance",
            &self.gaze_advance_bids,
            true,
        );

        rows.push(("Glance duration, mean".into(), f1(glance_mean)));
        rows.push(("Glance duration, SD".into(), f1(glance_std)));
        rows.push((
            "Glance duration, median".into(),
            f1(stats::median(&self.glance_durations)),
        ));
        rows.push((
            format!("Glance duration, quantile {:.0}%", ql * 100.0),
            f1(stats::quantile(&self.glance_durations, ql)),
        ));
        rows.push((
            format!("Glance duration, quantile {:.0}%", qh * 100.0),
            f1(stats::quantile(&self.glance_durations, qh)),
        ));

        rows.push(("Pupil size, mean".into(), f2(pupil_mean)));
        rows.push(("Pupil size, SD".into(), f2(pupil_std)));
        rows.push((
            "Pupil size, median".into(),
            f2(stats::median(&self.pupil_sizes)),
        ));
        rows.push((
            format!("Pupil size, quantile {:.0}%", ql * 100.0),
            f2(stats::quantile(&self.pupil_sizes, ql)),
        ));
        rows.push((
            format!("Pupil size, quantile {:.0}%", qh * 100.0),
            f2(stats::quantile(&self.pupil_sizes, qh)),
        ));
        rows.push((
            "Calibrated pupil size, mean".into(),
            f2(pupil_mean - self.calibration_size),
        ));

        rows.push(("Eye losses".into(), self.miss_count.to_string()));
        rows.push(("Blinks".into(), self.gap_blink_count.to_string()));
        rows.push((
            "Blinks, confidence detector".into(),
            self.confidence_blink_count.to_string(),
        ));
        rows.push(("Long eye losses".into(), self.long_loss_count.to_string()));
        rows.push((
            "Correct responses, %".into(),
            f1(self.correct_ratio * 100.0),
        ));

        rows.into_iter()
            .map(|(header, value)| if headers_only { header } else { value })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn push_bid_rows(rows: &mut Vec<(String, String)>, label: &str, bids: &[Bid], reliable: bool) {
    for i in 0..BID_COUNT {
        let value = match (reliable, bids.get(i)) {
            (true, Some(bid)) => f1(bid.mean),
            _ => ".".to_string(),
        };
        rows.push((format!("{label}, bid {}", i + 1), value));
    }
}

fn masked(reliable: bool, value: String) -> String {
    if reliable { value } else { ".".to_string() }
}

fn f0(value: f64) -> String {
    if value.is_nan() {
        ".".to_string()
    } else {
        format!("{value:.0}")
    }
}

fn f1(value: f64) -> String {
    if value.is_nan() {
        ".".to_string()
    } else {
        format!("{value:.1}")
    }
}

fn f2(value: f64) -> String {
    if value.is_nan() {
        ".".to_string()
    } else {
        format!("{value:.2}")
    }
}
