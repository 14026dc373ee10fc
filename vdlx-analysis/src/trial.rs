use serde::{Deserialize, Serialize};

use vdlx_core::{Record, TaskEvent, TimestampSource};
use vdlx_detect::Peak;

/// One stimulus-response cycle, delimited by the task's trial markers and
/// optionally matched to a hand and a gaze peak inside its window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub hand_peak: Option<Peak>,
    pub gaze_peak: Option<Peak>,
    pub start_timestamp: i64,
    pub response_timestamp: i64,
    pub is_correct: bool,
}

impl Trial {
    pub fn has_hand_gaze_match(&self) -> bool {
        self.hand_peak.is_some() && self.gaze_peak.is_some()
    }

    /// How far the gaze peak leads the hand peak; negative values mean the
    /// glance came first. Zero when the trial is unmatched.
    pub fn gaze_hand_interval(&self) -> i64 {
        match (&self.gaze_peak, &self.hand_peak) {
            (Some(gaze), Some(hand)) => gaze.timestamp_start - hand.timestamp_start,
            _ => 0,
        }
    }
}

/// Walks the record stream once, closing a trial at every trial-end marker.
///
/// Each closed trial takes the first hand peak starting strictly inside its
/// window and the first gaze peak in the window that starts within
/// `max_hand_gaze_delay` of that hand peak. One trial is emitted per
/// trial-end marker whether or not anything matched; a trial that never saw
/// a start marker keeps `start_timestamp` 0.
pub fn match_trials(
    records: &[Record],
    hand_peaks: &[Peak],
    gaze_peaks: &[Peak],
    timestamps: TimestampSource,
    max_hand_gaze_delay: i64,
) -> Vec<Trial> {
    let mut trials = Vec::new();

    let mut start_timestamp = 0i64;
    let mut response_timestamp = 0i64;

    for record in records {
        let Some(event) = record.task_event else {
            continue;
        };
        let timestamp = timestamps.of(record);

        match event {
            TaskEvent::TrialStart { .. } => start_timestamp = timestamp,
            TaskEvent::TrialResponse { .. } => response_timestamp = timestamp,
            TaskEvent::TrialEnd { is_correct, .. } => {
                let end_timestamp = timestamp;
                let in_window = |peak: &Peak| {
                    peak.timestamp_start > start_timestamp && peak.timestamp_start < end_timestamp
                };

                let hand_peak = hand_peaks.iter().find(|p| in_window(p)).copied();
                let hand_start = hand_peak.map_or(0, |p| p.timestamp_start);
                let gaze_peak = gaze_peaks
                    .iter()
                    .find(|p| {
                        in_window(p)
                            && (p.timestamp_start - hand_start).abs() < max_hand_gaze_delay
                    })
                    .copied();

                trials.push(Trial {
                    hand_peak,
                    gaze_peak,
                    start_timestamp,
                    response_timestamp,
                    is_correct,
                });
            }
            TaskEvent::SessionStart | TaskEvent::SessionEnd => {}
        }
    }

    trials
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdlx_core::record::{Pupil, Rotation, Vec3};

    fn record(ts: i64, event: Option<TaskEvent>) -> Record {
        Record {
            timestamp_system: ts,
            timestamp_headset: ts,
            eye: Rotation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
            head: Rotation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
            left_pupil: Pupil {
                openness: 1.0,
                size: 3.0,
            },
            right_pupil: Pupil {
                openness: 1.0,
                size: 3.0,
            },
            hand_palm: Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            hand_thumb: Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            hand_index: Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            hand_middle: Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            task_event: event,
        }
    }

    fn peak(timestamp_start: i64) -> Peak {
        Peak {
            start_index: 0,
            timestamp_start,
            timestamp_end: timestamp_start + 100,
            amplitude: 1.0,
        }
    }

    fn task_records() -> Vec<Record> {
        vec![
            record(0, Some(TaskEvent::SessionStart)),
            record(100, Some(TaskEvent::TrialStart { id: 1 })),
            record(900, Some(TaskEvent::TrialResponse { id: 1 })),
            record(
                1000,
                Some(TaskEvent::TrialEnd {
                    id: 1,
                    is_correct: true,
                }),
            ),
            record(1100, Some(TaskEvent::TrialStart { id: 2 })),
            record(1900, Some(TaskEvent::TrialResponse { id: 2 })),
            record(
                2000,
                Some(TaskEvent::TrialEnd {
                    id: 2,
                    is_correct: false,
                }),
            ),
            record(2100, Some(TaskEvent::SessionEnd)),
        ]
    }

    #[test]
    fn one_trial_per_end_marker() {
        let trials = match_trials(&task_records(), &[], &[], TimestampSource::System, 1500);

        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].start_timestamp, 100);
        assert_eq!(trials[0].response_timestamp, 900);
        assert!(trials[0].is_correct);
        assert!(!trials[0].has_hand_gaze_match());
        assert_eq!(trials[0].gaze_hand_interval(), 0);
        assert_eq!(trials[1].start_timestamp, 1100);
        assert!(!trials[1].is_correct);
    }

    #[test]
    fn matches_peaks_inside_the_trial_window() {
        let hand_peaks = [peak(400), peak(1400)];
        let gaze_peaks = [peak(300), peak(1300)];

        let trials = match_trials(
            &task_records(),
            &hand_peaks,
            &gaze_peaks,
            TimestampSource::System,
            1500,
        );

        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].hand_peak, Some(hand_peaks[0]));
        assert_eq!(trials[0].gaze_peak, Some(gaze_peaks[0]));
        assert_eq!(trials[0].gaze_hand_interval(), -100);
        assert_eq!(trials[1].hand_peak, Some(hand_peaks[1]));
        assert_eq!(trials[1].gaze_peak, Some(gaze_peaks[1]));
    }

    #[test]
    fn gaze_match_respects_the_delay_tolerance() {
        // Gaze glance 600 ms before the reach: outside a 500 ms tolerance.
        let trials = match_trials(
            &task_records(),
            &[peak(900)],
            &[peak(300)],
            TimestampSource::System,
            500,
        );

        assert_eq!(trials[0].hand_peak, Some(peak(900)));
        assert_eq!(trials[0].gaze_peak, None);
        assert!(!trials[0].has_hand_gaze_match());
    }

    #[test]
    fn peak_outside_every_window_stays_unmatched() {
        // Starts exactly on the trial-end marker: not strictly inside.
        let trials = match_trials(
            &task_records(),
            &[peak(1000)],
            &[],
            TimestampSource::System,
            1500,
        );

        assert_eq!(trials[0].hand_peak, None);
        assert_eq!(trials[1].hand_peak, None);
    }

    #[test]
    fn trial_without_start_marker_gets_zero_start() {
        let records = vec![record(
            500,
            Some(TaskEvent::TrialEnd {
                id: 1,
                is_correct: true,
            }),
        )];

        let trials = match_trials(&records, &[peak(200)], &[], TimestampSource::System, 1500);

        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].start_timestamp, 0);
        // The window 0..500 still applies.
        assert_eq!(trials[0].hand_peak, Some(peak(200)));
    }
}
