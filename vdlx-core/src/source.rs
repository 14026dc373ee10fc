use serde::{Deserialize, Serialize};

use crate::record::{Record, TaskEvent};
use crate::sample::Sample;

/// Which clock the analysis reads timestamps from. Both clocks are rebased
/// to zero at the first record, but they drift independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampSource {
    System,
    Headset,
}

/// Hand landmark projected into the scalar hand series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandDataSource {
    IndexFinger,
    MiddleFinger,
}

/// Gaze rotation axis projected into the scalar gaze series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GazeDataSource {
    YawRotation,
    PitchRotation,
}

impl TimestampSource {
    pub fn of(self, record: &Record) -> i64 {
        match self {
            TimestampSource::System => record.timestamp_system,
            TimestampSource::Headset => record.timestamp_headset,
        }
    }
}

impl HandDataSource {
    pub fn of(self, record: &Record) -> f64 {
        match self {
            HandDataSource::IndexFinger => record.hand_index.y,
            HandDataSource::MiddleFinger => record.hand_middle.y,
        }
    }
}

impl GazeDataSource {
    pub fn of(self, record: &Record) -> f64 {
        match self {
            GazeDataSource::YawRotation => record.eye.yaw,
            GazeDataSource::PitchRotation => record.eye.pitch,
        }
    }
}

/// A task marker paired with the timestamp of the record that carried it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestampedTaskEvent {
    pub timestamp: i64,
    pub event: TaskEvent,
}

/// Projects records into the vertical hand-landmark series.
pub fn hand_samples(
    records: &[Record],
    hand: HandDataSource,
    timestamps: TimestampSource,
) -> Vec<Sample> {
    records
        .iter()
        .map(|record| Sample::new(timestamps.of(record), hand.of(record)))
        .collect()
}

/// Projects records into the gaze-rotation series.
pub fn gaze_samples(
    records: &[Record],
    gaze: GazeDataSource,
    timestamps: TimestampSource,
) -> Vec<Sample> {
    records
        .iter()
        .map(|record| Sample::new(timestamps.of(record), gaze.of(record)))
        .collect()
}

/// Mean pupil sizes within the task session, restricted to records where
/// both eyes are at least 0.6 open so half-closed lids do not bias the mean.
pub fn pupil_sizes(records: &[Record]) -> Vec<f64> {
    records
        .iter()
        .skip_while(|r| !matches!(r.task_event, Some(TaskEvent::SessionStart)))
        .take_while(|r| !matches!(r.task_event, Some(TaskEvent::SessionEnd)))
        .filter(|r| r.left_pupil.openness > 0.6 && r.right_pupil.openness > 0.6)
        .map(|r| r.pupil_size())
        .collect()
}

/// All task markers in record order, stamped with the selected clock.
pub fn task_events(records: &[Record], timestamps: TimestampSource) -> Vec<TimestampedTaskEvent> {
    records
        .iter()
        .filter_map(|record| {
            record.task_event.map(|event| TimestampedTaskEvent {
                timestamp: timestamps.of(record),
                event,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Pupil, Rotation, Vec3};

    fn record(ts: i64, event: Option<TaskEvent>, openness: f64, size: f64) -> Record {
        Record {
            timestamp_system: ts,
            timestamp_headset: ts + 5,
            eye: Rotation {
                pitch: 1.0,
                yaw: 2.0,
                roll: 0.0,
            },
            head: Rotation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
            left_pupil: Pupil { openness, size },
            right_pupil: Pupil { openness, size },
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
                y: 3.0,
                z: 0.0,
            },
            hand_middle: Vec3 {
                x: 0.0,
                y: 4.0,
                z: 0.0,
            },
            task_event: event,
        }
    }

    #[test]
    fn projects_series_by_source() {
        let records = vec![record(0, None, 1.0, 2.0), record(10, None, 1.0, 2.0)];

        let hand = hand_samples(&records, HandDataSource::IndexFinger, TimestampSource::System);
        assert_eq!(hand, vec![Sample::new(0, 3.0), Sample::new(10, 3.0)]);

        let hand = hand_samples(
            &records,
            HandDataSource::MiddleFinger,
            TimestampSource::Headset,
        );
        assert_eq!(hand, vec![Sample::new(5, 4.0), Sample::new(15, 4.0)]);

        let gaze = gaze_samples(&records, GazeDataSource::YawRotation, TimestampSource::System);
        assert_eq!(gaze[0].value, 2.0);
        let gaze = gaze_samples(
            &records,
            GazeDataSource::PitchRotation,
            TimestampSource::System,
        );
        assert_eq!(gaze[0].value, 1.0);
    }

    #[test]
    fn pupil_sizes_cover_the_session_only() {
        let records = vec![
            record(0, None, 1.0, 9.0),
            record(10, Some(TaskEvent::SessionStart), 1.0, 2.0),
            record(20, None, 0.5, 7.0), // eyes half-closed, skipped
            record(30, None, 1.0, 4.0),
            record(40, Some(TaskEvent::SessionEnd), 1.0, 8.0),
            record(50, None, 1.0, 9.0),
        ];

        assert_eq!(pupil_sizes(&records), vec![2.0, 4.0]);
    }

    #[test]
    fn task_events_keep_record_order() {
        let records = vec![
            record(0, Some(TaskEvent::SessionStart), 1.0, 2.0),
            record(10, None, 1.0, 2.0),
            record(20, Some(TaskEvent::TrialStart { id: 1 }), 1.0, 2.0),
        ];

        let events = task_events(&records, TimestampSource::System);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, 0);
        assert_eq!(events[1].event, TaskEvent::TrialStart { id: 1 });
    }
}
