use serde::{Deserialize, Serialize};
use tracing::debug;

/// Euler rotation in degrees, as logged by the headset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pupil {
    pub openness: f64,
    pub size: f64,
}

/// Task markers embedded in the record stream by the experiment runner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TaskEvent {
    SessionStart,
    TrialStart { id: u32 },
    TrialResponse { id: u32 },
    TrialEnd { id: u32, is_correct: bool },
    SessionEnd,
}

/// One line of a recording: both clocks, gaze and head rotation, both
/// pupils, four hand landmarks and an optional task marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp_system: i64,
    pub timestamp_headset: i64,
    pub eye: Rotation,
    pub head: Rotation,
    pub left_pupil: Pupil,
    pub right_pupil: Pupil,
    pub hand_palm: Vec3,
    pub hand_thumb: Vec3,
    pub hand_index: Vec3,
    pub hand_middle: Vec3,
    pub task_event: Option<TaskEvent>,
}

/// Tab-separated fields per record line. Lines with any other shape are
/// headers or truncated writes and are skipped.
const FIELD_COUNT: usize = 23;

impl Record {
    /// Mean openness across both eyes.
    pub fn pupil_openness(&self) -> f64 {
        (self.left_pupil.openness + self.right_pupil.openness) / 2.0
    }

    /// Mean pupil size across both eyes.
    pub fn pupil_size(&self) -> f64 {
        (self.left_pupil.size + self.right_pupil.size) / 2.0
    }

    /// Parses one tab-separated log line into a record.
    ///
    /// System timestamps are logged in 100 ns ticks and headset timestamps
    /// in ns; both are converted to milliseconds here. Returns `None` for
    /// lines that are not valid data records.
    pub fn parse(line: &str) -> Option<Record> {
        if line.is_empty() {
            return None;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != FIELD_COUNT {
            return None;
        }

        let record = Self::parse_fields(&fields);
        if record.is_none() {
            debug!("cannot parse the record: {line}");
        }

        record
    }

    fn parse_fields(p: &[&str]) -> Option<Record> {
        let num = |s: &str| s.trim().parse::<f64>().ok();

        Some(Record {
            timestamp_system: p[0].trim().parse::<i64>().ok()? / 10_000,
            timestamp_headset: p[1].trim().parse::<i64>().ok()? / 1_000_000,
            eye: Rotation {
                pitch: num(p[3])?,
                yaw: num(p[2])?,
                roll: 0.0,
            },
            head: Rotation {
                pitch: num(p[5])?,
                yaw: num(p[4])?,
                roll: 0.0,
            },
            left_pupil: Pupil {
                openness: num(p[6])?,
                size: num(p[7])?,
            },
            right_pupil: Pupil {
                openness: num(p[8])?,
                size: num(p[9])?,
            },
            hand_palm: Vec3 {
                x: num(p[10])?,
                y: num(p[11])?,
                z: num(p[12])?,
            },
            hand_thumb: Vec3 {
                x: num(p[13])?,
                y: num(p[14])?,
                z: num(p[15])?,
            },
            hand_index: Vec3 {
                x: num(p[16])?,
                y: num(p[17])?,
                z: num(p[18])?,
            },
            hand_middle: Vec3 {
                x: num(p[19])?,
                y: num(p[20])?,
                z: num(p[21])?,
            },
            task_event: parse_task_event(p[22].trim())?,
        })
    }
}

// Outer None = unknown tag, record is rejected; inner None = no marker.
fn parse_task_event(tag: &str) -> Option<Option<TaskEvent>> {
    if tag.is_empty() {
        return Some(None);
    }

    let parts: Vec<&str> = tag.split(' ').collect();
    let event = match parts.as_slice() {
        ["STR"] => TaskEvent::SessionStart,
        ["SET", id] => TaskEvent::TrialStart {
            id: id.parse().ok()?,
        },
        ["ACT", id] => TaskEvent::TrialResponse {
            id: id.parse().ok()?,
        },
        ["RES", id, is_correct] => TaskEvent::TrialEnd {
            id: id.parse().ok()?,
            is_correct: parse_bool(is_correct)?,
        },
        ["FIN"] => TaskEvent::SessionEnd,
        _ => return None,
    };

    Some(Some(event))
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
