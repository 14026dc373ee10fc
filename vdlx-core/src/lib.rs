pub mod record;
pub mod recording;
pub mod sample;
pub mod source;
pub mod stats;

pub use record::{Pupil, Record, Rotation, TaskEvent, Vec3};
pub use recording::{LoadError, PupilCalibration, Recording};
pub use sample::Sample;
pub use source::{
    GazeDataSource, HandDataSource, TimestampSource, TimestampedTaskEvent, gaze_samples,
    hand_samples, pupil_sizes, task_events,
};
