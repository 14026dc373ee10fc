use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::record::Record;
use crate::stats;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} contains no usable records", path.display())]
    Empty { path: PathBuf },
}

/// One loaded experiment recording, with both clocks rebased so the first
/// record is at time zero.
#[derive(Debug, Clone)]
pub struct Recording {
    pub participant: String,
    pub session: String,
    pub records: Vec<Record>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Recording, LoadError> {
        info!("loading {}", path.display());

        let records = read_records(path)?;
        if records.is_empty() {
            return Err(LoadError::Empty { path: path.into() });
        }

        info!("record count: {}", records.len());

        Ok(Recording {
            participant: participant_from_path(path),
            session: session_from_path(path),
            records,
        })
    }

    /// Wraps an already-materialized record array, e.g. for synthetic data.
    pub fn from_records(records: Vec<Record>) -> Recording {
        Recording {
            participant: String::new(),
            session: String::new(),
            records,
        }
    }
}

/// Baseline pupil size taken from a dedicated calibration recording.
#[derive(Debug, Clone, Copy)]
pub struct PupilCalibration {
    pub size: f64,
}

impl PupilCalibration {
    /// The first records cover the tracker settling in, so roughly the
    /// first second is skipped; the rest is filtered to wide-open eyes.
    pub fn load(path: &Path) -> Result<PupilCalibration, LoadError> {
        info!("loading calibration {}", path.display());

        let sizes: Vec<f64> = read_records(path)?
            .iter()
            .skip(100)
            .filter(|r| r.left_pupil.openness > 0.7 && r.right_pupil.openness > 0.7)
            .map(|r| r.pupil_size())
            .collect();

        if sizes.is_empty() {
            return Err(LoadError::Empty { path: path.into() });
        }

        Ok(PupilCalibration {
            size: stats::mean(&sizes),
        })
    }
}

fn read_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.into(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let reader = BufReader::new(file);

    let mut origin: Option<(i64, i64)> = None;
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(io_error)?;
        let Some(record) = Record::parse(&line) else {
            continue;
        };

        let (system, headset) =
            *origin.get_or_insert((record.timestamp_system, record.timestamp_headset));
        records.push(Record {
            timestamp_system: record.timestamp_system - system,
            timestamp_headset: record.timestamp_headset - headset,
            ..record
        });
    }

    Ok(records)
}

// The log folder layout is <participant>/<task>/<session file>, so the
// participant is the third path component from the end.
fn participant_from_path(path: &Path) -> String {
    let components: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if components.len() >= 3 {
        components[components.len() - 3].clone()
    } else {
        String::new()
    }
}

// Session files are named <kind>-<date>-<time>.<ext>.
fn session_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.split_once('-') {
        Some((_, session)) => session.to_string(),
        None => stem,
    }
}
