//! Time series of normalized short-circuit currents replayed by the MPPT test.

use std::{fs::File, io::Read, path::Path, time::Duration};

use serde::Deserialize;

use crate::BenchError;

/// A profile point: at `t` seconds the panel delivers `isc` times its short-circuit current.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProfilePoint {
    /// Elapsed time in seconds since the start of the replay.
    pub t: f64,
    /// Fraction of the short-circuit current.
    pub isc: f64,
}

impl ProfilePoint {
    /// Time of the point since the start of the replay.
    ///
    /// Fails if `t` is negative, not finite, or too large for a [`Duration`].
    pub fn elapsed(&self) -> Result<Duration, BenchError> {
        Duration::try_from_secs_f64(self.t)
            .map_err(|err| BenchError::Profile(format!("time {} s out of range: {err}", self.t)))
    }
}

/// An ordered, non-empty MPPT profile.
#[derive(Debug, Clone, PartialEq)]
pub struct MpptProfile {
    points: Vec<ProfilePoint>,
}

impl MpptProfile {
    /// Validate and wrap profile points.
    ///
    /// The profile must not be empty, times must be valid durations in seconds, and must not
    /// decrease from one point to the next.
    pub fn new(points: Vec<ProfilePoint>) -> Result<Self, BenchError> {
        if points.is_empty() {
            return Err(BenchError::Profile("profile has no points".to_string()));
        }
        if let Some((idx, p)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| p.elapsed().is_err() || !p.isc.is_finite())
        {
            return Err(BenchError::Profile(format!(
                "row {} has invalid values t={}, isc={}",
                idx + 1,
                p.t,
                p.isc
            )));
        }
        if let Some(idx) = points.windows(2).position(|w| w[1].t < w[0].t) {
            return Err(BenchError::Profile(format!(
                "time decreases at row {} ({} s after {} s)",
                idx + 2,
                points[idx + 1].t,
                points[idx].t
            )));
        }
        Ok(Self { points })
    }

    /// Read a profile from CSV data with a `t,isc` header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BenchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let points = rdr
            .deserialize()
            .collect::<Result<Vec<ProfilePoint>, csv::Error>>()?;
        Self::new(points)
    }

    /// Read a profile from a CSV file.
    pub fn from_path(path: &Path) -> Result<Self, BenchError> {
        Self::from_reader(File::open(path)?)
    }

    /// All points in replay order.
    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    /// The first point, where the replay starts.
    pub fn first(&self) -> ProfilePoint {
        self.points[0]
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`, an empty profile cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
