// THEORY:
// The `GazeSeries` is the shared substrate of the whole engine: one recording's
// samples in time order. It is built exactly once, from raw sensor tuples, and
// from then on it is moved by value from one detector to the next. Each pass
// takes ownership, mutates, and hands it back, so no two passes can ever observe
// a half-written labelling.
//
// Key architectural principles:
// 1.  **Validate at the door**: emptiness, time ordering, finiteness and status
//     codes are checked in `from_records`. Detectors can assume a clean series.
// 2.  **Fixed shape**: length and order never change after construction. There
//     is deliberately no API to insert, remove or reorder samples.
// 3.  **Narrow mutation**: the crate's detectors get `samples_mut`; callers
//     outside the crate get read-only views.

use crate::core_modules::sample::{GazeLabel, IntervalIndex, Millis, Sample, TrackingStatus};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// One raw observation as produced by an input adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGazeRecord {
    pub time: Millis,
    pub x: f64,
    pub y: f64,
    /// Sensor status code: 0 invalid, 1 adjusting, 2 valid.
    pub status: i64,
}

impl RawGazeRecord {
    pub fn new(time: Millis, x: f64, y: f64, status: i64) -> Self {
        Self { time, x, y, status }
    }
}

/// An owned, validated, time-ordered gaze recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSeries {
    /// Recording identifier, e.g. `P1_T2` for participant 1, trial 2.
    name: String,
    samples: Vec<Sample>,
}

impl GazeSeries {
    /// Builds a series from raw records, failing fast on malformed input.
    pub fn from_records(
        name: impl Into<String>,
        records: &[RawGazeRecord],
    ) -> Result<Self, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptySeries);
        }

        let mut samples = Vec::with_capacity(records.len());
        let mut previous_time: Option<Millis> = None;

        for (index, record) in records.iter().enumerate() {
            for (field, value) in [("time", record.time), ("x", record.x), ("y", record.y)] {
                if !value.is_finite() {
                    return Err(ValidationError::NonFiniteValue { index, field });
                }
            }

            if let Some(previous) = previous_time {
                if record.time < previous {
                    return Err(ValidationError::NonMonotonicTime {
                        index,
                        previous,
                        current: record.time,
                    });
                }
            }
            previous_time = Some(record.time);

            let status = TrackingStatus::from_code(record.status).ok_or(
                ValidationError::UnknownStatus {
                    index,
                    code: record.status,
                },
            )?;
            samples.push(Sample::new(record.time, record.x, record.y, status));
        }

        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn labels(&self) -> Vec<GazeLabel> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Time between the first and last sample.
    pub fn duration(&self) -> Millis {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Mean spacing between consecutive samples, if the series spans any time.
    pub fn mean_sample_interval(&self) -> Option<Millis> {
        if self.samples.len() < 2 {
            return None;
        }
        let mean = self.duration() / (self.samples.len() - 1) as f64;
        (mean > 0.0).then_some(mean)
    }

    /// Number of samples carrying each label.
    pub fn label_counts(&self) -> HashMap<GazeLabel, usize> {
        let mut counts = HashMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label).or_insert(0) += 1;
        }
        counts
    }

    /// Index ranges of every intersaccadic interval, in index order.
    ///
    /// Samples of one interval are contiguous after saccade detection, so each
    /// index maps to exactly one range.
    pub fn intersaccadic_intervals(&self) -> Vec<(IntervalIndex, Range<usize>)> {
        contiguous_index_runs(&self.samples, |s| s.intersaccadic_interval_index)
    }

    /// Index ranges of every committed saccade, in index order.
    pub fn saccade_intervals(&self) -> Vec<(IntervalIndex, Range<usize>)> {
        contiguous_index_runs(&self.samples, |s| s.saccade_interval_index)
    }
}

fn contiguous_index_runs(
    samples: &[Sample],
    index_of: impl Fn(&Sample) -> IntervalIndex,
) -> Vec<(IntervalIndex, Range<usize>)> {
    let mut runs: Vec<(IntervalIndex, Range<usize>)> = Vec::new();

    for (position, sample) in samples.iter().enumerate() {
        let index = index_of(sample);
        if index < 0 {
            continue;
        }
        match runs.last_mut() {
            Some((current, range)) if *current == index && range.end == position => {
                range.end = position + 1;
            }
            _ => runs.push((index, position..position + 1)),
        }
    }

    runs
}
