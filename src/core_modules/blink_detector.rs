// THEORY:
// The `BlinkDetector` is the second pass. It is a purely temporal analysis: a
// blink shows up as a run of samples the tracker flagged as invalid, and a real
// blink is almost always accompanied by a saccade (the lid drags the eye). So a
// run is confirmed only when it is long enough and a saccade from the first pass
// lies close to it in time.
//
// Key architectural principles:
// 1.  **Runs, not samples**: decisions are made per maximal invalid run and
//     applied to the run as a whole.
// 2.  **Authoritative**: a confirmed run overwrites whatever the saccade pass
//     wrote, including glitch noise. Unconfirmed runs become NOISE.
// 3.  **Valid samples are never touched.**

use crate::core_modules::gaze_series::GazeSeries;
use crate::core_modules::sample::{GazeLabel, Millis, Sample};
use crate::error::{ValidationError, ensure_non_negative, ensure_positive};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Shortest invalid run accepted as a blink, in ms.
    pub min_duration: Millis,
    /// Largest time distance between the run and a saccade sample, in ms.
    pub max_distance_to_saccade: Millis,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            min_duration: 10.0,
            max_distance_to_saccade: 20.0,
        }
    }
}

impl BlinkConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("blink.min_duration", self.min_duration)?;
        ensure_non_negative(
            "blink.max_distance_to_saccade",
            self.max_distance_to_saccade,
        )
    }
}

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    config: BlinkConfig,
}

impl BlinkDetector {
    pub fn new(config: BlinkConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    pub fn detect(&self, mut series: GazeSeries) -> GazeSeries {
        let samples = series.samples_mut();
        let runs = invalid_runs(samples);
        let mut blinks = 0usize;

        for run in &runs {
            let duration = run_duration(samples, run);
            let confirmed =
                duration >= self.config.min_duration && self.saccade_nearby(samples, run);

            let label = if confirmed {
                blinks += 1;
                GazeLabel::Blink
            } else {
                GazeLabel::Noise
            };
            debug!(start = run.start, end = run.end, duration, %label, "invalid run classified");

            for sample in &mut samples[run.clone()] {
                sample.label = label;
            }
        }

        info!(
            recording = series.name(),
            invalid_runs = runs.len(),
            blinks,
            "blink detection complete"
        );
        series
    }

    /// True when a saccade sample lies inside the run or within
    /// `max_distance_to_saccade` of either end.
    fn saccade_nearby(&self, samples: &[Sample], run: &Range<usize>) -> bool {
        let is_saccade = |s: &Sample| s.label == GazeLabel::Saccade;
        let limit = self.config.max_distance_to_saccade;
        let first_time = samples[run.start].time;
        let last_time = samples[run.end - 1].time;

        samples[run.clone()].iter().any(is_saccade)
            || samples[..run.start]
                .iter()
                .rev()
                .take_while(|s| first_time - s.time <= limit)
                .any(is_saccade)
            || samples[run.end..]
                .iter()
                .take_while(|s| s.time - last_time <= limit)
                .any(is_saccade)
    }
}

/// Maximal runs of invalid-status samples, as index ranges.
fn invalid_runs(samples: &[Sample]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        if !sample.status.is_invalid() {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.end == i => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

/// Time from the run's first sample to the first valid sample after it, or to
/// the run's own last sample when the recording ends inside the run.
fn run_duration(samples: &[Sample], run: &Range<usize>) -> Millis {
    let start = samples[run.start].time;
    match samples.get(run.end) {
        Some(next) => next.time - start,
        None => samples[run.end - 1].time - start,
    }
}
