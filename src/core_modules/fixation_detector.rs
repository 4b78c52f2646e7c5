// THEORY:
// The `FixationDetector` is the third pass. Where the saccade pass reasons about
// the whole recording, this pass works locally: between two saccades the eye is
// either holding still (fixation), tracking something (pursuit) or producing
// noise, and only the first of those is decided here.
//
// Algorithm steps, per intersaccadic interval:
// 1.  **Gate**: intervals shorter than `intersaccadic_interval_min_duration` are
//     too brief to hold a fixation and are left alone.
// 2.  **Runs**: the interval is split into maximal runs of still-UNKNOWN
//     samples. Blinks and noise inside an interval break it into pieces.
// 3.  **Smoothing**: each run's coordinates are copied and smoothed with a
//     centered moving average. The series itself keeps the raw positions.
// 4.  **Prefilter**: a run spanning at least one window whose whole spread is
//     already below the spread threshold is a fixation candidate in full. Runs
//     shorter than one window are never candidates.
// 5.  **Sliding window**: otherwise a `window_width` ms window slides over the
//     run and every window whose statistic (speed or spread) is under threshold
//     marks its samples as candidates.
// 6.  **Commit**: contiguous candidates lasting at least `min_duration` become
//     FIXATION.

use crate::core_modules::gaze_series::GazeSeries;
use crate::core_modules::kinematics::{angular_distance, clamped_elapsed, speed};
use crate::core_modules::sample::{Degrees, DegreesPerSecond, GazeLabel, Millis, Sample};
use crate::core_modules::utils::moving_average::centered_moving_average;
use crate::error::{ValidationError, ensure_non_negative, ensure_positive};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Statistic compared against the threshold for each sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixationCriterion {
    /// Endpoint displacement over the window duration, deg/s.
    #[default]
    Speed,
    /// Sum of the x and y ranges inside the window, deg.
    Spread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixationConfig {
    /// Sliding window length in ms.
    pub window_width: Millis,
    pub criterion: FixationCriterion,
    /// Used with `FixationCriterion::Speed`, deg/s.
    pub speed_threshold: DegreesPerSecond,
    /// Used with `FixationCriterion::Spread` and by the prefilter, deg.
    pub spread_threshold: Degrees,
    /// Shortest accepted fixation in ms.
    pub min_duration: Millis,
    /// Moving-average width in samples. Must be odd.
    pub normalization_window_samples: usize,
    /// Intervals shorter than this (ms) are not searched.
    pub intersaccadic_interval_min_duration: Millis,
}

impl Default for FixationConfig {
    fn default() -> Self {
        Self {
            window_width: 100.0,
            criterion: FixationCriterion::Speed,
            speed_threshold: 2.0,
            spread_threshold: std::f64::consts::SQRT_2,
            min_duration: 50.0,
            normalization_window_samples: 5,
            intersaccadic_interval_min_duration: 75.0,
        }
    }
}

impl FixationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("fixation.window_width", self.window_width)?;
        ensure_positive("fixation.speed_threshold", self.speed_threshold)?;
        ensure_positive("fixation.spread_threshold", self.spread_threshold)?;
        ensure_positive("fixation.min_duration", self.min_duration)?;
        ensure_non_negative(
            "fixation.intersaccadic_interval_min_duration",
            self.intersaccadic_interval_min_duration,
        )?;
        if self.normalization_window_samples % 2 == 0 {
            return Err(ValidationError::parameter(
                "fixation.normalization_window_samples",
                format!("must be odd, got {}", self.normalization_window_samples),
            ));
        }
        Ok(())
    }

    fn threshold(&self) -> f64 {
        match self.criterion {
            FixationCriterion::Speed => self.speed_threshold,
            FixationCriterion::Spread => self.spread_threshold,
        }
    }
}

/// Smoothed copy of one run of samples.
struct Trace {
    times: Vec<Millis>,
    xs: Vec<Degrees>,
    ys: Vec<Degrees>,
}

impl Trace {
    fn smoothed(samples: &[Sample], window: usize) -> Self {
        let xs: Vec<Degrees> = samples.iter().map(|s| s.x).collect();
        let ys: Vec<Degrees> = samples.iter().map(|s| s.y).collect();
        Self {
            times: samples.iter().map(|s| s.time).collect(),
            xs: centered_moving_average(&xs, window),
            ys: centered_moving_average(&ys, window),
        }
    }

    fn len(&self) -> usize {
        self.times.len()
    }

    fn spread(&self, range: Range<usize>) -> Degrees {
        axis_range(&self.xs[range.clone()]) + axis_range(&self.ys[range])
    }

    fn speed(&self, from: usize, to: usize) -> DegreesPerSecond {
        let displacement = angular_distance(self.xs[from], self.ys[from], self.xs[to], self.ys[to]);
        speed(displacement, clamped_elapsed(self.times[from], self.times[to]))
    }
}

fn axis_range(values: &[f64]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() { 0.0 } else { max - min }
}

#[derive(Debug, Clone)]
pub struct FixationDetector {
    config: FixationConfig,
}

impl FixationDetector {
    pub fn new(config: FixationConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FixationConfig {
        &self.config
    }

    pub fn detect(&self, mut series: GazeSeries) -> GazeSeries {
        if let Some(interval) = series.mean_sample_interval() {
            if interval > self.config.window_width {
                warn!(
                    recording = series.name(),
                    sample_interval = interval,
                    window_width = self.config.window_width,
                    "sliding window is shorter than the sampling interval"
                );
            }
        }

        let intervals = series.intersaccadic_intervals();
        let samples = series.samples_mut();
        let mut skipped_intervals = 0usize;
        let mut fixations = 0usize;

        for (index, interval) in intervals {
            let duration = samples[interval.end - 1].time - samples[interval.start].time;
            if duration < self.config.intersaccadic_interval_min_duration {
                debug!(index, duration, "intersaccadic interval too short, skipped");
                skipped_intervals += 1;
                continue;
            }

            for run in unknown_runs(samples, interval) {
                let candidates = self.candidates(&samples[run.clone()]);
                for local in true_runs(&candidates) {
                    let fixation = (run.start + local.start)..(run.start + local.end);
                    let span = samples[fixation.end - 1].time - samples[fixation.start].time;
                    if span < self.config.min_duration {
                        continue;
                    }
                    debug!(index, start = fixation.start, end = fixation.end, span, "fixation");
                    for sample in &mut samples[fixation] {
                        sample.label = GazeLabel::Fixation;
                    }
                    fixations += 1;
                }
            }
        }

        info!(
            recording = series.name(),
            fixations,
            skipped_intervals,
            "fixation detection complete"
        );
        series
    }

    /// Marks the samples of one UNKNOWN run that fall in a low-motion window.
    fn candidates(&self, run: &[Sample]) -> Vec<bool> {
        let trace = Trace::smoothed(run, self.config.normalization_window_samples);
        let n = trace.len();

        let last_time = trace.times[n - 1];
        if last_time - trace.times[0] < self.config.window_width {
            return vec![false; n];
        }

        // --- 1. Prefilter ---
        if trace.spread(0..n) < self.config.spread_threshold {
            return vec![true; n];
        }

        // --- 2. Sliding window ---
        let mut marked = vec![false; n];
        let threshold = self.config.threshold();

        for start in 0..n {
            let window_end_time = trace.times[start] + self.config.window_width;
            if last_time < window_end_time {
                break;
            }
            let end = trace.times.partition_point(|&t| t <= window_end_time) - 1;
            if end <= start {
                continue;
            }

            let statistic = match self.config.criterion {
                FixationCriterion::Speed => trace.speed(start, end),
                FixationCriterion::Spread => trace.spread(start..end + 1),
            };
            if statistic < threshold {
                marked[start..=end].fill(true);
            }
        }
        marked
    }
}

/// Maximal runs of UNKNOWN samples inside `interval`.
fn unknown_runs(samples: &[Sample], interval: Range<usize>) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for i in interval {
        if !samples[i].is_unknown() {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.end == i => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

fn true_runs(flags: &[bool]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for (i, _) in flags.iter().enumerate().filter(|(_, f)| **f) {
        match runs.last_mut() {
            Some(run) if run.end == i => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}
