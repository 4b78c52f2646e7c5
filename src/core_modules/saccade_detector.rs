// THEORY:
// The `SaccadeDetector` is the first and most important pass of the engine. It
// turns raw positions into angular speed and then runs a velocity-threshold
// state machine over the whole recording to find saccades: short, ballistic
// jumps of gaze.
//
// Algorithm steps:
// 1.  **Velocity**: each sample's speed is measured against the latest earlier
//     sample at least `velocity_window` ms away. Sampling may be irregular, so
//     the look-back is found by time, not by a fixed sample offset.
// 2.  **Glitch map**: speeds above `max_speed` are physically impossible for an
//     eye and are labelled NOISE straight away. The samples bordering a glitch
//     run are "glitch-adjacent"; the first one after the run gets its speed
//     re-measured against the last clean sample before the run.
// 3.  **Seed, onset, offset**: a fast sample seeds a candidate. The onset is
//     found by walking backwards while the eye is still moving faster than
//     `onset_slow`; the offset by walking forwards until it drops below
//     `offset`. Both walks are bounded by ten times the longest plausible
//     saccade, measured in samples.
// 4.  **Validation**: candidates that are too short become NOISE; candidates
//     whose net displacement is too slow are dropped silently.
// 5.  **Interval bookkeeping**: every committed saccade gets the next saccade
//     index, and the stretch since the previous saccade gets the next
//     intersaccadic index, so that the two kinds of interval tile the series.

use crate::core_modules::gaze_series::GazeSeries;
use crate::core_modules::kinematics::{angular_speed, clamped_elapsed, sample_distance, speed};
use crate::core_modules::sample::{
    DegreesPerSecond, GazeLabel, IntervalIndex, Millis, Sample,
};
use crate::error::{ValidationError, ensure_non_negative, ensure_positive};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Look-back/look-ahead margin, in multiples of the longest plausible saccade.
const SCAN_LIMIT_DURATION_FACTOR: f64 = 10.0;

/// Tunable thresholds for saccade detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaccadeConfig {
    /// Seed threshold in deg/s. A sample must be faster than this to start a candidate.
    pub onset_fast: DegreesPerSecond,
    /// Onset threshold in deg/s, also the minimum mean speed of an accepted saccade.
    pub onset_slow: DegreesPerSecond,
    /// Offset threshold in deg/s.
    pub offset: DegreesPerSecond,
    /// Speeds above this are glitches, in deg/s.
    pub max_speed: DegreesPerSecond,
    /// Shortest accepted saccade in ms.
    pub min_duration: Millis,
    /// Longest plausible saccade in ms.
    pub max_duration: Millis,
    /// Minimum look-back span for velocity estimation in ms.
    pub velocity_window: Millis,
}

impl Default for SaccadeConfig {
    fn default() -> Self {
        Self {
            onset_fast: 137.5,
            onset_slow: 17.1875,
            offset: 17.1875,
            max_speed: 1031.25,
            min_duration: 15.0,
            max_duration: 160.0,
            velocity_window: 4.0,
        }
    }
}

impl SaccadeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("saccade.onset_fast", self.onset_fast)?;
        ensure_positive("saccade.onset_slow", self.onset_slow)?;
        ensure_positive("saccade.offset", self.offset)?;
        ensure_positive("saccade.max_speed", self.max_speed)?;
        ensure_positive("saccade.min_duration", self.min_duration)?;
        ensure_positive("saccade.max_duration", self.max_duration)?;
        ensure_non_negative("saccade.velocity_window", self.velocity_window)?;

        if self.onset_slow > self.onset_fast {
            return Err(ValidationError::parameter(
                "saccade.onset_slow",
                "must not exceed onset_fast",
            ));
        }
        if self.onset_fast >= self.max_speed {
            return Err(ValidationError::parameter(
                "saccade.onset_fast",
                "must be below max_speed",
            ));
        }
        if self.min_duration > self.max_duration {
            return Err(ValidationError::parameter(
                "saccade.min_duration",
                "must not exceed max_duration",
            ));
        }
        Ok(())
    }
}

/// Which samples are glitches and which border a glitch run.
#[derive(Debug, Clone)]
struct GlitchMap {
    glitch: Vec<bool>,
    /// Last clean sample before a glitch run.
    pre: Vec<bool>,
    /// First clean sample after a glitch run.
    post: Vec<bool>,
}

impl GlitchMap {
    fn new(velocities: &[DegreesPerSecond], max_speed: DegreesPerSecond) -> Self {
        let glitch: Vec<bool> = velocities.iter().map(|&v| v > max_speed).collect();
        let n = glitch.len();
        let mut pre = vec![false; n];
        let mut post = vec![false; n];
        for i in 0..n {
            if glitch[i] {
                continue;
            }
            pre[i] = i + 1 < n && glitch[i + 1];
            post[i] = i > 0 && glitch[i - 1];
        }
        Self { glitch, pre, post }
    }

    fn is_glitch(&self, i: usize) -> bool {
        self.glitch[i]
    }

    fn is_adjacent(&self, i: usize) -> bool {
        self.pre[i] || self.post[i]
    }

    /// Glitch or glitch-adjacent.
    fn touches(&self, i: usize) -> bool {
        self.glitch[i] || self.pre[i] || self.post[i]
    }

    fn count(&self) -> usize {
        self.glitch.iter().filter(|&&g| g).count()
    }
}

/// Outcome of the forward walk from a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffsetSearch {
    Found(usize),
    /// The walk ran into a glitch: the movement is not biologically plausible.
    EndsInGlitch,
    NotFound,
}

/// Running counters for saccade and intersaccadic interval indices.
#[derive(Debug, Default)]
struct IntervalBook {
    saccades: IntervalIndex,
    intersaccadic: IntervalIndex,
    /// First sample not yet covered by any interval.
    next_free: usize,
}

impl IntervalBook {
    fn commit_saccade(&mut self, samples: &mut [Sample], onset: usize, offset: usize) {
        self.close_gap(samples, onset);
        for sample in &mut samples[onset..=offset] {
            sample.label = GazeLabel::Saccade;
            sample.saccade_interval_index = self.saccades;
        }
        self.saccades += 1;
        self.next_free = offset + 1;
    }

    /// Assigns the next intersaccadic index to `next_free..end`, if non-empty.
    fn close_gap(&mut self, samples: &mut [Sample], end: usize) {
        if self.next_free >= end {
            return;
        }
        for sample in &mut samples[self.next_free..end] {
            sample.intersaccadic_interval_index = self.intersaccadic;
        }
        self.intersaccadic += 1;
    }
}

/// Labels saccades and noise, and stamps interval indices.
#[derive(Debug, Clone)]
pub struct SaccadeDetector {
    config: SaccadeConfig,
}

impl SaccadeDetector {
    pub fn new(config: SaccadeConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SaccadeConfig {
        &self.config
    }

    pub fn detect(&self, mut series: GazeSeries) -> GazeSeries {
        let scan_limit = self.scan_limit(&series);
        let samples = series.samples_mut();
        let n = samples.len();

        // --- 1. Velocity ---
        let mut velocities = self.estimate_velocities(samples);

        // --- 2. Glitch map ---
        let glitches = GlitchMap::new(&velocities, self.config.max_speed);
        for (sample, &is_glitch) in samples.iter_mut().zip(&glitches.glitch) {
            if is_glitch {
                sample.label = GazeLabel::Noise;
            }
        }
        Self::remeasure_after_glitches(samples, &glitches, &mut velocities);
        for (sample, &velocity) in samples.iter_mut().zip(&velocities) {
            sample.velocity = velocity;
        }

        // --- 3. Seeds, onsets, offsets ---
        let mut book = IntervalBook::default();
        let mut rejected_short = 0usize;
        let mut rejected_slow = 0usize;

        for seed in 0..n {
            if !self.is_seed(samples, &velocities, &glitches, seed) {
                continue;
            }

            let Some(onset) = self.find_onset(samples, &velocities, &glitches, seed, scan_limit)
            else {
                debug!(seed, "no onset within scan limit");
                continue;
            };

            let offset =
                match self.find_offset(samples, &velocities, &glitches, seed, onset, scan_limit) {
                    OffsetSearch::Found(offset) => offset,
                    OffsetSearch::EndsInGlitch => {
                        debug!(seed, onset, "candidate runs into a glitch, discarded");
                        continue;
                    }
                    OffsetSearch::NotFound => {
                        debug!(seed, onset, "no offset within duration budget");
                        continue;
                    }
                };

            // --- 4. Validation ---
            let (start, end) = (&samples[onset], &samples[offset]);
            let duration = end.time - start.time;
            if duration < self.config.min_duration {
                debug!(onset, offset, duration, "candidate too short, marked as noise");
                for sample in &mut samples[onset..=offset] {
                    sample.label = GazeLabel::Noise;
                }
                rejected_short += 1;
                continue;
            }

            let mean_speed = speed(
                sample_distance(start, end),
                clamped_elapsed(start.time, end.time),
            );
            if mean_speed < self.config.onset_slow {
                debug!(onset, offset, mean_speed, "candidate mean speed too low");
                rejected_slow += 1;
                continue;
            }

            // --- 5. Commit ---
            debug!(
                onset,
                offset,
                onset_time = start.time,
                offset_time = end.time,
                "saccade detected"
            );
            book.commit_saccade(samples, onset, offset);
        }

        // Final intersaccadic interval after the last saccade.
        book.close_gap(samples, n);

        // Glitch labels win over anything assigned during this pass.
        for (i, sample) in samples.iter_mut().enumerate() {
            if glitches.is_glitch(i) || (glitches.is_adjacent(i) && sample.is_unknown()) {
                sample.label = GazeLabel::Noise;
            }
        }

        info!(
            recording = series.name(),
            saccades = book.saccades,
            intersaccadic_intervals = book.intersaccadic,
            glitches = glitches.count(),
            rejected_short,
            rejected_slow,
            "saccade detection complete"
        );
        series
    }

    /// How many samples the onset/offset walks may visit.
    fn scan_limit(&self, series: &GazeSeries) -> usize {
        match series.mean_sample_interval() {
            Some(interval) => {
                let samples =
                    (SCAN_LIMIT_DURATION_FACTOR * self.config.max_duration / interval).round();
                (samples as usize).max(1)
            }
            None => series.len(),
        }
    }

    fn estimate_velocities(&self, samples: &[Sample]) -> Vec<DegreesPerSecond> {
        let times: Vec<Millis> = samples.iter().map(|s| s.time).collect();

        (0..samples.len())
            .map(|i| {
                let horizon = times[i] - self.config.velocity_window;
                // Samples at or before the horizon are far enough back.
                let reachable = times.partition_point(|&t| t <= horizon);
                let reference = reachable.min(i).saturating_sub(1);
                angular_speed(&samples[reference], &samples[i])
            })
            .collect()
    }

    /// The first sample after a glitch run is measured against the last sample
    /// before it, skipping the artefact entirely.
    fn remeasure_after_glitches(
        samples: &[Sample],
        glitches: &GlitchMap,
        velocities: &mut [DegreesPerSecond],
    ) {
        for i in 0..samples.len() {
            if !glitches.post[i] {
                continue;
            }
            let mut run_start = i - 1;
            while run_start > 0 && glitches.is_glitch(run_start - 1) {
                run_start -= 1;
            }
            velocities[i] = match run_start.checked_sub(1) {
                Some(before) => angular_speed(&samples[before], &samples[i]),
                None => 0.0,
            };
        }
    }

    fn is_seed(
        &self,
        samples: &[Sample],
        velocities: &[DegreesPerSecond],
        glitches: &GlitchMap,
        i: usize,
    ) -> bool {
        velocities[i] > self.config.onset_fast
            && velocities[i] < self.config.max_speed
            && !glitches.touches(i)
            && samples[i].is_unknown()
    }

    fn find_onset(
        &self,
        samples: &[Sample],
        velocities: &[DegreesPerSecond],
        glitches: &GlitchMap,
        seed: usize,
        scan_limit: usize,
    ) -> Option<usize> {
        let lower = seed.saturating_sub(scan_limit);
        let mut onset = seed;

        while onset > lower {
            let candidate = onset - 1;
            let still_moving = velocities[candidate] >= self.config.onset_slow
                && !glitches.touches(candidate)
                && samples[candidate].is_unknown();
            if !still_moving {
                return Some(onset);
            }
            onset = candidate;
        }

        // The recording start bounds the run; any other bound means the run is
        // longer than the scan limit.
        (lower == 0).then_some(onset)
    }

    fn find_offset(
        &self,
        samples: &[Sample],
        velocities: &[DegreesPerSecond],
        glitches: &GlitchMap,
        seed: usize,
        onset: usize,
        scan_limit: usize,
    ) -> OffsetSearch {
        let upper = seed.saturating_add(scan_limit).min(samples.len());
        let onset_time = samples[onset].time;

        for k in seed..upper {
            let sample = &samples[k];
            if !sample.is_unknown() {
                return if glitches.is_glitch(k) {
                    OffsetSearch::EndsInGlitch
                } else {
                    OffsetSearch::NotFound
                };
            }
            if glitches.touches(k) {
                continue;
            }
            if sample.time - onset_time > self.config.max_duration {
                return OffsetSearch::NotFound;
            }
            if velocities[k] < self.config.offset {
                return OffsetSearch::Found(k);
            }
        }

        OffsetSearch::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::gaze_series::RawGazeRecord;
    use crate::core_modules::sample::UNASSIGNED_INTERVAL;

    const STEP_MS: f64 = 10.0;

    fn series_from_x(xs: &[f64]) -> GazeSeries {
        let records: Vec<RawGazeRecord> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| RawGazeRecord::new(i as f64 * STEP_MS, x, 0.0, 2))
            .collect();
        GazeSeries::from_records("test", &records).unwrap()
    }

    fn detector() -> SaccadeDetector {
        SaccadeDetector::new(SaccadeConfig::default()).unwrap()
    }

    fn labels(series: &GazeSeries) -> Vec<GazeLabel> {
        series.labels()
    }

    #[test]
    fn stationary_gaze_has_no_saccades() {
        let series = detector().detect(series_from_x(&[3.0; 40]));
        assert!(series.iter().all(|s| s.velocity == 0.0));
        assert!(series.iter().all(|s| s.label == GazeLabel::Unknown));
        assert!(series.iter().all(|s| s.intersaccadic_interval_index == 0));
        assert!(series.iter().all(|s| s.saccade_interval_index == UNASSIGNED_INTERVAL));
    }

    #[test]
    fn single_step_is_one_saccade() {
        // Samples 20 and 21 carry the 20 degree jump, sample 22 is at rest again.
        let mut xs = vec![0.0; 20];
        xs.extend([10.0, 20.0]);
        xs.extend(vec![20.0; 20]);
        let series = detector().detect(series_from_x(&xs));

        let saccade: Vec<usize> = series
            .iter()
            .enumerate()
            .filter(|(_, s)| s.label == GazeLabel::Saccade)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(saccade, vec![20, 21, 22]);
        assert!(series.samples()[20..=22]
            .iter()
            .all(|s| s.saccade_interval_index == 0 && s.intersaccadic_interval_index == -1));
        assert!(series.samples()[..20].iter().all(|s| s.intersaccadic_interval_index == 0));
        assert!(series.samples()[23..].iter().all(|s| s.intersaccadic_interval_index == 1));
        assert_eq!(series.samples()[20].velocity, 1000.0);
    }

    #[test]
    fn velocity_looks_back_by_time() {
        let config = SaccadeConfig {
            velocity_window: 20.0,
            ..SaccadeConfig::default()
        };
        let detector = SaccadeDetector::new(config).unwrap();
        let xs: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        let series = detector.detect(series_from_x(&xs));
        // 0.1 deg every 10 ms is 10 deg/s whatever the look-back span.
        assert!((series.samples()[5].velocity - 10.0).abs() < 1e-9);
        // Sample 1 has no sample 20 ms back, so it falls back to sample 0.
        assert!((series.samples()[1].velocity - 10.0).abs() < 1e-9);
        assert_eq!(series.samples()[0].velocity, 0.0);
    }

    #[test]
    fn spike_and_neighbours_become_noise_without_saccade() {
        let mut xs = vec![0.0; 30];
        xs[15] = 15.0;
        xs[16] = 15.0;
        let series = detector().detect(series_from_x(&xs));

        for i in 14..=17 {
            assert_eq!(series.samples()[i].label, GazeLabel::Noise, "sample {i}");
        }
        assert!(!labels(&series).contains(&GazeLabel::Saccade));
        assert!(series.iter().all(|s| s.intersaccadic_interval_index == 0));
    }

    #[test]
    fn post_glitch_velocity_skips_the_artefact() {
        let mut xs = vec![0.0; 10];
        xs[4] = 30.0; // 3000 deg/s into and out of sample 4
        let series = detector().detect(series_from_x(&xs));
        // Samples 4 and 5 are glitches; sample 6 is compared against sample 3.
        assert_eq!(series.samples()[6].velocity, 0.0);
        for i in 3..=6 {
            assert_eq!(series.samples()[i].label, GazeLabel::Noise, "sample {i}");
        }
        assert_eq!(series.samples()[7].label, GazeLabel::Unknown);
    }

    #[test]
    fn too_short_candidate_is_noise() {
        let mut xs = vec![0.0; 20];
        xs.extend(vec![5.0; 20]);
        let series = detector().detect(series_from_x(&xs));
        // One 10 ms jump: onset at 20, offset at 21, shorter than 15 ms.
        assert_eq!(series.samples()[20].label, GazeLabel::Noise);
        assert_eq!(series.samples()[21].label, GazeLabel::Noise);
        assert!(!labels(&series).contains(&GazeLabel::Saccade));
    }

    #[test]
    fn out_and_back_movement_is_dropped() {
        // Onset at sample 20 (x=5) and offset at 23 (x=5): zero net displacement.
        let mut xs = vec![0.0; 20];
        xs.extend([5.0, 10.0, 5.0, 5.0]);
        xs.extend(vec![5.0; 20]);
        let series = detector().detect(series_from_x(&xs));

        assert!(series.iter().all(|s| s.label == GazeLabel::Unknown));
        assert!(series.iter().all(|s| s.intersaccadic_interval_index == 0));
    }

    #[test]
    fn two_saccades_tile_the_recording() {
        let mut xs = vec![0.0; 20];
        xs.extend([10.0, 20.0]);
        xs.extend(vec![20.0; 20]);
        xs.extend([10.0, 0.0]);
        xs.extend(vec![0.0; 20]);
        let series = detector().detect(series_from_x(&xs));

        assert_eq!(series.saccade_intervals(), vec![(0, 20..23), (1, 42..45)]);
        assert_eq!(
            series.intersaccadic_intervals(),
            vec![(0, 0..20), (1, 23..42), (2, 45..64)]
        );
        for sample in series.iter() {
            let in_saccade = sample.saccade_interval_index >= 0;
            let in_gap = sample.intersaccadic_interval_index >= 0;
            assert!(in_saccade ^ in_gap);
        }
    }

    #[test]
    fn overlong_movement_is_not_a_saccade() {
        let config = SaccadeConfig {
            max_duration: 40.0,
            ..SaccadeConfig::default()
        };
        let detector = SaccadeDetector::new(config).unwrap();
        // 2 degrees per 10 ms (200 deg/s) for 100 ms.
        let mut xs = vec![0.0; 20];
        xs.extend((1..=10).map(|i| i as f64 * 2.0));
        xs.extend(vec![20.0; 20]);
        let series = detector.detect(series_from_x(&xs));
        assert!(!labels(&series).contains(&GazeLabel::Saccade));
    }

    /// A 50 deg/s ramp over samples 40..45 into a 500 deg/s jump at 45, then a
    /// hold. The last sample lands at `last_time`.
    fn ramp_then_jump(last_time: Millis) -> GazeSeries {
        let mut xs = vec![0.0; 40];
        xs.extend((1..=5).map(|i| i as f64 * 0.5));
        xs.extend(vec![7.5; 12]);
        let mut records: Vec<RawGazeRecord> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| RawGazeRecord::new(i as f64 * STEP_MS, x, 0.0, 2))
            .collect();
        if let Some(last) = records.last_mut() {
            last.time = last_time;
        }
        GazeSeries::from_records("test", &records).unwrap()
    }

    #[test]
    fn onset_beyond_the_scan_limit_drops_the_seed() {
        // Regular spacing: the walk back reaches the start of the ramp.
        let series = detector().detect(ramp_then_jump(560.0));
        assert_eq!(series.saccade_intervals(), vec![(0, 40..47)]);

        // A long tail stretches the mean interval to ~536 ms, so the walk may
        // visit only three samples and the onset is still moving when it stops.
        let series = detector().detect(ramp_then_jump(30_000.0));
        assert_eq!(detector().scan_limit(&series), 3);
        assert!(series.iter().all(|s| s.label == GazeLabel::Unknown));
        assert!(series.saccade_intervals().is_empty());
    }

    #[test]
    fn offset_walk_into_a_glitch_discards_the_candidate() {
        let mut xs = vec![0.0; 20];
        xs.extend([5.0, 10.0, 25.0]); // 500, 500, then 1500 deg/s
        xs.extend(vec![25.0; 20]);
        let series = detector().detect(series_from_x(&xs));

        assert!(!labels(&series).contains(&GazeLabel::Saccade));
        assert!(series.saccade_intervals().is_empty());
        // The seed is dropped without a trace; the glitch and its neighbours are noise.
        assert_eq!(series.samples()[20].label, GazeLabel::Unknown);
        for i in 21..=23 {
            assert_eq!(series.samples()[i].label, GazeLabel::Noise, "sample {i}");
        }
        assert!(series.samples()[24..].iter().all(|s| s.label == GazeLabel::Unknown));
    }

    #[test]
    fn inconsistent_configs_are_rejected() {
        let bad = SaccadeConfig {
            onset_slow: 200.0,
            ..SaccadeConfig::default()
        };
        assert!(SaccadeDetector::new(bad).is_err());

        let bad = SaccadeConfig {
            min_duration: 0.0,
            ..SaccadeConfig::default()
        };
        assert!(SaccadeDetector::new(bad).is_err());

        let bad = SaccadeConfig {
            max_speed: 100.0,
            ..SaccadeConfig::default()
        };
        assert!(SaccadeDetector::new(bad).is_err());
    }
}
