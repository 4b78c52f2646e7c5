use gaze_events::core_modules::pursuit_detector::{PursuitConfig, SmoothPursuitDetector};
use gaze_events::{GazeLabel, GazePipeline, GazeSeries, PipelineConfig, RawGazeRecord, events_with_label};

const STEP_MS: f64 = 10.0;

/// Valid samples at 10 ms spacing with the given horizontal positions.
fn records(xs: &[f64]) -> Vec<RawGazeRecord> {
    xs.iter()
        .enumerate()
        .map(|(i, &x)| RawGazeRecord::new(i as f64 * STEP_MS, x, 0.0, 2))
        .collect()
}

fn classify(records: &[RawGazeRecord]) -> GazeSeries {
    let pipeline = GazePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.classify_records("scenario", records).unwrap()
}

fn labels_in(series: &GazeSeries, range: std::ops::Range<usize>) -> Vec<GazeLabel> {
    series.samples()[range].iter().map(|s| s.label).collect()
}

#[test]
fn stationary_gaze_is_a_single_fixation() {
    let series = classify(&records(&[4.0; 100]));

    assert!(series.iter().all(|s| s.velocity.abs() < 1e-9));
    assert!(series.saccade_intervals().is_empty());

    let fixations = events_with_label(&series, GazeLabel::Fixation);
    assert_eq!(fixations.len(), 1);
    assert_eq!((fixations[0].start_index, fixations[0].end_index), (0, 99));
}

#[test]
fn step_is_one_saccade_between_fixations() {
    // 20 degrees in 20 ms, peaking at 1000 deg/s.
    let mut xs = vec![0.0; 50];
    xs.extend([10.0, 20.0]);
    xs.extend(vec![20.0; 50]);
    let series = classify(&records(&xs));

    let saccades = events_with_label(&series, GazeLabel::Saccade);
    assert_eq!(saccades.len(), 1);
    assert!(saccades[0].start_index.abs_diff(50) <= 1);
    assert!(saccades[0].end_index.abs_diff(51) <= 1);

    assert!(labels_in(&series, 0..saccades[0].start_index)
        .iter()
        .all(|&l| l == GazeLabel::Fixation));
    assert!(labels_in(&series, saccades[0].end_index + 1..series.len())
        .iter()
        .all(|&l| l == GazeLabel::Fixation));
}

#[test]
fn velocity_spike_is_noise_and_triggers_nothing() {
    // Out to 15 degrees and back: 1500 deg/s for two consecutive samples.
    let mut xs = vec![0.0; 60];
    xs[30] = 15.0;
    let series = classify(&records(&xs));

    assert!(series.samples()[30].velocity > 1031.25);
    assert!(series.samples()[31].velocity > 1031.25);
    assert_eq!(labels_in(&series, 29..33), vec![GazeLabel::Noise; 4]);
    assert!(series.saccade_intervals().is_empty());
    assert!(!series.labels().contains(&GazeLabel::Saccade));
}

#[test]
fn invalid_patch_after_saccade_is_a_blink_and_far_patch_is_noise() {
    let mut input = records(&[0.0; 30]);
    let mut push = |x: f64, status: i64| {
        let time = input.len() as f64 * STEP_MS;
        input.push(RawGazeRecord::new(time, x, 0.0, status));
    };
    // 30..32 saccade, 32..34 at rest, 34..37 tracking lost (30 ms).
    for x in [10.0, 20.0, 20.0, 20.0] {
        push(x, 2);
    }
    for _ in 0..3 {
        push(0.0, 0);
    }
    for _ in 37..70 {
        push(20.0, 2);
    }
    // Identical patch far from any saccade.
    for _ in 0..3 {
        push(0.0, 0);
    }
    for _ in 73..110 {
        push(20.0, 2);
    }
    let series = classify(&input);

    let saccades = events_with_label(&series, GazeLabel::Saccade);
    assert_eq!(saccades.len(), 1);
    assert_eq!((saccades[0].start_index, saccades[0].end_index), (30, 32));

    assert_eq!(labels_in(&series, 34..37), vec![GazeLabel::Blink; 3]);
    assert_eq!(labels_in(&series, 70..73), vec![GazeLabel::Noise; 3]);
}

#[test]
fn dense_candidates_are_pursuit_and_isolated_ones_noise() {
    let points = [
        (0.0, 5.0),
        (10.0, 5.5),
        (20.0, 6.0),
        (30.0, 6.5),
        (40.0, 25.0), // nothing within 4 degrees
    ];
    let input: Vec<RawGazeRecord> = points
        .iter()
        .map(|&(t, x)| RawGazeRecord::new(t, x, 0.0, 2))
        .collect();
    let series = GazeSeries::from_records("pursuit", &input).unwrap();

    let detector = SmoothPursuitDetector::new(PursuitConfig::default()).unwrap();
    let (series, clusters) = detector.detect_with_clusters(series);

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].sample_indices, vec![0, 1, 2, 3]);
    assert_eq!(labels_in(&series, 0..4), vec![GazeLabel::SmoothPursuit; 4]);
    assert_eq!(series.samples()[4].label, GazeLabel::NoiseCluster);
}

#[test]
fn tracking_between_fixations_is_pursuit() {
    // 300 ms hold, 1 s at 10 deg/s, 300 ms hold.
    let mut xs = vec![0.0; 30];
    xs.extend((1..=100).map(|i| i as f64 * 0.1));
    xs.extend(vec![10.0; 30]);
    let series = classify(&records(&xs));

    assert!(series.saccade_intervals().is_empty());
    assert_eq!(labels_in(&series, 45..115), vec![GazeLabel::SmoothPursuit; 70]);
    assert_eq!(labels_in(&series, 0..25), vec![GazeLabel::Fixation; 25]);
    assert_eq!(labels_in(&series, 135..160), vec![GazeLabel::Fixation; 25]);
}

#[test]
fn three_close_candidates_are_enough_for_pursuit() {
    let input: Vec<RawGazeRecord> = [(0.0, 0.0), (10.0, 0.5), (20.0, 1.0), (30.0, 25.0)]
        .iter()
        .map(|&(t, x)| RawGazeRecord::new(t, x, 0.0, 2))
        .collect();
    let series = GazeSeries::from_records("pursuit", &input).unwrap();

    let detector = SmoothPursuitDetector::new(PursuitConfig::default()).unwrap();
    let (series, clusters) = detector.detect_with_clusters(series);

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].sample_indices, vec![0, 1, 2]);
    assert_eq!(labels_in(&series, 0..3), vec![GazeLabel::SmoothPursuit; 3]);
    assert_eq!(series.samples()[3].label, GazeLabel::NoiseCluster);
}
