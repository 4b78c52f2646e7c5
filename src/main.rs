// Example runner: classifies a handful of synthetic trials on the worker pool
// and logs the resulting events. Set `RUST_LOG=debug` for per-decision logs and
// `GAZE_EVENTS_CONFIG=<path>` to load detector parameters from a JSON file.

use gaze_events::core_modules::utils::gap_filler::DEFAULT_MAX_GAP_MS;
use gaze_events::{
    BatchPipeline, GazeLabel, GazeSeries, PipelineConfig, PipelineResult, RawGazeRecord,
    extract_events, fill_tracking_gaps,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SAMPLE_INTERVAL_MS: f64 = 5.0;

/// Builds a plausible trial segment by segment.
struct TrialBuilder {
    records: Vec<RawGazeRecord>,
    time: f64,
    x: f64,
    y: f64,
}

impl TrialBuilder {
    fn at(x: f64, y: f64) -> Self {
        Self {
            records: Vec::new(),
            time: 0.0,
            x,
            y,
        }
    }

    fn push(&mut self) {
        self.records
            .push(RawGazeRecord::new(self.time, self.x, self.y, 2));
        self.time += SAMPLE_INTERVAL_MS;
    }

    /// Fixation with a little deterministic tremor.
    fn hold(mut self, duration: f64) -> Self {
        let (cx, cy) = (self.x, self.y);
        for _ in 0..(duration / SAMPLE_INTERVAL_MS) as usize {
            self.x = cx + 0.02 * (self.time * 0.7).sin();
            self.y = cy + 0.02 * (self.time * 1.3).cos();
            self.push();
        }
        self.x = cx;
        self.y = cy;
        self
    }

    /// Straight saccade to `(x, y)` over `duration` ms.
    fn jump_to(mut self, x: f64, y: f64, duration: f64) -> Self {
        let steps = (duration / SAMPLE_INTERVAL_MS).max(1.0) as usize;
        let (dx, dy) = ((x - self.x) / steps as f64, (y - self.y) / steps as f64);
        for _ in 0..steps {
            self.x += dx;
            self.y += dy;
            self.push();
        }
        self
    }

    /// Smooth pursuit at a constant velocity in deg/s.
    fn track(mut self, vx: f64, vy: f64, duration: f64) -> Self {
        let per_sample = SAMPLE_INTERVAL_MS / 1000.0;
        for _ in 0..(duration / SAMPLE_INTERVAL_MS) as usize {
            self.x += vx * per_sample;
            self.y += vy * per_sample;
            self.push();
        }
        self
    }

    /// The tracker records nothing for `duration` ms.
    fn lose_tracking(mut self, duration: f64) -> Self {
        self.time += duration;
        self
    }

    fn build(self) -> Vec<RawGazeRecord> {
        self.records
    }
}

fn synthetic_trial(participant: usize, trial: usize) -> PipelineResult<GazeSeries> {
    let spread = (participant + trial) as f64;
    let records = TrialBuilder::at(0.0, 0.0)
        .hold(400.0)
        .jump_to(8.0 + spread, 2.0, 30.0)
        .hold(300.0)
        .track(10.0, 0.0, 500.0)
        .hold(250.0)
        .jump_to(-5.0, -1.0 - spread, 40.0)
        .hold(10.0)
        .lose_tracking(120.0)
        .hold(350.0)
        .build();

    let records = fill_tracking_gaps(&records, DEFAULT_MAX_GAP_MS);
    Ok(GazeSeries::from_records(
        format!("P{participant}_T{trial}"),
        &records,
    )?)
}

fn load_config() -> PipelineResult<PipelineConfig> {
    match std::env::var("GAZE_EVENTS_CONFIG") {
        Ok(path) => {
            info!(%path, "loading pipeline configuration");
            PipelineConfig::from_json_str(&std::fs::read_to_string(path)?)
        }
        Err(_) => Ok(PipelineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> PipelineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Gaze Events - Example Runner");

    let config = load_config()?;
    let batch = BatchPipeline::new(config)?;
    info!(workers = batch.workers(), "worker pool ready");

    let mut recordings = Vec::new();
    for participant in 1..=3 {
        for trial in 1..=2 {
            recordings.push(synthetic_trial(participant, trial)?);
        }
    }

    for result in batch.classify_batch(recordings).await {
        let series = match result {
            Ok(series) => series,
            Err(err) => {
                error!(%err, "recording failed");
                continue;
            }
        };

        let counts = series.label_counts();
        let count = |label: GazeLabel| counts.get(&label).copied().unwrap_or(0);
        info!(
            recording = series.name(),
            fixation = count(GazeLabel::Fixation),
            saccade = count(GazeLabel::Saccade),
            smooth_pursuit = count(GazeLabel::SmoothPursuit),
            blink = count(GazeLabel::Blink),
            noise = count(GazeLabel::Noise) + count(GazeLabel::NoiseCluster),
            unknown = count(GazeLabel::Unknown),
            "sample labels"
        );

        for event in extract_events(&series) {
            info!(
                recording = series.name(),
                label = %event.label,
                start_ms = event.start_time,
                duration_ms = event.duration(),
                samples = event.sample_count(),
                "event"
            );
        }
    }

    batch.shutdown().await;
    Ok(())
}
