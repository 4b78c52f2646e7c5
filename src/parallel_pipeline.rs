// THEORY:
// A single recording is always classified sequentially, but a study produces
// many independent recordings (participants times trials). The
// `BatchPipeline` spreads those across a pool of tokio workers.
//
// Key architectural principles:
// 1.  **Ownership travels with the task**: each `RecordingTask` carries its
//     series by value to a worker and the classified series comes back on a
//     `oneshot` channel. Workers never share a recording.
// 2.  **Round-robin dispatch**: one dispatcher task feeds the workers in turn
//     from a single unbounded queue.
// 3.  **Order-preserving batches**: `classify_batch` returns results in input
//     order regardless of which worker finishes first.
// 4.  **Blocking work off the runtime**: classification is CPU-bound, so each
//     worker hands the recording to `spawn_blocking` and only awaits the result.
// 5.  **Shutdown by dropping**: closing the task queue ends the dispatcher, which
//     closes every worker queue and lets the workers exit.

use crate::core_modules::gaze_series::GazeSeries;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{GazePipeline, PipelineConfig};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct RecordingTask {
    series: GazeSeries,
    result_sender: oneshot::Sender<GazeSeries>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<RecordingTask>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one). Must be called inside a tokio runtime.
    pub fn new(pipeline: GazePipeline, size: usize) -> Self {
        let size = size.max(1);
        let pipeline = Arc::new(pipeline);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<RecordingTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<RecordingTask>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "worker queue closed, dropping recording");
                }
                worker_idx = (worker_idx + 1) % size;
            }
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker, mut worker_receiver)| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let RecordingTask {
                            series,
                            result_sender,
                        } = task;
                        debug!(worker, recording = series.name(), "worker picked up recording");
                        let job = Arc::clone(&pipeline);
                        match tokio::task::spawn_blocking(move || job.classify(series)).await {
                            // The caller may have stopped waiting.
                            Ok(classified) => {
                                let _ = result_sender.send(classified);
                            }
                            Err(err) => warn!(worker, %err, "classification task failed"),
                        }
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub async fn classify(&self, series: GazeSeries) -> PipelineResult<GazeSeries> {
        let name = series.name().to_string();
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(RecordingTask {
                series,
                result_sender,
            })
            .map_err(|_| PipelineError::WorkerPoolClosed)?;

        result_receiver
            .await
            .map_err(|_| PipelineError::WorkerDropped(name))
    }

    /// Closes the task queue and waits for every worker to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for result in join_all(self.workers).await {
            if let Err(err) = result {
                warn!(%err, "worker terminated abnormally");
            }
        }
    }
}

/// Classifies many independent recordings concurrently.
pub struct BatchPipeline {
    worker_pool: WorkerPool,
}

impl BatchPipeline {
    /// One worker per logical CPU.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        Self::with_workers(config, num_cpus::get())
    }

    pub fn with_workers(config: PipelineConfig, workers: usize) -> PipelineResult<Self> {
        let pipeline = GazePipeline::new(config)?;
        Ok(Self {
            worker_pool: WorkerPool::new(pipeline, workers),
        })
    }

    pub fn workers(&self) -> usize {
        self.worker_pool.size()
    }

    pub async fn classify(&self, series: GazeSeries) -> PipelineResult<GazeSeries> {
        self.worker_pool.classify(series).await
    }

    /// Classifies every recording; the i-th result belongs to the i-th input.
    pub async fn classify_batch(
        &self,
        recordings: Vec<GazeSeries>,
    ) -> Vec<PipelineResult<GazeSeries>> {
        join_all(
            recordings
                .into_iter()
                .map(|series| self.worker_pool.classify(series)),
        )
        .await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
