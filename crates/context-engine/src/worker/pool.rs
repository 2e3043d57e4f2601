//! Worker pool that runs each accepted upload as its own task.

use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::WorkerError;
use crate::pipeline::{IngestionPipeline, PipelineError};
use crate::worker::job::{IngestionRequest, IngestionResult};

/// Results kept for slow subscribers before older ones are dropped.
const RESULT_BUFFER: usize = 256;

/// Hands accepted uploads to something that will run them.
pub trait JobSubmitter: Send + Sync {
    /// Schedules the request and returns without waiting for it to run.
    fn submit(&self, request: IngestionRequest) -> Result<(), WorkerError>;
}

/// Runs each submitted request as its own tokio task.
///
/// Requests are independent: there is no ordering across jobs and no limit
/// on how many run at once. CPU-heavy steps inside the pipeline move to the
/// blocking pool themselves.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::UnboundedSender<IngestionRequest>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    results: broadcast::Sender<IngestionResult>,
}

impl WorkerPool {
    /// Starts the dispatcher on the current tokio runtime.
    pub fn start(pipeline: Arc<IngestionPipeline>) -> Result<Self, WorkerError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let (results, _) = broadcast::channel(RESULT_BUFFER);

        let dispatcher = runtime.spawn(dispatch(pipeline, receiver, results.clone()));
        info!("Worker pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
            results,
        })
    }

    /// Receives the result of every run that finishes after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestionResult> {
        self.results.subscribe()
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().map(|s| s.is_none()).unwrap_or(true)
    }

    /// Stops accepting requests and waits for in-flight runs to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down worker pool...");
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let dispatcher = self.dispatcher.lock().ok().and_then(|mut d| d.take());
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                error!("Worker pool dispatcher failed: {}", e);
            }
        }
        info!("All ingestion jobs have stopped");
    }
}

impl JobSubmitter for WorkerPool {
    fn submit(&self, request: IngestionRequest) -> Result<(), WorkerError> {
        let guard = self.sender.lock().map_err(|_| WorkerError::ChannelClosed)?;
        let sender = guard.as_ref().ok_or(WorkerError::ChannelClosed)?;
        sender
            .send(request)
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

async fn dispatch(
    pipeline: Arc<IngestionPipeline>,
    mut receiver: mpsc::UnboundedReceiver<IngestionRequest>,
    results: broadcast::Sender<IngestionResult>,
) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            request = receiver.recv() => match request {
                Some(request) => {
                    debug!("Dispatching job '{}'", request.job_id);
                    tasks.spawn(run_guarded(Arc::clone(&pipeline), request, results.clone()));
                }
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_join(joined);
            }
        }
    }

    debug!("Job channel closed, draining {} running jobs", tasks.len());
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
}

/// Runs one request in its own task so a panic inside the pipeline is
/// caught and recorded on the job instead of being lost.
async fn run_guarded(
    pipeline: Arc<IngestionPipeline>,
    request: IngestionRequest,
    results: broadcast::Sender<IngestionResult>,
) {
    let job_id = request.job_id.clone();
    let runner = Arc::clone(&pipeline);

    let result = match tokio::spawn(async move { runner.run(request).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!("Ingestion task for job '{}' aborted: {}", job_id, e);
            let message = PipelineError::Unexpected(e.to_string()).failure_message();
            pipeline.record_failure(&job_id, &message).await;
            IngestionResult::failure(&job_id, message)
        }
    };

    // No subscribers is fine.
    let _ = results.send(result);
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!("Worker task failed: {}", e);
    }
}
