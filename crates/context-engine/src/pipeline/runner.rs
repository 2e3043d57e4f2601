//! The ingestion pipeline: extract text, then chunk, embed and upsert.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use crate::chunking::{SplitterError, TextSplitter};
use crate::embedding::{Embedder, EmbeddingTask};
use crate::extract::{ExtractError, TextExtractor};
use crate::jobs::{JobManager, JobPatch, JobStage};
use crate::vector::VectorUpsertCoordinator;
use crate::worker::job::{IngestionRequest, IngestionResult};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;

pub const EXTRACTING_DETAILS: &str = "Extracting text from the uploaded CV.";
pub const VECTORIZING_DETAILS: &str = "Chunking and embedding the extracted text.";
pub const COMPLETED_DETAILS: &str = "CV has been successfully parsed.";

/// Drives one accepted upload from QUEUED to a terminal state.
pub struct IngestionPipeline {
    jobs: Arc<JobManager>,
    extractor: Arc<dyn TextExtractor>,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<VectorUpsertCoordinator>,
}

impl IngestionPipeline {
    pub fn new(
        config: &PipelineConfig,
        jobs: Arc<JobManager>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<VectorUpsertCoordinator>,
    ) -> Result<Self, SplitterError> {
        Ok(Self {
            jobs,
            extractor,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            vectors,
        })
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    /// Runs the pipeline. Every failure is recorded on the job and reported
    /// in the result; nothing escapes to the caller.
    pub async fn run(&self, request: IngestionRequest) -> IngestionResult {
        let span = info_span!("pipeline",
            job_id = %request.job_id,
            job_type = %request.job_type,
            filename = request.filename.as_deref().unwrap_or("unknown"),
        );

        async move {
            tracing::info!("Starting ingestion job");
            let mut ctx = PipelineContext::new(request);

            match self.execute(&mut ctx).await {
                Ok(()) => {
                    tracing::info!(chunks = ctx.chunks.len(), points = ctx.points, "Ingestion job completed");
                    IngestionResult::success(&ctx.job_id, ctx.chunks.len(), ctx.points)
                }
                Err(e) => {
                    let message = e.failure_message();
                    tracing::error!(stage = %ctx.stage, "Ingestion job failed: {}", e);
                    self.record_failure(&ctx.job_id, &message).await;
                    IngestionResult::failure(&ctx.job_id, message)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Marks the job FAILED. Errors here are logged only.
    pub async fn record_failure(&self, job_id: &str, message: &str) {
        if let Err(e) = self.jobs.update_job(job_id, &JobPatch::fail(message)).await {
            tracing::error!(job_id, "Failed to record job failure: {}", e);
        }
    }

    async fn execute(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        // Step 1: Extract text
        self.advance(ctx, JobStage::ExtractingText, EXTRACTING_DETAILS)
            .await?;
        self.step_extract_text(ctx)
            .instrument(info_span!("extract_text"))
            .await?;

        // Step 2: Chunk, embed and store
        self.advance(ctx, JobStage::Vectorization, VECTORIZING_DETAILS)
            .await?;
        self.step_vectorize(ctx)
            .instrument(info_span!("vectorize"))
            .await?;

        // Step 3: Complete
        self.jobs
            .update_job(&ctx.job_id, &JobPatch::complete(COMPLETED_DETAILS))
            .await?;
        ctx.stage = JobStage::Completed;
        Ok(())
    }

    async fn advance(
        &self,
        ctx: &mut PipelineContext,
        stage: JobStage,
        details: &str,
    ) -> Result<(), PipelineError> {
        self.jobs
            .update_job(&ctx.job_id, &JobPatch::advance(stage, details))
            .await?;
        ctx.stage = stage;
        Ok(())
    }

    async fn step_extract_text(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = std::mem::take(&mut ctx.bytes);

        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| PipelineError::Unexpected(e.to_string()))??;

        if text.trim().is_empty() {
            return Err(ExtractError::NoText.into());
        }

        tracing::debug!(chars = text.chars().count(), "Extracted text");
        ctx.text = Some(text);
        Ok(())
    }

    async fn step_vectorize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let text = ctx.text.as_deref().unwrap_or_default();
        let chunks = self.splitter.split_text(text);
        // Blank text is rejected during extraction, so this only trips for a
        // splitter that drops everything it is given.
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks);
        }
        tracing::debug!(chunks = chunks.len(), "Split text into chunks");

        let embedder = Arc::clone(&self.embedder);
        let (chunks, embeddings) = tokio::task::spawn_blocking(move || {
            let embeddings = embedder.embed(&chunks, EmbeddingTask::RetrievalDocument);
            (chunks, embeddings)
        })
        .await
        .map_err(|e| PipelineError::Unexpected(e.to_string()))?;

        if embeddings.is_empty() {
            return Err(PipelineError::Embedding(format!(
                "no embeddings returned for {} chunks",
                chunks.len()
            )));
        }

        let metadata = ctx.base_metadata();
        ctx.points = self
            .vectors
            .replace_source(&ctx.job_id, &chunks, embeddings, &metadata)
            .await?;
        ctx.chunks = chunks;
        Ok(())
    }
}
