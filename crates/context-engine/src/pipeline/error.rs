use thiserror::Error;

use crate::extract::ExtractError;
use crate::jobs::JobError;
use crate::vector::VectorStoreError;

pub const EXTRACTION_FAILED_MESSAGE: &str = "Critical error: Failed to extract text from PDF.";
pub const NO_CHUNKS_MESSAGE: &str = "Critical error: Extracted text produced no chunks.";
pub const EMBEDDING_FAILED_MESSAGE: &str = "Critical error: Failed to generate embeddings.";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Text splitting produced no chunks")]
    NoChunks,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store failed: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Job update failed: {0}")]
    Job(#[from] JobError),

    /// A blocking step panicked or was cancelled.
    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// The message recorded on the failed job.
    pub fn failure_message(&self) -> String {
        match self {
            PipelineError::Extraction(_) => EXTRACTION_FAILED_MESSAGE.to_string(),
            PipelineError::NoChunks => NO_CHUNKS_MESSAGE.to_string(),
            PipelineError::Embedding(_) => EMBEDDING_FAILED_MESSAGE.to_string(),
            PipelineError::VectorStore(e) => format!("Failed to store vectors: {}", e),
            PipelineError::Job(e) => format!("An unexpected error occurred: {}", e),
            PipelineError::Unexpected(cause) => {
                format!("An unexpected error occurred: {}", cause)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failures_share_one_message() {
        assert_eq!(
            PipelineError::Extraction(ExtractError::NoText).failure_message(),
            "Critical error: Failed to extract text from PDF."
        );
        assert_eq!(
            PipelineError::Extraction(ExtractError::InvalidPdf("bad xref".into()))
                .failure_message(),
            EXTRACTION_FAILED_MESSAGE
        );
    }

    #[test]
    fn test_unexpected_failure_carries_cause() {
        let err = PipelineError::Unexpected("task panicked".into());
        assert_eq!(
            err.failure_message(),
            "An unexpected error occurred: task panicked"
        );
    }

    #[test]
    fn test_vector_failure_mentions_cause() {
        let err = PipelineError::VectorStore(VectorStoreError::CollectionMissing("cvs".into()));
        assert!(err.failure_message().contains("Collection 'cvs' does not exist"));
    }
}
