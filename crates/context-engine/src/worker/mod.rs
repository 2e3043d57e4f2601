pub mod job;
pub mod pool;

pub use job::{IngestionRequest, IngestionResult};
pub use pool::{JobSubmitter, WorkerPool};
