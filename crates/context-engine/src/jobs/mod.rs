pub mod error;
pub mod manager;
pub mod model;

pub use error::JobError;
pub use manager::{JobManager, DEFAULT_KEY_PREFIX};
pub use model::{Job, JobPatch, JobStage, JobStatus, JobType};

/// Generates a unique job id of the form `<prefix>:<uuid>`.
pub fn generate_job_id(prefix: Option<&str>) -> String {
    let base = uuid::Uuid::new_v4().to_string();
    match prefix {
        Some(p) if !p.is_empty() => format!("{}:{}", p, base),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_job_id_with_prefix() {
        let id = generate_job_id(Some("cv"));
        assert!(id.starts_with("cv:"));
        assert_eq!(id.len(), "cv:".len() + 36);
    }

    #[test]
    fn test_generate_job_id_without_prefix() {
        let id = generate_job_id(None);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(generate_job_id(None), id);
    }
}
