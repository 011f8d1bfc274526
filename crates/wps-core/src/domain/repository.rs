//! Job store
//!
//! Jobs only live as long as status and result queries need them, so the
//! store is a plain keyed collection with time-based eviction. Other crates
//! can implement [`JobRepository`] to back it differently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::job::{Job, JobId};
use crate::error::RepositoryError;

/// Repository for jobs
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Find a job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;

    /// Insert or replace a job
    async fn save(&self, job: &Job) -> Result<(), RepositoryError>;

    /// Remove every job whose retention window elapsed, returning their identifiers
    async fn evict_expired(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<Vec<JobId>, RepositoryError>;
}

/// In-memory implementations for testing and development
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    /// In-memory job repository over a concurrent map
    pub struct MemoryJobRepository {
        jobs: Arc<DashMap<JobId, Job>>,
    }

    impl MemoryJobRepository {
        /// Create a new memory job repository
        pub fn new() -> Self {
            Self {
                jobs: Arc::new(DashMap::with_capacity(64)),
            }
        }

        /// Number of retained jobs
        pub fn len(&self) -> usize {
            self.jobs.len()
        }

        /// Whether no job is retained
        pub fn is_empty(&self) -> bool {
            self.jobs.is_empty()
        }
    }

    impl Default for MemoryJobRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl JobRepository for MemoryJobRepository {
        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
            Ok(self.jobs.get(id).map(|job| job.clone()))
        }

        async fn save(&self, job: &Job) -> Result<(), RepositoryError> {
            self.jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn evict_expired(
            &self,
            now: DateTime<Utc>,
            retention: Duration,
        ) -> Result<Vec<JobId>, RepositoryError> {
            let mut evicted = Vec::new();
            self.jobs.retain(|id, job| {
                let expired = job.is_expired(now, retention);
                if expired {
                    evicted.push(id.clone());
                }
                !expired
            });
            Ok(evicted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryJobRepository;
    use super::*;
    use crate::domain::job::{ExecutionFailure, FailureKind, JobState};
    use crate::domain::request::ExecuteRequest;
    use std::sync::Arc;

    fn job() -> Job {
        Job::new(Arc::new(ExecuteRequest::builder("echo").build()))
    }

    #[tokio::test]
    async fn test_save_replaces_stored_job() {
        let repo = MemoryJobRepository::new();
        let mut job = job();
        repo.save(&job).await.unwrap();

        job.fail(ExecutionFailure::new(FailureKind::Algorithm, "nope"))
            .unwrap();
        repo.save(&job).await.unwrap();

        let found = repo.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.state, JobState::Failed);
        assert!(found.events.is_empty());
        assert_eq!(repo.len(), 1);
        assert!(repo.find_by_id(&JobId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_running_and_fresh_jobs() {
        let repo = MemoryJobRepository::new();
        let running = job();
        let mut finished = job();
        finished.cancel().unwrap();
        repo.save(&running).await.unwrap();
        repo.save(&finished).await.unwrap();

        let retention = Duration::from_secs(30);
        let evicted = repo.evict_expired(Utc::now(), retention).await.unwrap();
        assert!(evicted.is_empty());

        let later = Utc::now() + chrono::Duration::seconds(31);
        let evicted = repo.evict_expired(later, retention).await.unwrap();
        assert_eq!(evicted, vec![finished.id.clone()]);
        assert_eq!(repo.len(), 1);
    }
}
