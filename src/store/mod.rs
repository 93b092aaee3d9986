//! Persistence seam.
//!
//! Services talk to `dyn Store`; `PgStore` backs production and `MemoryStore`
//! backs tests and database-less development. Both enforce the cross-request
//! invariants themselves (one application per job and applicant, guarded status
//! transitions, the alert cap) so that concurrent requests cannot break them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationStatus, Job, JobAlert, JobFilter, JobStatus, JobType, Page, Role, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails `Conflict` when the (case-insensitive) email is taken.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;
    async fn user_by_reset_token(&self, digest: &str) -> Result<Option<User>, StoreError>;
    /// Overwrites every mutable column of an existing user.
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
    /// Adds `job_id` to the saved set if absent, removes it otherwise.
    async fn toggle_saved_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    /// Newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn count_users(&self, role: Option<Role>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: Job) -> Result<Job, StoreError>;
    async fn job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError>;
    /// Missing ids are skipped.
    async fn jobs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError>;
    async fn save_job(&self, job: &Job) -> Result<(), StoreError>;
    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Open jobs matching `filter`, newest first, plus the total match count.
    async fn search_jobs(&self, filter: &JobFilter, page: Page)
        -> Result<(Vec<Job>, u64), StoreError>;
    /// Newest first.
    async fn jobs_by_owner(&self, owner: Uuid) -> Result<Vec<Job>, StoreError>;
    async fn count_jobs(&self, status: Option<JobStatus>) -> Result<u64, StoreError>;
    async fn count_jobs_by_type(&self) -> Result<Vec<(JobType, u64)>, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Fails `Conflict` when the applicant already applied to the job.
    async fn insert_application(&self, application: Application)
        -> Result<Application, StoreError>;
    async fn application_by_id(&self, id: Uuid) -> Result<Option<Application>, StoreError>;
    async fn application_for(
        &self,
        job: Uuid,
        applicant: Uuid,
    ) -> Result<Option<Application>, StoreError>;
    /// Newest first.
    async fn applications_by_applicant(&self, applicant: Uuid)
        -> Result<Vec<Application>, StoreError>;
    /// Newest first.
    async fn applications_by_jobs(&self, jobs: &[Uuid]) -> Result<Vec<Application>, StoreError>;
    /// Compare-and-set on the status. `Conflict` if the current status is not `from`.
    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Application, StoreError>;
    /// Moves every pending application of `job` to `closed`; returns how many moved.
    async fn close_pending_applications(&self, job: Uuid) -> Result<u64, StoreError>;
    async fn count_applications(&self, status: Option<ApplicationStatus>)
        -> Result<u64, StoreError>;
    /// `(job id, application count)`, most applied first.
    async fn top_jobs_by_applications(&self, limit: u32) -> Result<Vec<(Uuid, u64)>, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Fails `LimitExceeded` when the owner already has `cap` alerts.
    async fn insert_alert_capped(&self, alert: JobAlert, cap: u64) -> Result<JobAlert, StoreError>;
    /// Newest first.
    async fn alerts_by_user(&self, user: Uuid) -> Result<Vec<JobAlert>, StoreError>;
    async fn alert_by_id(&self, id: Uuid) -> Result<Option<JobAlert>, StoreError>;
    async fn delete_alert(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub trait Store: UserStore + JobStore + ApplicationStore + AlertStore {}

impl<T> Store for T where T: UserStore + JobStore + ApplicationStore + AlertStore {}

pub(crate) const DUPLICATE_APPLICATION: &str = "You have already applied for this job";
pub(crate) const DUPLICATE_EMAIL: &str = "email already registered";
