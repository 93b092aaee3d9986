use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::attach_owners;
use crate::auth::Principal;
use crate::error::AppError;
use crate::models::{Job, JobInput, JobPage, JobPatch, JobQuery, JobWithOwner};
use crate::policy::{ensure, Action, Resource};
use crate::store::Store;

pub struct JobService {
    store: Arc<dyn Store>,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn find(&self, id: Uuid) -> Result<Job, AppError> {
        self.store
            .job_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".into()))
    }

    pub async fn create(&self, principal: &Principal, input: JobInput) -> Result<Job, AppError> {
        ensure(Some(principal), Action::CreateJob, Resource::Unowned)?;
        input.validate()?;

        let job = self.store.insert_job(Job::new(input, principal.id)?).await?;
        info!("job {} \"{}\" posted by {}", job.id, job.title, principal.id);
        Ok(job)
    }

    /// Public listing of open jobs.
    pub async fn list(&self, query: JobQuery) -> Result<JobPage, AppError> {
        ensure(None, Action::ViewJobs, Resource::Unowned)?;
        let (filter, page) = query.into_parts();

        let (jobs, total) = self.store.search_jobs(&filter, page).await?;
        Ok(JobPage {
            jobs: attach_owners(self.store.as_ref(), jobs).await?,
            total,
            page: page.number,
            pages: page.count(total),
        })
    }

    /// Any job by id, open or not.
    pub async fn get(&self, id: Uuid) -> Result<JobWithOwner, AppError> {
        ensure(None, Action::ViewJobs, Resource::Unowned)?;
        let job = self.find(id).await?;

        let mut joined = attach_owners(self.store.as_ref(), vec![job]).await?;
        joined
            .pop()
            .ok_or_else(|| AppError::Internal("owner join dropped the job".into()))
    }

    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Job>, AppError> {
        ensure(Some(principal), Action::ListOwnJobs, Resource::Unowned)?;
        Ok(self.store.jobs_by_owner(principal.id).await?)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: JobPatch,
    ) -> Result<Job, AppError> {
        let mut job = self.find(id).await?;
        ensure(Some(principal), Action::UpdateJob, Resource::OwnedBy(job.posted_by))?;
        patch.validate()?;

        job.apply_patch(patch);
        self.store.save_job(&job).await?;
        info!("job {} updated by {}", job.id, principal.id);
        Ok(job)
    }

    /// Removes the job and closes its pending applications.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let job = self.find(id).await?;
        ensure(Some(principal), Action::DeleteJob, Resource::OwnedBy(job.posted_by))?;

        let closed = self.store.close_pending_applications(job.id).await?;
        if closed > 0 {
            warn!("closed {} pending applications of deleted job {}", closed, job.id);
        }

        if !self.store.delete_job(job.id).await? {
            return Err(AppError::NotFound("Job not found".into()));
        }
        info!("job {} deleted by {}", job.id, principal.id);
        Ok(())
    }
}
