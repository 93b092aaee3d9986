//! Business operations. Each service owns the store handle and whatever
//! collaborators its operations need; handlers stay thin.

pub mod accounts;
pub mod admin;
pub mod alerts;
pub mod applications;
pub mod jobs;
pub mod saved;

pub use accounts::{AccountService, ProfileUpdate};
pub use admin::{AdminService, AdminStats, JobAnalytics};
pub use alerts::AlertService;
pub use applications::ApplicationService;
pub use jobs::JobService;
pub use saved::SavedJobService;

use std::collections::HashMap;

use crate::error::AppError;
use crate::models::{Job, JobWithOwner};
use crate::store::Store;

/// Joins each job with the summary of its owner, preserving order.
pub(crate) async fn attach_owners(
    store: &dyn Store,
    jobs: Vec<Job>,
) -> Result<Vec<JobWithOwner>, AppError> {
    let mut owner_ids: Vec<_> = jobs.iter().map(|job| job.posted_by).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let owners: HashMap<_, _> = store
        .users_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user.summary()))
        .collect();

    Ok(jobs
        .into_iter()
        .map(|job| {
            let owner = owners.get(&job.posted_by).cloned();
            JobWithOwner { job, owner }
        })
        .collect())
}
