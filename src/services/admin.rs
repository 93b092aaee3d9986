use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::{ApplicationStatus, JobStatus, JobType, Role, User};
use crate::policy::{ensure, Action, Resource};
use crate::store::Store;

const TOP_JOBS: u32 = 5;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total: u64,
    pub users: u64,
    pub recruiters: u64,
    pub admins: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStats {
    pub total: u64,
    pub open: u64,
    pub closed: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationStats {
    pub total: u64,
    pub pending: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub closed: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminStats {
    pub users: UserStats,
    pub jobs: JobStats,
    pub applications: ApplicationStats,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub job_type: JobType,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopJob {
    pub job_id: Uuid,
    /// `None` when the job has since been deleted.
    pub title: Option<String>,
    pub applications: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobAnalytics {
    pub by_type: Vec<TypeCount>,
    pub top_jobs: Vec<TopJob>,
}

pub struct AdminService {
    store: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn stats(&self, principal: &Principal) -> Result<AdminStats, AppError> {
        ensure(Some(principal), Action::ViewAdminStats, Resource::Unowned)?;
        let store = &self.store;

        Ok(AdminStats {
            users: UserStats {
                total: store.count_users(None).await?,
                users: store.count_users(Some(Role::User)).await?,
                recruiters: store.count_users(Some(Role::Recruiter)).await?,
                admins: store.count_users(Some(Role::Admin)).await?,
            },
            jobs: JobStats {
                total: store.count_jobs(None).await?,
                open: store.count_jobs(Some(JobStatus::Open)).await?,
                closed: store.count_jobs(Some(JobStatus::Closed)).await?,
            },
            applications: ApplicationStats {
                total: store.count_applications(None).await?,
                pending: store.count_applications(Some(ApplicationStatus::Pending)).await?,
                accepted: store.count_applications(Some(ApplicationStatus::Accepted)).await?,
                rejected: store.count_applications(Some(ApplicationStatus::Rejected)).await?,
                closed: store.count_applications(Some(ApplicationStatus::Closed)).await?,
            },
        })
    }

    pub async fn job_analytics(&self, principal: &Principal) -> Result<JobAnalytics, AppError> {
        ensure(Some(principal), Action::ViewAdminStats, Resource::Unowned)?;

        let mut by_type: Vec<TypeCount> = self
            .store
            .count_jobs_by_type()
            .await?
            .into_iter()
            .map(|(job_type, count)| TypeCount { job_type, count })
            .collect();
        by_type.sort_by(|a, b| b.count.cmp(&a.count));

        let top = self.store.top_jobs_by_applications(TOP_JOBS).await?;
        let ids: Vec<Uuid> = top.iter().map(|(id, _)| *id).collect();
        let titles: HashMap<Uuid, String> = self
            .store
            .jobs_by_ids(&ids)
            .await?
            .into_iter()
            .map(|job| (job.id, job.title))
            .collect();

        let top_jobs = top
            .into_iter()
            .map(|(job_id, applications)| TopJob {
                job_id,
                title: titles.get(&job_id).cloned(),
                applications,
            })
            .collect();

        Ok(JobAnalytics { by_type, top_jobs })
    }

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>, AppError> {
        ensure(Some(principal), Action::ManageUsers, Resource::Unowned)?;
        Ok(self.store.list_users().await?)
    }

    pub async fn delete_user(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        ensure(Some(principal), Action::ManageUsers, Resource::Unowned)?;
        if id == principal.id {
            return Err(AppError::Validation(
                "You cannot delete your own account".into(),
            ));
        }
        if !self.store.delete_user(id).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
        info!("user {} deleted by admin {}", id, principal.id);
        Ok(())
    }
}
