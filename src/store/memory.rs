use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    AlertStore, ApplicationStore, JobStore, StoreError, UserStore, DUPLICATE_APPLICATION,
    DUPLICATE_EMAIL,
};
use crate::models::{
    Application, ApplicationStatus, Job, JobAlert, JobFilter, JobStatus, JobType, Page, Role, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, Application>,
    alerts: HashMap<Uuid, JobAlert>,
}

/// Process-local store. Every check-then-write happens under one lock, so the
/// uniqueness and cap rules hold under concurrent requests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

/// Descending by creation time, then by id, matching `ORDER BY created_at DESC, id DESC`.
fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn user_by_reset_token(&self, digest: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.reset_password_token.as_deref() == Some(digest))
            .cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn toggle_saved_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut tables = self.lock()?;
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if let Some(pos) = user.saved_jobs.iter().position(|id| *id == job_id) {
            user.saved_jobs.remove(pos);
        } else {
            user.saved_jobs.push(job_id);
        }
        Ok(user.saved_jobs.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users: Vec<User> = self.lock()?.users.values().cloned().collect();
        Ok(newest_first(users, |u: &User| (u.created_at, u.id)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.users.remove(&id).is_some())
    }

    async fn count_users(&self, role: Option<Role>) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .count() as u64)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        self.lock()?.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn jobs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.jobs.get(id).cloned()).collect())
    }

    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tables.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.jobs.remove(&id).is_some())
    }

    async fn search_jobs(
        &self,
        filter: &JobFilter,
        page: Page,
    ) -> Result<(Vec<Job>, u64), StoreError> {
        let matching: Vec<Job> = self
            .lock()?
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let jobs = newest_first(matching, |j: &Job| (j.created_at, j.id))
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((jobs, total))
    }

    async fn jobs_by_owner(&self, owner: Uuid) -> Result<Vec<Job>, StoreError> {
        let jobs: Vec<Job> = self
            .lock()?
            .jobs
            .values()
            .filter(|j| j.posted_by == owner)
            .cloned()
            .collect();
        Ok(newest_first(jobs, |j: &Job| (j.created_at, j.id)))
    }

    async fn count_jobs(&self, status: Option<JobStatus>) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .jobs
            .values()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .count() as u64)
    }

    async fn count_jobs_by_type(&self) -> Result<Vec<(JobType, u64)>, StoreError> {
        let tables = self.lock()?;
        let mut counts: HashMap<JobType, u64> = HashMap::new();
        for job in tables.jobs.values() {
            *counts.entry(job.job_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let duplicate = tables
            .applications
            .values()
            .any(|a| a.job == application.job && a.applicant == application.applicant);
        if duplicate {
            return Err(StoreError::Conflict(DUPLICATE_APPLICATION.into()));
        }
        tables.applications.insert(application.id, application.clone());
        Ok(application)
    }

    async fn application_by_id(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    async fn application_for(
        &self,
        job: Uuid,
        applicant: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|a| a.job == job && a.applicant == applicant)
            .cloned())
    }

    async fn applications_by_applicant(
        &self,
        applicant: Uuid,
    ) -> Result<Vec<Application>, StoreError> {
        let applications: Vec<Application> = self
            .lock()?
            .applications
            .values()
            .filter(|a| a.applicant == applicant)
            .cloned()
            .collect();
        Ok(newest_first(applications, |a: &Application| (a.created_at, a.id)))
    }

    async fn applications_by_jobs(&self, jobs: &[Uuid]) -> Result<Vec<Application>, StoreError> {
        let applications: Vec<Application> = self
            .lock()?
            .applications
            .values()
            .filter(|a| jobs.contains(&a.job))
            .cloned()
            .collect();
        Ok(newest_first(applications, |a: &Application| (a.created_at, a.id)))
    }

    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let application = tables.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        if application.status != from {
            return Err(StoreError::Conflict(format!(
                "Application is already {}",
                application.status
            )));
        }
        application.status = to;
        application.updated_at = chrono::Utc::now();
        Ok(application.clone())
    }

    async fn close_pending_applications(&self, job: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let now = chrono::Utc::now();
        let mut closed = 0;
        for application in tables.applications.values_mut() {
            if application.job == job && application.status == ApplicationStatus::Pending {
                application.status = ApplicationStatus::Closed;
                application.updated_at = now;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn count_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<u64, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .count() as u64)
    }

    async fn top_jobs_by_applications(&self, limit: u32) -> Result<Vec<(Uuid, u64)>, StoreError> {
        let tables = self.lock()?;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for application in tables.applications.values() {
            *counts.entry(application.job).or_default() += 1;
        }
        let mut ranked: Vec<(Uuid, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert_capped(&self, alert: JobAlert, cap: u64) -> Result<JobAlert, StoreError> {
        let mut tables = self.lock()?;
        let owned = tables.alerts.values().filter(|a| a.user == alert.user).count() as u64;
        if owned >= cap {
            return Err(StoreError::LimitExceeded(format!(
                "You can only have up to {} job alerts",
                cap
            )));
        }
        tables.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn alerts_by_user(&self, user: Uuid) -> Result<Vec<JobAlert>, StoreError> {
        let alerts: Vec<JobAlert> = self
            .lock()?
            .alerts
            .values()
            .filter(|a| a.user == user)
            .cloned()
            .collect();
        Ok(newest_first(alerts, |a: &JobAlert| (a.created_at, a.id)))
    }

    async fn alert_by_id(&self, id: Uuid) -> Result<Option<JobAlert>, StoreError> {
        Ok(self.lock()?.alerts.get(&id).cloned())
    }

    async fn delete_alert(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.alerts.remove(&id).is_some())
    }
}
