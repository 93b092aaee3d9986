use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::files::{put_or_placeholder, FileStore, Upload};
use crate::models::{
    Application, ApplicationStatus, ApplicationView, ApplyReceipt, Job, JobStatus, User,
};
use crate::notify::{Notification, Notifications};
use crate::policy::{ensure, Action, Resource};
use crate::store::Store;

pub struct ApplicationService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
    notifications: Notifications,
    upload_timeout: Duration,
}

impl ApplicationService {
    pub fn new(
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        notifications: Notifications,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            store,
            files,
            notifications,
            upload_timeout,
        }
    }

    async fn find_job(&self, id: Uuid) -> Result<Job, AppError> {
        self.store
            .job_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Job not found".into()))
    }

    /// Submits an application for an open job.
    ///
    /// The resume comes from `resume` when given, otherwise from the
    /// applicant's profile. A failing or slow file store yields the placeholder
    /// URL instead of an error.
    pub async fn apply(
        &self,
        principal: &Principal,
        job_id: Uuid,
        resume: Option<Upload>,
    ) -> Result<ApplyReceipt, AppError> {
        ensure(Some(principal), Action::Apply, Resource::Unowned)?;

        let applicant = self
            .store
            .user_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User no longer exists".into()))?;

        let job = self.find_job(job_id).await?;
        if job.status != JobStatus::Open {
            return Err(AppError::NotFound("Job not found".into()));
        }

        // Fast path for a friendlier error; the store's unique pair is what holds.
        if self.store.application_for(job.id, applicant.id).await?.is_some() {
            return Err(AppError::Conflict(
                "You have already applied for this job".into(),
            ));
        }

        let resume_url = match (resume, applicant.resume.as_ref()) {
            (Some(upload), _) => {
                put_or_placeholder(self.files.as_ref(), &upload, self.upload_timeout).await
            }
            (None, Some(url)) => url.clone(),
            (None, None) => return Err(AppError::Validation("Please upload a resume".into())),
        };

        let application = self
            .store
            .insert_application(Application::new(job.id, applicant.id, resume_url))
            .await?;
        info!(
            "application {} submitted by {} for job {}",
            application.id, applicant.id, job.id
        );

        self.notifications
            .enqueue(Notification::application_received(&applicant, &job));
        match self.store.user_by_id(job.posted_by).await {
            Ok(Some(owner)) => self
                .notifications
                .enqueue(Notification::new_applicant(&owner, &applicant, &job)),
            Ok(None) => {}
            Err(e) => warn!("could not look up owner of job {}: {}", job.id, e),
        }

        Ok(ApplyReceipt {
            success: true,
            message: "Application submitted successfully".to_string(),
            application_id: application.id,
        })
    }

    /// The principal's own applications with job title, company and location.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<ApplicationView>, AppError> {
        ensure(Some(principal), Action::ListOwnApplications, Resource::Unowned)?;

        let applications = self.store.applications_by_applicant(principal.id).await?;
        let job_ids: Vec<Uuid> = applications.iter().map(|a| a.job).collect();
        let jobs = by_id(self.store.jobs_by_ids(&job_ids).await?, |job| job.id);

        Ok(applications
            .into_iter()
            .map(|application| {
                let job = jobs.get(&application.job);
                ApplicationView::new(application, job, None)
            })
            .collect())
    }

    pub async fn list_for_job(
        &self,
        principal: &Principal,
        job_id: Uuid,
    ) -> Result<Vec<ApplicationView>, AppError> {
        let job = self.find_job(job_id).await?;
        ensure(
            Some(principal),
            Action::ListJobApplications,
            Resource::OwnedBy(job.posted_by),
        )?;

        let applications = self.store.applications_by_jobs(&[job.id]).await?;
        let applicants = self.applicants_of(&applications).await?;

        Ok(applications
            .into_iter()
            .map(|application| {
                let applicant = applicants.get(&application.applicant);
                ApplicationView::new(application, Some(&job), applicant)
            })
            .collect())
    }

    /// Every application to any job the principal posted.
    pub async fn list_for_recruiter(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ApplicationView>, AppError> {
        ensure(Some(principal), Action::ListRecruiterApplicants, Resource::Unowned)?;

        let jobs = self.store.jobs_by_owner(principal.id).await?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let job_ids: Vec<Uuid> = jobs.iter().map(|job| job.id).collect();
        let jobs = by_id(jobs, |job| job.id);

        let applications = self.store.applications_by_jobs(&job_ids).await?;
        let applicants = self.applicants_of(&applications).await?;

        Ok(applications
            .into_iter()
            .map(|application| {
                let job = jobs.get(&application.job);
                let applicant = applicants.get(&application.applicant);
                ApplicationView::new(application, job, applicant)
            })
            .collect())
    }

    /// Accepts or rejects a pending application.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, AppError> {
        let application = self
            .store
            .application_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".into()))?;

        // A vanished job leaves the application to admins.
        let job = self.store.job_by_id(application.job).await?;
        let resource = job
            .as_ref()
            .map_or(Resource::Unowned, |job| Resource::OwnedBy(job.posted_by));
        ensure(Some(principal), Action::DecideApplication, resource)?;

        if !status.is_decision() {
            return Err(AppError::Validation(
                "Status must be either accepted or rejected".into(),
            ));
        }
        if !application.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Application is already {}",
                application.status
            )));
        }

        let updated = self
            .store
            .transition_application(id, ApplicationStatus::Pending, status)
            .await?;
        info!("application {} {} by {}", updated.id, status, principal.id);

        match self.store.user_by_id(updated.applicant).await {
            Ok(Some(applicant)) => {
                let title = job.as_ref().map_or("your application", |job| job.title.as_str());
                self.notifications
                    .enqueue(Notification::decision(&applicant, title, status));
            }
            Ok(None) => {}
            Err(e) => warn!("could not look up applicant {}: {}", updated.applicant, e),
        }

        Ok(updated)
    }

    async fn applicants_of(
        &self,
        applications: &[Application],
    ) -> Result<HashMap<Uuid, User>, AppError> {
        let mut ids: Vec<Uuid> = applications.iter().map(|a| a.applicant).collect();
        ids.sort();
        ids.dedup();
        Ok(by_id(self.store.users_by_ids(&ids).await?, |user| user.id))
    }
}

fn by_id<T>(items: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{MemoryFileStore, PLACEHOLDER_RESUME_URL};
    use crate::models::Role;
    use crate::notify::MemoryMailer;
    use crate::services::fixtures::job;
    use crate::store::{ApplicationStore, JobStore, MemoryStore, UserStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<MemoryMailer>,
        service: ApplicationService,
    }

    fn fixture(files: MemoryFileStore) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let service = ApplicationService::new(
            store.clone(),
            Arc::new(files),
            Notifications::start(mailer.clone()),
            Duration::from_millis(100),
        );
        Fixture {
            store,
            mailer,
            service,
        }
    }

    async fn user(store: &MemoryStore, email: &str, role: Role) -> Principal {
        let user = store
            .insert_user(User::new("Test".into(), email, "h".into(), role))
            .await
            .unwrap();
        Principal {
            id: user.id,
            role: user.role,
        }
    }

    fn resume() -> Option<Upload> {
        Some(Upload {
            filename: "cv.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: b"%PDF".to_vec(),
        })
    }

    #[actix_rt::test]
    async fn test_apply_then_decide() {
        let f = fixture(MemoryFileStore::new());
        let recruiter = user(&f.store, "r@example.com", Role::Recruiter).await;
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let job = f.store.insert_job(job(recruiter.id, "Backend Specialist")).await.unwrap();

        let receipt = f.service.apply(&candidate, job.id, resume()).await.unwrap();
        assert!(receipt.success);

        let listed = f.service.list_for_job(&recruiter, job.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, receipt.application_id);
        assert_eq!(listed[0].applicant.email.as_deref(), Some("c@example.com"));

        let decided = f
            .service
            .update_status(&recruiter, receipt.application_id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(decided.status, ApplicationStatus::Accepted);

        let mine = f.service.list_mine(&candidate).await.unwrap();
        assert_eq!(mine[0].status, ApplicationStatus::Accepted);
        assert_eq!(mine[0].job.title.as_deref(), Some("Backend Specialist"));

        let sent = f.mailer.wait_for(3, Duration::from_secs(2)).await;
        let subjects: Vec<&str> = sent.iter().map(|n| n.subject.as_str()).collect();
        assert!(subjects.contains(&"Application received"));
        assert!(subjects.contains(&"New application for Backend Specialist"));
        assert!(subjects.contains(&"Application accepted"));
    }

    #[actix_rt::test]
    async fn test_second_apply_conflicts() {
        let f = fixture(MemoryFileStore::new());
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let job = f.store.insert_job(job(Uuid::new_v4(), "Backend")).await.unwrap();

        f.service.apply(&candidate, job.id, resume()).await.unwrap();
        let again = f.service.apply(&candidate, job.id, resume()).await;

        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(f.store.applications_by_applicant(candidate.id).await.unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_apply_rules() {
        let f = fixture(MemoryFileStore::new());
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let recruiter = user(&f.store, "r@example.com", Role::Recruiter).await;
        let open = f.store.insert_job(job(recruiter.id, "Open")).await.unwrap();
        let mut closed = job(recruiter.id, "Closed");
        closed.status = JobStatus::Closed;
        let closed = f.store.insert_job(closed).await.unwrap();

        assert!(matches!(
            f.service.apply(&recruiter, open.id, resume()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.apply(&candidate, Uuid::new_v4(), resume()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.apply(&candidate, closed.id, resume()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.apply(&candidate, open.id, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[actix_rt::test]
    async fn test_apply_falls_back_to_profile_resume() {
        let f = fixture(MemoryFileStore::new());
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let mut profile = f.store.user_by_id(candidate.id).await.unwrap().unwrap();
        profile.resume = Some("https://cdn.example.com/cv.pdf".into());
        f.store.save_user(&profile).await.unwrap();
        let job = f.store.insert_job(job(Uuid::new_v4(), "Backend")).await.unwrap();

        let receipt = f.service.apply(&candidate, job.id, None).await.unwrap();
        let application = f
            .store
            .application_by_id(receipt.application_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(application.resume, "https://cdn.example.com/cv.pdf");
    }

    #[actix_rt::test]
    async fn test_apply_survives_a_broken_file_store() {
        let f = fixture(MemoryFileStore::failing());
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let job = f.store.insert_job(job(Uuid::new_v4(), "Backend")).await.unwrap();

        let receipt = f.service.apply(&candidate, job.id, resume()).await.unwrap();
        let application = f
            .store
            .application_by_id(receipt.application_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(application.resume, PLACEHOLDER_RESUME_URL);
        assert_eq!(application.status, ApplicationStatus::Pending);
    }

    #[actix_rt::test]
    async fn test_status_update_rules() {
        let f = fixture(MemoryFileStore::new());
        let owner = user(&f.store, "r@example.com", Role::Recruiter).await;
        let other = user(&f.store, "o@example.com", Role::Recruiter).await;
        let admin = user(&f.store, "a@example.com", Role::Admin).await;
        let candidate = user(&f.store, "c@example.com", Role::User).await;
        let job = f.store.insert_job(job(owner.id, "Backend")).await.unwrap();
        let receipt = f.service.apply(&candidate, job.id, resume()).await.unwrap();
        let id = receipt.application_id;

        assert!(matches!(
            f.service.update_status(&other, id, ApplicationStatus::Accepted).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.update_status(&owner, id, ApplicationStatus::Pending).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.service.update_status(&owner, Uuid::new_v4(), ApplicationStatus::Accepted).await,
            Err(AppError::NotFound(_))
        ));

        f.service
            .update_status(&admin, id, ApplicationStatus::Rejected)
            .await
            .unwrap();
        assert!(matches!(
            f.service.update_status(&owner, id, ApplicationStatus::Accepted).await,
            Err(AppError::Conflict(msg)) if msg.contains("rejected")
        ));
    }

    #[actix_rt::test]
    async fn test_recruiter_without_jobs_sees_nothing() {
        let f = fixture(MemoryFileStore::new());
        let recruiter = user(&f.store, "r@example.com", Role::Recruiter).await;
        assert!(f.service.list_for_recruiter(&recruiter).await.unwrap().is_empty());
    }
}
