use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::job::Job;
use super::user::User;

/// Lifecycle of an application.
///
/// `pending` moves once, to `accepted` or `rejected`, by the job owner or an
/// admin. `closed` is reached only when the job is deleted while the
/// application is still pending. All three are terminal.
/// Corresponds to the `application_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Closed,
}

impl ApplicationStatus {
    /// Statuses a reviewer may choose.
    pub fn is_decision(self) -> bool {
        matches!(self, ApplicationStatus::Accepted | ApplicationStatus::Rejected)
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        self == ApplicationStatus::Pending && next.is_decision()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Closed => "closed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[sqlx(rename = "job_id")]
    pub job: Uuid,
    #[sqlx(rename = "applicant_id")]
    pub applicant: Uuid,
    /// URL of the stored resume, or the placeholder if the upload failed.
    pub resume: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(job: Uuid, applicant: Uuid, resume: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job,
            applicant,
            resume,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /applications/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

/// Response of a successful apply.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReceipt {
    pub success: bool,
    pub message: String,
    pub application_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobRef {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApplicantRef {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// An application joined with whatever job and applicant data the listing needs.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub resume: String,
    pub job: JobRef,
    pub applicant: ApplicantRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn new(application: Application, job: Option<&Job>, applicant: Option<&User>) -> Self {
        Self {
            id: application.id,
            status: application.status,
            resume: application.resume,
            job: JobRef {
                id: application.job,
                title: job.map(|j| j.title.clone()),
                company: job.map(|j| j.company.clone()),
                location: job.map(|j| j.location.clone()),
            },
            applicant: ApplicantRef {
                id: application.applicant,
                name: applicant.map(|u| u.name.clone()),
                email: applicant.map(|u| u.email.clone()),
            },
            created_at: application.created_at,
            updated_at: application.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_can_be_decided() {
        use ApplicationStatus::*;

        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Closed));

        for terminal in [Accepted, Rejected, Closed] {
            for next in [Pending, Accepted, Rejected, Closed] {
                assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
            }
        }
    }

    #[test]
    fn test_new_application_is_pending() {
        let application = Application::new(Uuid::new_v4(), Uuid::new_v4(), "/r.pdf".into());
        assert_eq!(application.status, ApplicationStatus::Pending);
    }

    #[test]
    fn test_view_without_job_keeps_reference() {
        let application = Application::new(Uuid::new_v4(), Uuid::new_v4(), "/r.pdf".into());
        let job_id = application.job;
        let view = ApplicationView::new(application, None, None);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["job"]["id"], job_id.to_string());
        assert!(json["job"].get("title").is_none());
        assert_eq!(json["status"], "pending");
    }
}
