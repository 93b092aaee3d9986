//! Best-effort email notifications.
//!
//! Services call `Notifications::enqueue`, which hands the message to a
//! background worker and returns immediately. Delivery failures are logged by
//! the worker and never reach the request that caused them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::models::{ApplicationStatus, Job, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn application_received(applicant: &User, job: &Job) -> Self {
        Self {
            to: applicant.email.clone(),
            subject: "Application received".to_string(),
            body: format!(
                "Hi {},\n\nWe received your application for {} at {}. \
                 The recruiter will review it and you will hear from us once a decision is made.",
                applicant.name, job.title, job.company
            ),
        }
    }

    pub fn new_applicant(owner: &User, applicant: &User, job: &Job) -> Self {
        Self {
            to: owner.email.clone(),
            subject: format!("New application for {}", job.title),
            body: format!(
                "Hi {},\n\n{} ({}) applied for {}.",
                owner.name, applicant.name, applicant.email, job.title
            ),
        }
    }

    pub fn decision(applicant: &User, job_title: &str, status: ApplicationStatus) -> Self {
        Self {
            to: applicant.email.clone(),
            subject: format!("Application {}", status),
            body: format!(
                "Hi {},\n\nYour application for {} has been {}.",
                applicant.name, job_title, status
            ),
        }
    }

    pub fn password_reset(user: &User, reset_url: &str, ttl_minutes: i64) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Password reset".to_string(),
            body: format!(
                "Hi {},\n\nYou asked to reset your password. Open the link below within {} minutes:\n\n{}\n\n\
                 If you did not ask for this, ignore this email.",
                user.name, ttl_minutes, reset_url
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("notification worker has stopped")]
    WorkerGone,
}

/// Delivers one message. Implementations may be slow or fail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "mail to {} [{}]: {}",
            notification.to, notification.subject, notification.body
        );
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Polls until at least `count` messages arrived or `timeout` elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("mailbox poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Handle to the notification worker. Cheap to clone.
#[derive(Clone)]
pub struct Notifications {
    sender: UnboundedSender<Notification>,
}

impl Notifications {
    /// Spawns the delivery worker on the current tokio runtime.
    pub fn start(mailer: Arc<dyn Mailer>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Notification>();

        tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                if let Err(e) = mailer.send(&notification).await {
                    error!(
                        "failed to deliver \"{}\" to {}: {}",
                        notification.subject, notification.to, e
                    );
                }
            }
        });

        Self { sender }
    }

    /// Queues a message without waiting for delivery.
    pub fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            error!("{}: dropping \"{}\"", NotifyError::WorkerGone, e.0.subject);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobInput, Role};
    use uuid::Uuid;

    struct BrokenMailer;

    #[async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("smtp unreachable".into()))
        }
    }

    fn job() -> Job {
        Job::new(
            JobInput {
                title: Some("Backend Specialist".into()),
                company: Some("Initech".into()),
                description: Some("d".into()),
                location: Some("Remote".into()),
                salary: Some(1.0),
                experience: Some("senior".into()),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .unwrap()
    }

    #[actix_rt::test]
    async fn test_enqueued_messages_are_delivered() {
        let mailer = Arc::new(MemoryMailer::new());
        let notifications = Notifications::start(mailer.clone());
        let applicant = User::new("Cleo".into(), "cleo@example.com", "h".into(), Role::User);

        notifications.enqueue(Notification::application_received(&applicant, &job()));

        let sent = mailer.wait_for(1, Duration::from_secs(2)).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "cleo@example.com");
        assert!(sent[0].body.contains("Backend Specialist"));
    }

    #[actix_rt::test]
    async fn test_failed_delivery_does_not_stop_the_worker() {
        let notifications = Notifications::start(Arc::new(BrokenMailer));
        let applicant = User::new("Cleo".into(), "cleo@example.com", "h".into(), Role::User);

        notifications.enqueue(Notification::decision(
            &applicant,
            "Backend Specialist",
            ApplicationStatus::Rejected,
        ));
        notifications.enqueue(Notification::decision(
            &applicant,
            "Backend Specialist",
            ApplicationStatus::Accepted,
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!notifications.sender.is_closed());
    }

    #[test]
    fn test_decision_subject() {
        let applicant = User::new("Cleo".into(), "cleo@example.com", "h".into(), Role::User);
        let notification =
            Notification::decision(&applicant, "Backend Specialist", ApplicationStatus::Accepted);
        assert_eq!(notification.subject, "Application accepted");
    }
}
