use std::sync::Arc;

use uuid::Uuid;

use super::attach_owners;
use crate::auth::Principal;
use crate::error::AppError;
use crate::models::JobWithOwner;
use crate::policy::{ensure, Action, Resource};
use crate::store::Store;

/// Per-user bookmarks. Always scoped to the principal.
pub struct SavedJobService {
    store: Arc<dyn Store>,
}

impl SavedJobService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Adds the job to the saved set, or removes it if already there.
    /// The job id is not checked against existing jobs.
    pub async fn toggle(&self, principal: &Principal, job_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        ensure(Some(principal), Action::ManageSavedJobs, Resource::Unowned)?;
        Ok(self.store.toggle_saved_job(principal.id, job_id).await?)
    }

    /// Saved jobs that still exist, with their owners.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<JobWithOwner>, AppError> {
        ensure(Some(principal), Action::ManageSavedJobs, Resource::Unowned)?;

        let user = self
            .store
            .user_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        let jobs = self.store.jobs_by_ids(&user.saved_jobs).await?;
        attach_owners(self.store.as_ref(), jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::services::fixtures::job;
    use crate::store::{JobStore, MemoryStore, UserStore};
    use pretty_assertions::assert_eq;

    #[actix_rt::test]
    async fn test_toggle_is_its_own_inverse() {
        let store = Arc::new(MemoryStore::new());
        let service = SavedJobService::new(store.clone());
        let user = store
            .insert_user(User::new("Sam".into(), "sam@example.com", "h".into(), Role::User))
            .await
            .unwrap();
        let principal = Principal {
            id: user.id,
            role: user.role,
        };
        let kept = Uuid::new_v4();
        let toggled = Uuid::new_v4();

        service.toggle(&principal, kept).await.unwrap();
        let before = store.user_by_id(user.id).await.unwrap().unwrap().saved_jobs;

        let added = service.toggle(&principal, toggled).await.unwrap();
        assert_eq!(added, vec![kept, toggled]);
        let removed = service.toggle(&principal, toggled).await.unwrap();
        assert_eq!(removed, before);
    }

    #[actix_rt::test]
    async fn test_list_skips_deleted_jobs() {
        let store = Arc::new(MemoryStore::new());
        let service = SavedJobService::new(store.clone());
        let user = store
            .insert_user(User::new("Sam".into(), "sam@example.com", "h".into(), Role::User))
            .await
            .unwrap();
        let principal = Principal {
            id: user.id,
            role: user.role,
        };
        let live = store.insert_job(job(Uuid::new_v4(), "Live")).await.unwrap();
        let gone = store.insert_job(job(Uuid::new_v4(), "Gone")).await.unwrap();

        service.toggle(&principal, live.id).await.unwrap();
        service.toggle(&principal, gone.id).await.unwrap();
        store.delete_job(gone.id).await.unwrap();

        let saved = service.list(&principal).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].job.id, live.id);
        assert!(saved[0].owner.is_none());
    }
}
