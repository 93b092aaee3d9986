use std::sync::Arc;

use log::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::{AlertInput, JobAlert, MAX_ALERTS_PER_USER};
use crate::policy::{ensure, Action, Resource};
use crate::store::Store;

pub struct AlertService {
    store: Arc<dyn Store>,
}

impl AlertService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fails `LimitExceeded` once the principal owns `MAX_ALERTS_PER_USER` alerts.
    pub async fn create(&self, principal: &Principal, input: AlertInput) -> Result<JobAlert, AppError> {
        ensure(Some(principal), Action::ManageAlerts, Resource::Unowned)?;
        let input = input.trimmed();
        input.validate()?;

        let alert = self
            .store
            .insert_alert_capped(JobAlert::new(input, principal.id), MAX_ALERTS_PER_USER)
            .await?;
        info!("alert {} created for {}", alert.id, principal.id);
        Ok(alert)
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<JobAlert>, AppError> {
        ensure(Some(principal), Action::ManageAlerts, Resource::Unowned)?;
        Ok(self.store.alerts_by_user(principal.id).await?)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let alert = self
            .store
            .alert_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Alert not found".into()))?;
        ensure(Some(principal), Action::DeleteAlert, Resource::OwnedBy(alert.user))?;

        self.store.delete_alert(alert.id).await?;
        Ok(())
    }
}
