use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::files::FileStore;
use crate::notify::{Mailer, Notifications};
use crate::services::{
    AccountService, AdminService, AlertService, ApplicationService, JobService, SavedJobService,
};
use crate::store::Store;

/// Shared application state handed to every handler through `web::Data`.
pub struct AppState {
    pub tokens: TokenKeys,
    /// Read by `AuthMiddleware` to resolve token subjects.
    pub store: Arc<dyn Store>,
    pub accounts: AccountService,
    pub jobs: JobService,
    pub applications: ApplicationService,
    pub saved: SavedJobService,
    pub alerts: AlertService,
    pub admin: AdminService,
}

impl AppState {
    /// Wires the services. Must run inside a tokio runtime, because the
    /// notification worker is spawned here.
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenKeys::new(&config.jwt_secret, config.jwt_ttl_hours);
        let notifications = Notifications::start(mailer);

        Self {
            accounts: AccountService::new(
                config,
                store.clone(),
                files.clone(),
                notifications.clone(),
                tokens.clone(),
            ),
            jobs: JobService::new(store.clone()),
            applications: ApplicationService::new(
                store.clone(),
                files,
                notifications,
                config.upload_timeout,
            ),
            saved: SavedJobService::new(store.clone()),
            alerts: AlertService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
            tokens,
        }
    }
}
