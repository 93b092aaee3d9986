use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    hash_password, verify_password, AuthResponse, ForgotPasswordRequest, LoginRequest, Principal,
    RegisterRequest, ResetPasswordRequest, TokenKeys,
};
use crate::config::Config;
use crate::error::AppError;
use crate::files::{put_with_timeout, FileStore, Upload};
use crate::models::{ProfileChanges, Role, User};
use crate::notify::{Notification, Notifications};
use crate::policy::{ensure, Action, Resource};
use crate::store::{Store, StoreError};

/// A profile update: text changes plus optional replacement files.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub changes: ProfileChanges,
    pub avatar: Option<Upload>,
    pub resume: Option<Upload>,
}

pub struct AccountService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
    notifications: Notifications,
    tokens: TokenKeys,
    bcrypt_cost: u32,
    reset_ttl: chrono::Duration,
    client_url: String,
    upload_timeout: Duration,
}

/// Hex SHA-256 of a reset token. Only the digest is persisted.
fn digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated("Invalid email or password".into())
}

impl AccountService {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        notifications: Notifications,
        tokens: TokenKeys,
    ) -> Self {
        Self {
            store,
            files,
            notifications,
            tokens,
            bcrypt_cost: config.bcrypt_cost,
            reset_ttl: chrono::Duration::minutes(config.reset_token_ttl_minutes),
            client_url: config.client_url.trim_end_matches('/').to_string(),
            upload_timeout: config.upload_timeout,
        }
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AppError> {
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(AuthResponse::new(user, token))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let role = request.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AppError::Validation(
                "The admin role cannot be self-assigned".into(),
            ));
        }
        let (name, email, password) = match (request.name, request.email, request.password) {
            (Some(name), Some(email), Some(password)) => (name, email, password),
            _ => {
                return Err(AppError::Validation(
                    "Please provide name, email and password".into(),
                ))
            }
        };

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(&password, self.bcrypt_cost)?;
        let user = User::new(name.trim().to_string(), &email, password_hash, role);
        let user = match self.store.insert_user(user).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(AppError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };

        info!("registered {} as {}", user.id, user.role);
        self.respond(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let user = self
            .store
            .user_by_email(&request.email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(invalid_credentials());
        }
        self.respond(&user)
    }

    /// Issues a reset token and mails a link carrying it. Returns the message
    /// shown to the caller.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<String, AppError> {
        request.validate()?;

        let mut user = self
            .store
            .user_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::NotFound("There is no user with that email".into()))?;

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        user.reset_password_token = Some(digest(&token));
        user.reset_password_expire = Some(Utc::now() + self.reset_ttl);
        user.updated_at = Utc::now();
        self.store.save_user(&user).await?;

        let reset_url = format!("{}/reset-password/{}", self.client_url, token);
        self.notifications.enqueue(Notification::password_reset(
            &user,
            &reset_url,
            self.reset_ttl.num_minutes(),
        ));
        info!("password reset requested for {}", user.id);

        Ok("Password reset email sent".to_string())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        request: ResetPasswordRequest,
    ) -> Result<AuthResponse, AppError> {
        request.validate()?;
        let invalid = || AppError::Validation("Invalid or expired reset token".into());

        let mut user = self
            .store
            .user_by_reset_token(&digest(token))
            .await?
            .ok_or_else(invalid)?;
        match user.reset_password_expire {
            Some(expire) if expire > Utc::now() => {}
            _ => return Err(invalid()),
        }

        user.password_hash = hash_password(&request.password, self.bcrypt_cost)?;
        user.reset_password_token = None;
        user.reset_password_expire = None;
        user.updated_at = Utc::now();
        self.store.save_user(&user).await?;

        info!("password reset completed for {}", user.id);
        self.respond(&user)
    }

    pub async fn profile(&self, principal: &Principal) -> Result<User, AppError> {
        ensure(Some(principal), Action::ManageProfile, Resource::Unowned)?;
        self.store
            .user_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Applies text changes and stores any new files. A file that cannot be
    /// stored leaves the previous URL in place.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<User, AppError> {
        let mut user = self.profile(principal).await?;
        update.changes.apply_to(&mut user);

        if let Some(avatar) = update.avatar {
            if let Some(url) = self.store_file("avatars", &avatar).await {
                user.avatar = Some(url);
            }
        }
        if let Some(resume) = update.resume {
            if let Some(url) = self.store_file("resumes", &resume).await {
                user.resume = Some(url);
            }
        }

        user.updated_at = Utc::now();
        self.store.save_user(&user).await?;
        Ok(user)
    }

    async fn store_file(&self, folder: &str, upload: &Upload) -> Option<String> {
        match put_with_timeout(self.files.as_ref(), folder, upload, self.upload_timeout).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("keeping previous {} file, upload failed: {}", folder, e);
                None
            }
        }
    }
}
