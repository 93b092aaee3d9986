use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Maximum number of saved searches per user.
pub const MAX_ALERTS_PER_USER: u64 = 5;

/// Corresponds to the `alert_frequency` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    Daily,
    Weekly,
}

impl Default for AlertFrequency {
    fn default() -> Self {
        AlertFrequency::Daily
    }
}

/// A saved search a user wants to be told about.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobAlert {
    pub id: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    pub keywords: String,
    pub location: Option<String>,
    pub frequency: AlertFrequency,
    pub last_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct AlertInput {
    #[validate(required(message = "keywords are required"), length(min = 1, max = 200))]
    pub keywords: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub frequency: Option<AlertFrequency>,
}

impl AlertInput {
    /// Trims the text fields so blank keywords fail `length(min = 1)`.
    pub fn trimmed(self) -> Self {
        Self {
            keywords: self.keywords.map(|k| k.trim().to_string()),
            location: self.location.map(|l| l.trim().to_string()),
            frequency: self.frequency,
        }
    }
}

impl JobAlert {
    /// Builds an alert owned by `user`. Call `validate` on the input first.
    pub fn new(input: AlertInput, user: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            keywords: input.keywords.unwrap_or_default().trim().to_string(),
            location: input
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            frequency: input.frequency.unwrap_or_default(),
            last_sent: None,
            created_at: Utc::now(),
        }
    }
}
