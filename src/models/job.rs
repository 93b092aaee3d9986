use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::user::UserSummary;
use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Employment type of a posting.
/// Corresponds to the `job_type` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Internship,
    Contract,
}

impl Default for JobType {
    fn default() -> Self {
        JobType::FullTime
    }
}

/// Corresponds to the `job_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
}

/// A job posting as stored and returned by the API.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: String,
    pub salary: f64,
    pub skills: Vec<String>,
    pub job_type: JobType,
    pub experience: String,
    pub status: JobStatus,
    /// Owning user. Never changes after creation.
    pub posted_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a job.
///
/// Fields are optional at the serde level so that a missing field is reported
/// as a validation failure rather than a deserialization error.
#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    #[validate(required(message = "title is required"), length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(required(message = "company is required"), length(min = 1, max = 200))]
    pub company: Option<String>,
    #[validate(
        required(message = "description is required"),
        length(min = 1, max = 20000)
    )]
    pub description: Option<String>,
    #[validate(required(message = "location is required"), length(min = 1, max = 200))]
    pub location: Option<String>,
    #[validate(required(message = "salary is required"), range(min = 0.0))]
    pub salary: Option<f64>,
    #[validate(required(message = "experience is required"), length(min = 1, max = 200))]
    pub experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub job_type: Option<JobType>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

impl Job {
    /// Builds an open job owned by `posted_by`. Call `validate` on the input first.
    pub fn new(input: JobInput, posted_by: Uuid) -> Result<Self, AppError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: required(input.title, "title")?,
            company: required(input.company, "company")?,
            description: required(input.description, "description")?,
            location: required(input.location, "location")?,
            salary: required(input.salary, "salary")?,
            skills: input.skills.unwrap_or_default(),
            job_type: input.job_type.unwrap_or_default(),
            experience: required(input.experience, "experience")?,
            status: JobStatus::Open,
            posted_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges the present fields of `patch`; `posted_by` is not patchable.
    pub fn apply_patch(&mut self, patch: JobPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(salary) = patch.salary {
            self.salary = salary;
        }
        if let Some(skills) = patch.skills {
            self.skills = skills;
        }
        if let Some(job_type) = patch.job_type {
            self.job_type = job_type;
        }
        if let Some(experience) = patch.experience {
            self.experience = experience;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a job. Unknown fields, including `postedBy`, are ignored.
#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 0.0))]
    pub salary: Option<f64>,
    pub skills: Option<Vec<String>>,
    pub job_type: Option<JobType>,
    #[validate(length(min = 1, max = 200))]
    pub experience: Option<String>,
    pub status: Option<JobStatus>,
}

/// Query string accepted by the public job listing.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub min_salary: Option<f64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl JobQuery {
    pub fn into_parts(self) -> (JobFilter, Page) {
        let page = Page::new(self.page, self.limit);
        let filter = JobFilter {
            keyword: non_blank(self.search),
            location: non_blank(self.location),
            job_type: self.job_type,
            min_salary: self.min_salary,
        };
        (filter, page)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Search criteria for open jobs. Closed jobs never match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    /// Case-insensitive substring of the title or the company.
    pub keyword: Option<String>,
    /// Exact location.
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    /// Inclusive lower bound on salary.
    pub min_salary: Option<f64>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if job.status != JobStatus::Open {
            return false;
        }
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            if !job.title.to_lowercase().contains(&keyword)
                && !job.company.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if &job.location != location {
                return false;
            }
        }
        if let Some(job_type) = self.job_type {
            if job.job_type != job_type {
                return false;
            }
        }
        if let Some(min_salary) = self.min_salary {
            if job.salary < min_salary {
                return false;
            }
        }
        true
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: Option<u32>, size: Option<u32>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    /// `ceil(total / size)`.
    pub fn count(&self, total: u64) -> u64 {
        let size = u64::from(self.size);
        (total + size - 1) / size
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

/// A job together with the summary of its owner (absent if the owner is gone).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobWithOwner {
    #[serde(flatten)]
    pub job: Job,
    pub owner: Option<UserSummary>,
}

/// One page of the public listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<JobWithOwner>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}
