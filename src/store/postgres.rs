use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    AlertStore, ApplicationStore, JobStore, StoreError, UserStore, DUPLICATE_APPLICATION,
    DUPLICATE_EMAIL,
};
use crate::models::{
    Application, ApplicationStatus, Experience, Job, JobAlert, JobFilter, JobStatus, JobType, Page,
    Role, User,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar, title, bio, location, \
     skills, experience, resume, saved_jobs, reset_password_token, reset_password_expire, \
     created_at, updated_at";

const JOB_COLUMNS: &str = "id, title, company, description, location, salary, skills, job_type, \
     experience, status, posted_by, created_at, updated_at";

const APPLICATION_COLUMNS: &str =
    "id, job_id, applicant_id, resume, status, created_at, updated_at";

const ALERT_COLUMNS: &str = "id, user_id, keywords, location, frequency, last_sent, created_at";

/// Postgres-backed store. The schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> StoreError {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ => StoreError::Unavailable(error.to_string()),
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}

/// Escapes LIKE wildcards so a search term is matched literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    avatar: Option<String>,
    title: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    skills: Vec<String>,
    experience: Json<Vec<Experience>>,
    resume: Option<String>,
    saved_jobs: Vec<Uuid>,
    reset_password_token: Option<String>,
    reset_password_expire: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> User {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            avatar: row.avatar,
            title: row.title,
            bio: row.bio,
            location: row.location,
            skills: row.skills,
            experience: row.experience.0,
            resume: row.resume,
            saved_jobs: row.saved_jobs,
            reset_password_token: row.reset_password_token,
            reset_password_expire: row.reset_password_expire,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.avatar)
            .bind(&user.title)
            .bind(&user.bio)
            .bind(&user.location)
            .bind(&user.skills)
            .bind(Json(&user.experience))
            .bind(&user.resume)
            .bind(&user.saved_jobs)
            .bind(&user.reset_password_token)
            .bind(user.reset_password_expire)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(DUPLICATE_EMAIL.into())),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn user_by_reset_token(&self, digest: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_password_token = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(digest)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users
             SET name = $2, password_hash = $3, avatar = $4, title = $5, bio = $6, location = $7,
                 skills = $8, experience = $9, resume = $10, saved_jobs = $11,
                 reset_password_token = $12, reset_password_expire = $13, updated_at = $14
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.title)
        .bind(&user.bio)
        .bind(&user.location)
        .bind(&user.skills)
        .bind(Json(&user.experience))
        .bind(&user.resume)
        .bind(&user.saved_jobs)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expire)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn toggle_saved_job(&self, user_id: Uuid, job_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE users
             SET saved_jobs = CASE
                     WHEN $2 = ANY(saved_jobs) THEN array_remove(saved_jobs, $2)
                     ELSE array_append(saved_jobs, $2)
                 END,
                 updated_at = now()
             WHERE id = $1
             RETURNING saved_jobs",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self, role: Option<Role>) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE $1::user_role IS NULL OR role = $1",
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        let sql = format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(job.id)
            .bind(job.title)
            .bind(job.company)
            .bind(job.description)
            .bind(job.location)
            .bind(job.salary)
            .bind(job.skills)
            .bind(job.job_type)
            .bind(job.experience)
            .bind(job.status)
            .bind(job.posted_by)
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn jobs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        // posted_by is deliberately absent from the SET list.
        let result = sqlx::query(
            "UPDATE jobs
             SET title = $2, company = $3, description = $4, location = $5, salary = $6,
                 skills = $7, job_type = $8, experience = $9, status = $10, updated_at = $11
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.salary)
        .bind(&job.skills)
        .bind(job.job_type)
        .bind(&job.experience)
        .bind(job.status)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_jobs(
        &self,
        filter: &JobFilter,
        page: Page,
    ) -> Result<(Vec<Job>, u64), StoreError> {
        // Conditions are appended in the same order their values are bound below.
        let mut conditions = vec!["status = 'open'".to_string()];
        let mut param_count = 1;

        if filter.keyword.is_some() {
            conditions.push(format!(
                "(title ILIKE ${0} ESCAPE '\\' OR company ILIKE ${0} ESCAPE '\\')",
                param_count
            ));
            param_count += 1;
        }
        if filter.location.is_some() {
            conditions.push(format!("location = ${}", param_count));
            param_count += 1;
        }
        if filter.job_type.is_some() {
            conditions.push(format!("job_type = ${}", param_count));
            param_count += 1;
        }
        if filter.min_salary.is_some() {
            conditions.push(format!("salary >= ${}", param_count));
            param_count += 1;
        }

        let where_clause = conditions.join(" AND ");
        let count_sql = format!("SELECT COUNT(*) FROM jobs WHERE {}", where_clause);
        let page_sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE {} \
             ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            where_clause,
            param_count,
            param_count + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page_query = sqlx::query_as::<_, Job>(&page_sql);

        if let Some(keyword) = &filter.keyword {
            let pattern = like_pattern(keyword);
            count_query = count_query.bind(pattern.clone());
            page_query = page_query.bind(pattern);
        }
        if let Some(location) = &filter.location {
            count_query = count_query.bind(location.clone());
            page_query = page_query.bind(location.clone());
        }
        if let Some(job_type) = filter.job_type {
            count_query = count_query.bind(job_type);
            page_query = page_query.bind(job_type);
        }
        if let Some(min_salary) = filter.min_salary {
            count_query = count_query.bind(min_salary);
            page_query = page_query.bind(min_salary);
        }

        let total = count_query.fetch_one(&self.pool).await?;
        let jobs = page_query
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((jobs, total as u64))
    }

    async fn jobs_by_owner(&self, owner: Uuid) -> Result<Vec<Job>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE posted_by = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_jobs(&self, status: Option<JobStatus>) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE $1::job_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn count_jobs_by_type(&self) -> Result<Vec<(JobType, u64)>, StoreError> {
        let rows = sqlx::query_as::<_, (JobType, i64)>(
            "SELECT job_type, COUNT(*) FROM jobs GROUP BY job_type",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(job_type, count)| (job_type, count as u64))
            .collect())
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let sql = format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Application>(&sql)
            .bind(application.id)
            .bind(application.job)
            .bind(application.applicant)
            .bind(application.resume)
            .bind(application.status)
            .bind(application.created_at)
            .bind(application.updated_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(application) => Ok(application),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict(DUPLICATE_APPLICATION.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn application_by_id(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn application_for(
        &self,
        job: Uuid,
        applicant: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 AND applicant_id = $2"
        );
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(job)
            .bind(applicant)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn applications_by_applicant(
        &self,
        applicant: Uuid,
    ) -> Result<Vec<Application>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE applicant_id = $1 ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(applicant)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn applications_by_jobs(&self, jobs: &[Uuid]) -> Result<Vec<Application>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE job_id = ANY($1) ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Application>(&sql)
            .bind(jobs)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn transition_application(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Application, StoreError> {
        let sql = format!(
            "UPDATE applications SET status = $3, updated_at = now() \
             WHERE id = $1 AND status = $2 \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(application) => Ok(application),
            None => match self.application_by_id(id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "Application is already {}",
                    current.status
                ))),
                None => Err(StoreError::NotFound),
            },
        }
    }

    async fn close_pending_applications(&self, job: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE applications SET status = 'closed', updated_at = now()
             WHERE job_id = $1 AND status = 'pending'",
        )
        .bind(job)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applications WHERE $1::application_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn top_jobs_by_applications(&self, limit: u32) -> Result<Vec<(Uuid, u64)>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT job_id, COUNT(*) AS applications FROM applications
             GROUP BY job_id ORDER BY applications DESC, job_id LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(job, count)| (job, count as u64))
            .collect())
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_alert_capped(&self, alert: JobAlert, cap: u64) -> Result<JobAlert, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent inserts for the same owner so the count below stays accurate.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(alert.user)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO job_alerts ({ALERT_COLUMNS}) \
             SELECT $1, $2, $3, $4, $5, $6, $7 \
             WHERE (SELECT COUNT(*) FROM job_alerts WHERE user_id = $2) < $8 \
             RETURNING {ALERT_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, JobAlert>(&sql)
            .bind(alert.id)
            .bind(alert.user)
            .bind(alert.keywords)
            .bind(alert.location)
            .bind(alert.frequency)
            .bind(alert.last_sent)
            .bind(alert.created_at)
            .bind(cap as i64)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        inserted.ok_or_else(|| {
            StoreError::LimitExceeded(format!("You can only have up to {} job alerts", cap))
        })
    }

    async fn alerts_by_user(&self, user: Uuid) -> Result<Vec<JobAlert>, StoreError> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM job_alerts WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, JobAlert>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn alert_by_id(&self, id: Uuid) -> Result<Option<JobAlert>, StoreError> {
        let sql = format!("SELECT {ALERT_COLUMNS} FROM job_alerts WHERE id = $1");
        Ok(sqlx::query_as::<_, JobAlert>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_alert(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM job_alerts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("react"), "%react%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
