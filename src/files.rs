//! Storage for uploaded resumes and avatars.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::warn;
use thiserror::Error;
use uuid::Uuid;

/// URL recorded for a resume whose upload failed or timed out.
pub const PLACEHOLDER_RESUME_URL: &str = "/uploads/resume-unavailable.pdf";

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: regex::Regex = regex::Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("upload is empty")]
    Empty,
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload timed out after {0:?}")]
    TimedOut(Duration),
    #[error("file store rejected the upload: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists `upload` under `folder` and returns its public URL.
    async fn put(&self, folder: &str, upload: &Upload) -> Result<String, FileStoreError>;
}

/// Keeps only ASCII letters, digits, dots, dashes and underscores.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn stored_name(upload: &Upload) -> String {
    format!("{}-{}", Uuid::new_v4().simple(), sanitize_filename(&upload.filename))
}

/// Writes uploads below `root` and hands out URLs below `{public_url}/uploads`.
pub struct LocalFileStore {
    root: PathBuf,
    public_url: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, folder: &str, upload: &Upload) -> Result<String, FileStoreError> {
        if upload.bytes.is_empty() {
            return Err(FileStoreError::Empty);
        }
        let folder = sanitize_filename(folder);
        let dir = self.root.join(&folder);
        tokio::fs::create_dir_all(&dir).await?;

        let name = stored_name(upload);
        tokio::fs::write(dir.join(&name), &upload.bytes).await?;

        Ok(format!("{}/uploads/{}/{}", self.public_url, folder, name))
    }
}

/// In-memory store for tests. Can be told to fail or to stall.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<(String, Upload)>>,
    failing: bool,
    delay: Option<Duration>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `put` fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// A store that sleeps for `delay` before storing.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn stored_urls(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.iter().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, folder: &str, upload: &Upload) -> Result<String, FileStoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(FileStoreError::Rejected("storage offline".into()));
        }
        if upload.bytes.is_empty() {
            return Err(FileStoreError::Empty);
        }

        let url = format!("memory://{}/{}", folder, stored_name(upload));
        self.files
            .lock()
            .map_err(|_| FileStoreError::Rejected("store poisoned".into()))?
            .push((url.clone(), upload.clone()));
        Ok(url)
    }
}

/// `put` bounded by `timeout`.
pub async fn put_with_timeout(
    store: &dyn FileStore,
    folder: &str,
    upload: &Upload,
    timeout: Duration,
) -> Result<String, FileStoreError> {
    match tokio::time::timeout(timeout, store.put(folder, upload)).await {
        Ok(result) => result,
        Err(_) => Err(FileStoreError::TimedOut(timeout)),
    }
}

/// Stores a resume, substituting `PLACEHOLDER_RESUME_URL` when the store fails
/// or does not answer within `timeout`.
pub async fn put_or_placeholder(
    store: &dyn FileStore,
    upload: &Upload,
    timeout: Duration,
) -> String {
    match put_with_timeout(store, "resumes", upload, timeout).await {
        Ok(url) => url,
        Err(e) => {
            warn!(
                "resume upload of {:?} failed, recording placeholder: {}",
                upload.filename, e
            );
            PLACEHOLDER_RESUME_URL.to_string()
        }
    }
}
