pub mod alert;
pub mod application;
pub mod job;
pub mod user;

pub use alert::{AlertFrequency, AlertInput, JobAlert, MAX_ALERTS_PER_USER};
pub use application::{
    Application, ApplicationStatus, ApplicationView, ApplyReceipt, StatusUpdate,
};
pub use job::{Job, JobFilter, JobInput, JobPage, JobPatch, JobQuery, JobStatus, JobType, JobWithOwner, Page};
pub use user::{Experience, ProfileChanges, Role, User, UserSummary};
