//! Role and ownership rules for every operation.
//!
//! Services consult `authorize` instead of checking roles themselves, so the
//! rules for a given action are written down exactly once. Checks run in a
//! fixed order: authentication, then role admission, then ownership.

use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Public job listing and job detail.
    ViewJobs,
    CreateJob,
    ListOwnJobs,
    UpdateJob,
    DeleteJob,
    Apply,
    ListOwnApplications,
    ListJobApplications,
    ListRecruiterApplicants,
    DecideApplication,
    ManageSavedJobs,
    ManageAlerts,
    DeleteAlert,
    ManageProfile,
    ViewAdminStats,
    ManageUsers,
}

const EVERYONE: &[Role] = &[Role::User, Role::Recruiter, Role::Admin];
const SEEKERS: &[Role] = &[Role::User];
const RECRUITERS: &[Role] = &[Role::Recruiter, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

impl Action {
    /// `None` for actions that do not need a principal at all.
    pub fn admissible_roles(self) -> Option<&'static [Role]> {
        match self {
            Action::ViewJobs => None,
            Action::CreateJob
            | Action::ListOwnJobs
            | Action::UpdateJob
            | Action::DeleteJob
            | Action::ListJobApplications
            | Action::ListRecruiterApplicants
            | Action::DecideApplication => Some(RECRUITERS),
            Action::Apply | Action::ListOwnApplications => Some(SEEKERS),
            Action::ManageSavedJobs
            | Action::ManageAlerts
            | Action::DeleteAlert
            | Action::ManageProfile => Some(EVERYONE),
            Action::ViewAdminStats | Action::ManageUsers => Some(ADMINS),
        }
    }

    /// Whether the principal must own the target resource (admins always pass).
    pub fn requires_ownership(self) -> bool {
        matches!(
            self,
            Action::UpdateJob
                | Action::DeleteJob
                | Action::ListJobApplications
                | Action::DecideApplication
                | Action::DeleteAlert
        )
    }
}

/// What an action targets, as far as ownership is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Nothing owned: collections, self-scoped data, new records.
    Unowned,
    OwnedBy(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Decides whether `principal` may perform `action` on `resource`. Pure.
pub fn authorize(principal: Option<&Principal>, action: Action, resource: Resource) -> Decision {
    let roles = match action.admissible_roles() {
        Some(roles) => roles,
        None => return Decision::Allow,
    };

    let principal = match principal {
        Some(principal) => principal,
        None => return Decision::Deny(Denial::Unauthenticated),
    };

    if !roles.contains(&principal.role) {
        return Decision::Deny(Denial::Forbidden(format!(
            "User role {} is not authorized to access this route",
            principal.role
        )));
    }

    if action.requires_ownership() && !principal.is_admin() {
        let owns = matches!(resource, Resource::OwnedBy(owner) if owner == principal.id);
        if !owns {
            return Decision::Deny(Denial::Forbidden("Not authorized".to_string()));
        }
    }

    Decision::Allow
}

/// `authorize` as a `Result`, for use with `?`.
pub fn ensure(principal: Option<&Principal>, action: Action, resource: Resource) -> Result<(), AppError> {
    match authorize(principal, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(Denial::Unauthenticated) => {
            Err(AppError::Unauthenticated("Not authorized, no token".into()))
        }
        Decision::Deny(Denial::Forbidden(reason)) => Err(AppError::Forbidden(reason)),
    }
}
