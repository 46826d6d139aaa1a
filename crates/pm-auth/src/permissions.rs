//! Role-based access control
//!
//! Three fixed roles. Listing projects is open to everyone, viewing anything
//! else needs a signed-in user, project and objective writes need a team lead
//! or an admin, and employee administration and seeding are admin only.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use pm_core::traits::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    Admin,
    TeamLead,
    User,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::User, RoleName::TeamLead];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "Admin",
            RoleName::TeamLead => "TeamLead",
            RoleName::User => "User",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = AuthError;

    /// Case-insensitive; `team_lead` and `team-lead` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !matches!(c, '_' | '-')).collect();
        RoleName::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| AuthError::UnknownRole(s.to_string()))
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Operations guarded by a role check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListProjects,
    ViewProject,
    AddProject,
    EditProject,
    DeleteProject,
    ViewObjectives,
    AddObjective,
    EditObjective,
    DeleteObjective,
    ViewEmployees,
    ViewEmployee,
    EditEmployee,
    DeleteEmployee,
    ChangePassword,
    Seed,
}

/// Who may perform an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    SignedIn,
    AnyOf(&'static [RoleName]),
}

const MANAGERS: &[RoleName] = &[RoleName::TeamLead, RoleName::Admin];
const ADMINS: &[RoleName] = &[RoleName::Admin];

impl Action {
    pub fn requirement(&self) -> Requirement {
        match self {
            Action::ListProjects => Requirement::Anyone,
            Action::ViewProject
            | Action::ViewObjectives
            | Action::ViewEmployees
            | Action::ViewEmployee => Requirement::SignedIn,
            Action::AddProject
            | Action::EditProject
            | Action::DeleteProject
            | Action::AddObjective
            | Action::EditObjective
            | Action::DeleteObjective => Requirement::AnyOf(MANAGERS),
            Action::EditEmployee
            | Action::DeleteEmployee
            | Action::ChangePassword
            | Action::Seed => Requirement::AnyOf(ADMINS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Sign-in required for {0:?}")]
    Unauthenticated(Action),
    #[error("Forbidden: {action:?} requires one of {required}")]
    Forbidden { action: Action, required: String },
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

// ============================================================================
// User Context
// ============================================================================

/// The caller, with the roles the directory reports for them
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Option<Id>,
    pub user_name: String,
    roles: HashSet<RoleName>,
}

impl CurrentUser {
    pub fn new(id: Id, user_name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            user_name: user_name.into(),
            roles: HashSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            id: None,
            user_name: "anonymous".to_string(),
            roles: HashSet::new(),
        }
    }

    /// Build from directory role names; names that are not known roles are skipped.
    pub fn from_role_names(id: Id, user_name: impl Into<String>, names: &[String]) -> Self {
        let mut user = Self::new(id, user_name);
        for name in names {
            match name.parse::<RoleName>() {
                Ok(role) => user.add_role(role),
                Err(_) => tracing::debug!(role = %name, "ignoring unknown role"),
            }
        }
        user
    }

    pub fn with_role(mut self, role: RoleName) -> Self {
        self.add_role(role);
        self
    }

    pub fn add_role(&mut self, role: RoleName) {
        self.roles.insert(role);
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub fn can(&self, action: Action) -> bool {
        self.authorize(action).is_ok()
    }

    pub fn authorize(&self, action: Action) -> Result<(), AuthError> {
        match action.requirement() {
            Requirement::Anyone => Ok(()),
            _ if self.is_anonymous() => Err(AuthError::Unauthenticated(action)),
            Requirement::SignedIn => Ok(()),
            Requirement::AnyOf(roles) => {
                if roles.iter().any(|role| self.has_role(*role)) {
                    Ok(())
                } else {
                    Err(AuthError::Forbidden {
                        action,
                        required: roles
                            .iter()
                            .map(RoleName::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_anonymous_user() {
        let user = CurrentUser::anonymous();
        assert!(user.is_anonymous());
        assert!(user.can(Action::ListProjects));
        assert_eq!(
            user.authorize(Action::ViewProject),
            Err(AuthError::Unauthenticated(Action::ViewProject))
        );
    }

    #[test]
    fn test_plain_user() {
        let user = CurrentUser::new(Uuid::new_v4(), "ivan").with_role(RoleName::User);
        assert!(user.can(Action::ViewProject));
        assert!(user.can(Action::ViewEmployees));
        assert!(!user.can(Action::AddProject));
        assert!(!user.can(Action::DeleteObjective));
        assert!(!user.can(Action::EditEmployee));
    }

    #[test]
    fn test_team_lead() {
        let user = CurrentUser::new(Uuid::new_v4(), "lead").with_role(RoleName::TeamLead);
        assert!(user.can(Action::AddProject));
        assert!(user.can(Action::EditObjective));
        assert!(matches!(
            user.authorize(Action::DeleteEmployee),
            Err(AuthError::Forbidden { ref required, .. }) if required == "Admin"
        ));
        assert!(!user.can(Action::Seed));
    }

    #[test]
    fn test_admin() {
        let user = CurrentUser::new(Uuid::new_v4(), "admin").with_role(RoleName::Admin);
        assert!(user.can(Action::DeleteProject));
        assert!(user.can(Action::ChangePassword));
        assert!(user.can(Action::Seed));
    }

    #[test]
    fn test_role_names() {
        assert_eq!("teamlead".parse::<RoleName>().unwrap(), RoleName::TeamLead);
        assert_eq!("team_lead".parse::<RoleName>().unwrap(), RoleName::TeamLead);
        assert_eq!("ADMIN".parse::<RoleName>().unwrap(), RoleName::Admin);
        assert!("root".parse::<RoleName>().is_err());

        let user = CurrentUser::from_role_names(
            Uuid::new_v4(),
            "x",
            &["Admin".to_string(), "Auditor".to_string()],
        );
        assert!(user.has_role(RoleName::Admin));
        assert!(!user.has_role(RoleName::User));
    }
}
