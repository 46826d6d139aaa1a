//! Employee model
//!
//! Table: employees

use pm_core::traits::{Entity, Id, Identifiable};
use serde::{Deserialize, Serialize};

use crate::objective::Objective;
use crate::project::Project;

/// A person who can be a project member and an objective assignee.
///
/// `email` and `user_name` mirror the account directory entry with the same id.
/// Membership is owned by the project and objective sides, so the navigation
/// sets here are read-only views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Id,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub family_name: Option<String>,
    pub patronymic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<Objective>>,
}

impl Employee {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// "Family First Patronymic", skipping blank parts.
    pub fn full_name(&self) -> String {
        [&self.family_name, &self.first_name, &self.patronymic]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Relations loadable on an [`Employee`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmployeeInclude {
    Projects,
    Objectives,
}

impl Identifiable for Employee {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Employee {
    const TABLE_NAME: &'static str = "employees";
    const TYPE_NAME: &'static str = "Employee";
    type Include = EmployeeInclude;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_full_name() {
        let employee = Employee {
            first_name: Some("Ivan".into()),
            family_name: Some("Petrov".into()),
            patronymic: Some("  ".into()),
            ..Employee::new(Uuid::new_v4())
        };
        assert_eq!(employee.full_name(), "Petrov Ivan");
    }

    #[test]
    fn test_unloaded_navigation_is_not_serialized() {
        let employee = Employee::new(Uuid::new_v4());
        let json = serde_json::to_value(&employee).unwrap();
        assert!(json.get("projects").is_none());
        assert!(json.get("firstName").is_some());
    }
}
