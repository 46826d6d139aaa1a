//! Project model
//!
//! Table: projects (members in project_employees)

use chrono::{DateTime, Utc};
use pm_core::traits::{Entity, Id, Identifiable};
use serde::{Deserialize, Serialize};

use crate::employee::Employee;
use crate::objective::Objective;

/// Project entity
///
/// `end` is `None` until the project has a finish date; when set it must not
/// precede `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Id,
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub performer_name: Option<String>,
    pub supervisor_id: Id,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub priority: i32,

    /// Members. `Some` is always the complete set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<Employee>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<Objective>>,
}

impl Project {
    pub fn new(id: Id, start: DateTime<Utc>) -> Self {
        Self {
            id,
            name: None,
            customer_name: None,
            performer_name: None,
            supervisor_id: Id::nil(),
            start,
            end: None,
            priority: 0,
            employees: None,
            objectives: None,
        }
    }

    pub fn has_member(&self, employee_id: Id) -> bool {
        self.employees
            .as_ref()
            .map(|members| members.iter().any(|e| e.id == employee_id))
            .unwrap_or(false)
    }

    pub fn member_ids(&self) -> Vec<Id> {
        self.employees
            .as_ref()
            .map(|members| members.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }
}

/// Relations loadable on a [`Project`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectInclude {
    Employees,
    Objectives,
}

impl Identifiable for Project {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Project {
    const TABLE_NAME: &'static str = "projects";
    const TYPE_NAME: &'static str = "Project";
    type Include = ProjectInclude;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_members() {
        let member = Employee::new(Uuid::new_v4());
        let mut project = Project::new(Uuid::new_v4(), Utc::now());
        assert!(!project.has_member(member.id));
        assert!(project.member_ids().is_empty());

        project.employees = Some(vec![member.clone()]);
        assert!(project.has_member(member.id));
        assert_eq!(project.member_ids(), vec![member.id]);
    }
}
