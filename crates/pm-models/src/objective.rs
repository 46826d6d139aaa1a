//! Objective model
//!
//! Table: objectives (assignees in objective_employees)

use std::fmt;
use std::str::FromStr;

use pm_core::traits::{Entity, Id, Identifiable};
use serde::{Deserialize, Serialize};

use crate::employee::Employee;
use crate::project::Project;

/// Workflow state of an objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl ObjectiveStatus {
    pub const ALL: [ObjectiveStatus; 3] = [
        ObjectiveStatus::ToDo,
        ObjectiveStatus::InProgress,
        ObjectiveStatus::Done,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveStatus::ToDo => "ToDo",
            ObjectiveStatus::InProgress => "InProgress",
            ObjectiveStatus::Done => "Done",
        }
    }
}

impl fmt::Display for ObjectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown objective status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ObjectiveStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; underscores, dashes and spaces are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "todo" => Ok(ObjectiveStatus::ToDo),
            "inprogress" => Ok(ObjectiveStatus::InProgress),
            "done" => Ok(ObjectiveStatus::Done),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Objective (task) entity
///
/// Always owned by a project through `project_id`; `project` is only filled
/// when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: Id,
    pub name: Option<String>,
    pub author: Option<String>,
    pub project_id: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Box<Project>>,

    pub status: ObjectiveStatus,
    pub comment: Option<String>,
    pub priority: i32,

    /// Assignees. `Some` is always the complete set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<Employee>>,
}

impl Objective {
    pub fn new(id: Id, project_id: Id) -> Self {
        Self {
            id,
            name: None,
            author: None,
            project_id,
            project: None,
            status: ObjectiveStatus::default(),
            comment: None,
            priority: 0,
            employees: None,
        }
    }

    pub fn assignee_ids(&self) -> Vec<Id> {
        self.employees
            .as_ref()
            .map(|assignees| assignees.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }
}

/// Relations loadable on an [`Objective`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveInclude {
    Project,
    Employees,
}

impl Identifiable for Objective {
    fn id(&self) -> Id {
        self.id
    }
}

impl Entity for Objective {
    const TABLE_NAME: &'static str = "objectives";
    const TYPE_NAME: &'static str = "Objective";
    type Include = ObjectiveInclude;
}
