//! Presentation-shaped copies of the DTOs.
//!
//! Association lists are plain `Vec`s here: a form always submits the full
//! list of selected ids, so there is no "not loaded" state.

use chrono::{DateTime, Utc};
use pm_core::traits::Id;
use serde::{Deserialize, Serialize};

use crate::objective::ObjectiveStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeViewModel {
    pub id: Id,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub family_name: Option<String>,
    pub patronymic: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectViewModel>,
    #[serde(default)]
    pub roles: Option<Vec<Id>>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl EmployeeViewModel {
    pub fn with_id(id: Id) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Builds id-only employee entries from the ids a form submitted.
pub fn employee_refs(ids: &[Id]) -> Vec<EmployeeViewModel> {
    ids.iter().copied().map(EmployeeViewModel::with_id).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectViewModel {
    pub id: Id,
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub performer_name: Option<String>,
    pub supervisor_id: Id,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub priority: i32,
    #[serde(default)]
    pub employees: Vec<EmployeeViewModel>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveViewModel>,
}

impl ProjectViewModel {
    pub fn member_ids(&self) -> Vec<Id> {
        self.employees.iter().map(|e| e.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveViewModel {
    pub id: Id,
    pub name: Option<String>,
    pub author: Option<String>,
    pub project_id: Id,
    #[serde(default)]
    pub project: Option<Box<ProjectViewModel>>,
    pub status: ObjectiveStatus,
    pub comment: Option<String>,
    pub priority: i32,
    #[serde(default)]
    pub employees: Vec<EmployeeViewModel>,
}

impl ObjectiveViewModel {
    pub fn assignee_ids(&self) -> Vec<Id> {
        self.employees.iter().map(|e| e.id).collect()
    }
}
