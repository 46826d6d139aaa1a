//! Transport objects accepted and returned by the services.
//!
//! Association lists carry the complete set of related records; a service
//! only reads their ids.

use chrono::{DateTime, Utc};
use pm_core::traits::Id;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::objective::ObjectiveStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: Id,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 256))]
    pub user_name: Option<String>,

    #[validate(length(max = 255))]
    pub first_name: Option<String>,

    #[validate(length(max = 255))]
    pub family_name: Option<String>,

    #[validate(length(max = 255))]
    pub patronymic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<ProjectDto>>,

    /// Requested role ids. `None` leaves the account's roles untouched.
    #[serde(default)]
    pub roles: Option<Vec<Id>>,

    /// New password. `None` leaves the password untouched.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl EmployeeDto {
    /// Reference carrying only an id, as used in association lists
    pub fn reference(id: Id) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule"))]
pub struct ProjectDto {
    pub id: Id,

    #[validate(length(max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 255))]
    pub customer_name: Option<String>,

    #[validate(length(max = 255))]
    pub performer_name: Option<String>,

    pub supervisor_id: Id,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub priority: i32,

    #[serde(default)]
    pub employees: Option<Vec<EmployeeDto>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<ObjectiveDto>>,
}

impl ProjectDto {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            id: Id::nil(),
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

    /// Ids of the referenced employees; an absent list counts as empty.
    pub fn employee_ids(&self) -> Vec<Id> {
        reference_ids(&self.employees)
    }
}

fn validate_schedule(dto: &ProjectDto) -> Result<(), ValidationError> {
    match dto.end {
        Some(end) if end < dto.start => {
            let mut error = ValidationError::new("end_before_start");
            error.message = Some("end must not be earlier than start".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDto {
    pub id: Id,

    #[validate(length(max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 255))]
    pub author: Option<String>,

    pub project_id: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Box<ProjectDto>>,

    pub status: ObjectiveStatus,

    #[validate(length(max = 4000))]
    pub comment: Option<String>,

    pub priority: i32,

    #[serde(default)]
    pub employees: Option<Vec<EmployeeDto>>,
}

impl ObjectiveDto {
    pub fn new(project_id: Id) -> Self {
        Self {
            id: Id::nil(),
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

    /// Ids of the referenced employees; an absent list counts as empty.
    pub fn employee_ids(&self) -> Vec<Id> {
        reference_ids(&self.employees)
    }
}

fn reference_ids(references: &Option<Vec<EmployeeDto>>) -> Vec<Id> {
    references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|e| e.id)
        .collect()
}
