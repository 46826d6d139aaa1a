//! Listing filters and sort orders

use std::fmt;
use std::str::FromStr;

use pm_models::{Employee, Project};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSort {
    #[default]
    Name,
    Start,
    Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sort order: {0} (expected name, start or priority)")]
pub struct UnknownSort(pub String);

impl ProjectSort {
    pub const ALL: [ProjectSort; 3] = [ProjectSort::Name, ProjectSort::Start, ProjectSort::Priority];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectSort::Name => "name",
            ProjectSort::Start => "start",
            ProjectSort::Priority => "priority",
        }
    }

    /// Stable, ascending.
    pub fn apply(&self, projects: &mut [Project]) {
        match self {
            ProjectSort::Name => projects.sort_by_cached_key(|p| lowercase(&p.name)),
            ProjectSort::Start => projects.sort_by_key(|p| p.start),
            ProjectSort::Priority => projects.sort_by_key(|p| p.priority),
        }
    }
}

impl fmt::Display for ProjectSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectSort::ALL
            .into_iter()
            .find(|sort| sort.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSort(s.to_string()))
    }
}

/// Lowercased, trimmed search term; `None` when there is nothing to match.
pub fn normalize_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

pub fn project_matches(project: &Project, needle: &str) -> bool {
    contains(&project.name, needle)
}

/// Matches on first name, family name or patronymic.
pub fn employee_matches(employee: &Employee, needle: &str) -> bool {
    contains(&employee.first_name, needle)
        || contains(&employee.family_name, needle)
        || contains(&employee.patronymic, needle)
}

fn contains(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|value| value.to_lowercase().contains(needle))
}

fn lowercase(field: &Option<String>) -> String {
    field.as_deref().unwrap_or_default().to_lowercase()
}
