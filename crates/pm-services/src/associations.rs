//! Many-to-many reconciliation helpers
//!
//! An incoming DTO always carries the complete list of related employees.
//! The services resolve that list to stored rows and hand the result to the
//! store as the new related set; ids that resolve to nothing are dropped.

use pm_core::traits::Id;
use pm_db::{Repository, RepositoryResult};
use pm_models::{Employee, Project};

/// Look every id up and keep the ones that exist, in request order.
///
/// Duplicates collapse to one entry; unknown ids are logged and skipped.
pub async fn resolve_employees(
    repository: &Repository<Employee>,
    ids: &[Id],
) -> RepositoryResult<Vec<Employee>> {
    let mut resolved: Vec<Employee> = Vec::with_capacity(ids.len());

    for &id in ids {
        if resolved.iter().any(|employee| employee.id == id) {
            continue;
        }
        match repository.find_by_id(id, &[]).await? {
            Some(employee) => resolved.push(employee),
            None => tracing::warn!(%id, "dropping reference to unknown employee"),
        }
    }

    tracing::debug!(
        requested = ids.len(),
        resolved = resolved.len(),
        "resolved employee references"
    );
    Ok(resolved)
}

/// Ids of `assignees` that are not members of `project`.
///
/// A missing project, or one whose members were not loaded, has no members.
pub fn non_members(project: Option<&Project>, assignees: &[Employee]) -> Vec<Id> {
    assignees
        .iter()
        .map(|employee| employee.id)
        .filter(|id| !project.is_some_and(|project| project.has_member(*id)))
        .collect()
}
