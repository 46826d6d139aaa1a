//! Project service
//!
//! # Example
//! ```ignore
//! let service = ctx.projects();
//! let mut dto = ProjectDto::new(Utc::now());
//! dto.name = Some("Apollo".into());
//! dto.employees = Some(vec![EmployeeDto::reference(lead_id)]);
//! let created = service.add(Some(dto)).await?;
//! ```

use std::sync::Arc;

use pm_core::traits::{assign_id, Id};
use pm_db::UnitOfWork;
use pm_models::{Mapper, Project, ProjectDto, ProjectInclude};
use validator::Validate;

use crate::associations::resolve_employees;
use crate::error::{ServiceError, ServiceResult};
use crate::query::{normalize_term, project_matches, ProjectSort};

/// Relations loaded by single-project lookups
const DETAIL: &[ProjectInclude] = &[ProjectInclude::Employees, ProjectInclude::Objectives];
/// Relations loaded by listings
const LISTING: &[ProjectInclude] = &[ProjectInclude::Employees];

pub struct ProjectService {
    uow: Arc<UnitOfWork>,
    mapper: Arc<Mapper>,
}

impl ProjectService {
    pub fn new(uow: Arc<UnitOfWork>, mapper: Arc<Mapper>) -> Self {
        Self { uow, mapper }
    }

    /// Create a project whose members are the resolvable subset of
    /// `item.employees`.
    pub async fn add(&self, item: Option<ProjectDto>) -> ServiceResult<ProjectDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;

        let members = resolve_employees(&self.uow.employees(), &item.employee_ids()).await?;

        let mut project = self.mapper.project_from_dto(&item);
        project.id = assign_id(project.id);
        project.employees = Some(members);

        let project = self.uow.projects().add(project)?;
        self.uow.commit().await?;

        tracing::info!(
            id = %project.id,
            members = project.member_ids().len(),
            "project added"
        );
        Ok(self.mapper.project_to_dto(&project))
    }

    /// Overwrite every scalar field and replace the member set.
    ///
    /// An id with no stored row is written as a new project.
    pub async fn update(&self, item: Option<ProjectDto>) -> ServiceResult<ProjectDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;

        let members = resolve_employees(&self.uow.employees(), &item.employee_ids()).await?;
        let projects = self.uow.projects();

        let mut project = match projects.find_by_id(item.id, LISTING).await? {
            Some(mut existing) => {
                self.mapper.apply_project(&mut existing, &item);
                existing
            }
            None => {
                tracing::info!(id = %item.id, "project not stored yet, update will insert it");
                let mut project = self.mapper.project_from_dto(&item);
                project.id = assign_id(project.id);
                project
            }
        };
        project.employees = Some(members);
        project.objectives = None;

        let project = projects.update(project)?;
        self.uow.commit().await?;

        tracing::info!(
            id = %project.id,
            members = project.member_ids().len(),
            "project updated"
        );
        Ok(self.mapper.project_to_dto(&project))
    }

    /// Remove a project together with its objectives and memberships.
    pub async fn delete(&self, id: Id) -> ServiceResult<()> {
        let projects = self.uow.projects();
        let project = projects
            .find_by_id(id, &[])
            .await?
            .ok_or_else(|| ServiceError::not_found::<Project>(id))?;

        projects.remove(&project)?;
        self.uow.commit().await?;

        tracing::info!(%id, "project deleted");
        Ok(())
    }

    /// First project matching `predicate`, with members and objectives.
    pub async fn get<P>(&self, predicate: P) -> ServiceResult<Option<ProjectDto>>
    where
        P: Fn(&Project) -> bool + Send,
    {
        let found = self.uow.projects().find_one(predicate, DETAIL).await?;
        Ok(found.map(|project| self.mapper.project_to_dto(&project)))
    }

    pub async fn get_by_id(&self, id: Id) -> ServiceResult<Option<ProjectDto>> {
        let found = self.uow.projects().find_by_id(id, DETAIL).await?;
        Ok(found.map(|project| self.mapper.project_to_dto(&project)))
    }

    /// Every project, with members.
    pub async fn get_all(&self) -> ServiceResult<Vec<ProjectDto>> {
        let projects = self.uow.projects().find_all_including(LISTING).await?;
        Ok(self.to_dtos(&projects))
    }

    /// Projects whose name contains `term` (case-insensitive), sorted.
    pub async fn search(&self, term: Option<&str>, sort: ProjectSort) -> ServiceResult<Vec<ProjectDto>> {
        let mut projects = self.uow.projects().find_all_including(LISTING).await?;
        if let Some(needle) = normalize_term(term) {
            projects.retain(|project| project_matches(project, &needle));
        }
        sort.apply(&mut projects);
        Ok(self.to_dtos(&projects))
    }

    pub fn dispose(&self) {
        self.uow.dispose();
    }

    fn to_dtos(&self, projects: &[Project]) -> Vec<ProjectDto> {
        projects
            .iter()
            .map(|project| self.mapper.project_to_dto(project))
            .collect()
    }
}
