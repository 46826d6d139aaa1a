//! Structural mapping between entities, DTOs and view-models.
//!
//! Entity to DTO copies loaded navigation sets as nested DTOs. DTO to entity
//! never builds navigation: associations are resolved by the services, which
//! look every referenced id up before persisting.

use crate::dto::{EmployeeDto, ObjectiveDto, ProjectDto};
use crate::employee::Employee;
use crate::objective::Objective;
use crate::project::Project;
use crate::view_model::{EmployeeViewModel, ObjectiveViewModel, ProjectViewModel};

/// Stateless translator, constructed once and shared with every service.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    _private: (),
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Employee
    // ------------------------------------------------------------------

    pub fn employee_to_dto(&self, employee: &Employee) -> EmployeeDto {
        EmployeeDto {
            id: employee.id,
            email: employee.email.clone(),
            user_name: employee.user_name.clone(),
            first_name: employee.first_name.clone(),
            family_name: employee.family_name.clone(),
            patronymic: employee.patronymic.clone(),
            projects: employee
                .projects
                .as_ref()
                .map(|list| list.iter().map(|p| self.project_to_dto(p)).collect()),
            roles: None,
            password: None,
        }
    }

    pub fn employee_from_dto(&self, dto: &EmployeeDto) -> Employee {
        Employee {
            id: dto.id,
            email: dto.email.clone(),
            user_name: dto.user_name.clone(),
            first_name: dto.first_name.clone(),
            family_name: dto.family_name.clone(),
            patronymic: dto.patronymic.clone(),
            projects: None,
            objectives: None,
        }
    }

    /// Copies the name fields. Email and user name belong to the directory.
    pub fn apply_employee_profile(&self, employee: &mut Employee, dto: &EmployeeDto) {
        employee.first_name = dto.first_name.clone();
        employee.family_name = dto.family_name.clone();
        employee.patronymic = dto.patronymic.clone();
    }

    pub fn employee_to_view(&self, dto: &EmployeeDto) -> EmployeeViewModel {
        EmployeeViewModel {
            id: dto.id,
            email: dto.email.clone(),
            user_name: dto.user_name.clone(),
            first_name: dto.first_name.clone(),
            family_name: dto.family_name.clone(),
            patronymic: dto.patronymic.clone(),
            projects: dto
                .projects
                .iter()
                .flatten()
                .map(|p| self.project_to_view(p))
                .collect(),
            roles: dto.roles.clone(),
            password: dto.password.clone(),
        }
    }

    /// Membership is edited from the project side, so `projects` is not submitted.
    pub fn employee_from_view(&self, view: &EmployeeViewModel) -> EmployeeDto {
        EmployeeDto {
            id: view.id,
            email: view.email.clone(),
            user_name: view.user_name.clone(),
            first_name: view.first_name.clone(),
            family_name: view.family_name.clone(),
            patronymic: view.patronymic.clone(),
            projects: None,
            roles: view.roles.clone(),
            password: view.password.clone(),
        }
    }

    fn employees_to_dtos(&self, employees: &Option<Vec<Employee>>) -> Option<Vec<EmployeeDto>> {
        employees
            .as_ref()
            .map(|list| list.iter().map(|e| self.employee_to_dto(e)).collect())
    }

    // ------------------------------------------------------------------
    // Project
    // ------------------------------------------------------------------

    pub fn project_to_dto(&self, project: &Project) -> ProjectDto {
        ProjectDto {
            id: project.id,
            name: project.name.clone(),
            customer_name: project.customer_name.clone(),
            performer_name: project.performer_name.clone(),
            supervisor_id: project.supervisor_id,
            start: project.start,
            end: project.end,
            priority: project.priority,
            employees: self.employees_to_dtos(&project.employees),
            objectives: project
                .objectives
                .as_ref()
                .map(|list| list.iter().map(|o| self.objective_to_dto(o)).collect()),
        }
    }

    pub fn project_from_dto(&self, dto: &ProjectDto) -> Project {
        let mut project = Project::new(dto.id, dto.start);
        self.apply_project(&mut project, dto);
        project
    }

    /// Overwrites every scalar field; navigation is left alone.
    pub fn apply_project(&self, project: &mut Project, dto: &ProjectDto) {
        project.name = dto.name.clone();
        project.customer_name = dto.customer_name.clone();
        project.performer_name = dto.performer_name.clone();
        project.supervisor_id = dto.supervisor_id;
        project.start = dto.start;
        project.end = dto.end;
        project.priority = dto.priority;
    }

    pub fn project_to_view(&self, dto: &ProjectDto) -> ProjectViewModel {
        ProjectViewModel {
            id: dto.id,
            name: dto.name.clone(),
            customer_name: dto.customer_name.clone(),
            performer_name: dto.performer_name.clone(),
            supervisor_id: dto.supervisor_id,
            start: dto.start,
            end: dto.end,
            priority: dto.priority,
            employees: dto
                .employees
                .iter()
                .flatten()
                .map(|e| self.employee_to_view(e))
                .collect(),
            objectives: dto
                .objectives
                .iter()
                .flatten()
                .map(|o| self.objective_to_view(o))
                .collect(),
        }
    }

    /// The view always carries the full member list, so the DTO gets `Some`.
    pub fn project_from_view(&self, view: &ProjectViewModel) -> ProjectDto {
        ProjectDto {
            id: view.id,
            name: view.name.clone(),
            customer_name: view.customer_name.clone(),
            performer_name: view.performer_name.clone(),
            supervisor_id: view.supervisor_id,
            start: view.start,
            end: view.end,
            priority: view.priority,
            employees: Some(
                view.employees
                    .iter()
                    .map(|e| self.employee_from_view(e))
                    .collect(),
            ),
            objectives: None,
        }
    }

    // ------------------------------------------------------------------
    // Objective
    // ------------------------------------------------------------------

    pub fn objective_to_dto(&self, objective: &Objective) -> ObjectiveDto {
        ObjectiveDto {
            id: objective.id,
            name: objective.name.clone(),
            author: objective.author.clone(),
            project_id: objective.project_id,
            project: objective
                .project
                .as_ref()
                .map(|p| Box::new(self.project_to_dto(p))),
            status: objective.status,
            comment: objective.comment.clone(),
            priority: objective.priority,
            employees: self.employees_to_dtos(&objective.employees),
        }
    }

    pub fn objective_from_dto(&self, dto: &ObjectiveDto) -> Objective {
        let mut objective = Objective::new(dto.id, dto.project_id);
        self.apply_objective(&mut objective, dto);
        objective
    }

    /// Overwrites every scalar field; navigation is left alone unless the
    /// owning project changed, in which case the stale project is dropped.
    pub fn apply_objective(&self, objective: &mut Objective, dto: &ObjectiveDto) {
        if objective.project_id != dto.project_id {
            objective.project = None;
        }
        objective.name = dto.name.clone();
        objective.author = dto.author.clone();
        objective.project_id = dto.project_id;
        objective.status = dto.status;
        objective.comment = dto.comment.clone();
        objective.priority = dto.priority;
    }

    pub fn objective_to_view(&self, dto: &ObjectiveDto) -> ObjectiveViewModel {
        ObjectiveViewModel {
            id: dto.id,
            name: dto.name.clone(),
            author: dto.author.clone(),
            project_id: dto.project_id,
            project: dto
                .project
                .as_ref()
                .map(|p| Box::new(self.project_to_view(p))),
            status: dto.status,
            comment: dto.comment.clone(),
            priority: dto.priority,
            employees: dto
                .employees
                .iter()
                .flatten()
                .map(|e| self.employee_to_view(e))
                .collect(),
        }
    }

    pub fn objective_from_view(&self, view: &ObjectiveViewModel) -> ObjectiveDto {
        ObjectiveDto {
            id: view.id,
            name: view.name.clone(),
            author: view.author.clone(),
            project_id: view.project_id,
            project: None,
            status: view.status,
            comment: view.comment.clone(),
            priority: view.priority,
            employees: Some(
                view.employees
                    .iter()
                    .map(|e| self.employee_from_view(e))
                    .collect(),
            ),
        }
    }
}
