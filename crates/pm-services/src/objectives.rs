//! Objective service

use std::sync::Arc;

use pm_core::config::ServicesConfig;
use pm_core::traits::{assign_id, Id};
use pm_db::UnitOfWork;
use pm_models::{Employee, Mapper, Objective, ObjectiveDto, ObjectiveInclude, Project, ProjectInclude};
use validator::Validate;

use crate::associations::{non_members, resolve_employees};
use crate::error::{ServiceError, ServiceResult};

const DETAIL: &[ObjectiveInclude] = &[ObjectiveInclude::Project, ObjectiveInclude::Employees];
const LISTING: &[ObjectiveInclude] = &[ObjectiveInclude::Employees];

pub struct ObjectiveService {
    uow: Arc<UnitOfWork>,
    mapper: Arc<Mapper>,
    options: ServicesConfig,
}

impl ObjectiveService {
    pub fn new(uow: Arc<UnitOfWork>, mapper: Arc<Mapper>, options: ServicesConfig) -> Self {
        Self { uow, mapper, options }
    }

    /// Create an objective assigned to the resolvable subset of
    /// `item.employees`.
    ///
    /// An unknown `project_id` is not rejected here; the store's foreign key
    /// decides at commit.
    pub async fn add(&self, item: Option<ObjectiveDto>) -> ServiceResult<ObjectiveDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;

        let assignees = resolve_employees(&self.uow.employees(), &item.employee_ids()).await?;
        let project = self.load_project(item.project_id).await?;
        self.check_assignees(project.as_ref(), &assignees)?;

        let mut objective = self.mapper.objective_from_dto(&item);
        objective.id = assign_id(objective.id);
        match project {
            Some(mut project) => {
                project.employees = None;
                objective.project = Some(Box::new(project));
            }
            None => tracing::warn!(
                project_id = %item.project_id,
                "objective references a project that does not exist"
            ),
        }
        objective.employees = Some(assignees);

        let objective = self.uow.objectives().add(objective)?;
        self.uow.commit().await?;

        tracing::info!(
            id = %objective.id,
            project_id = %objective.project_id,
            assignees = objective.assignee_ids().len(),
            "objective added"
        );
        Ok(self.mapper.objective_to_dto(&objective))
    }

    /// Overwrite every scalar field and replace the assignee set.
    ///
    /// An id with no stored row is written as a new objective.
    pub async fn update(&self, item: Option<ObjectiveDto>) -> ServiceResult<ObjectiveDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;

        let assignees = resolve_employees(&self.uow.employees(), &item.employee_ids()).await?;
        let objectives = self.uow.objectives();

        let mut objective = match objectives.find_by_id(item.id, LISTING).await? {
            Some(mut existing) => {
                self.mapper.apply_objective(&mut existing, &item);
                existing
            }
            None => {
                tracing::info!(id = %item.id, "objective not stored yet, update will insert it");
                let mut objective = self.mapper.objective_from_dto(&item);
                objective.id = assign_id(objective.id);
                objective
            }
        };

        if self.options.enforce_assignee_membership {
            let project = self.load_project(objective.project_id).await?;
            self.check_assignees(project.as_ref(), &assignees)?;
        }
        objective.employees = Some(assignees);

        let objective = objectives.update(objective)?;
        self.uow.commit().await?;

        tracing::info!(
            id = %objective.id,
            assignees = objective.assignee_ids().len(),
            "objective updated"
        );
        Ok(self.mapper.objective_to_dto(&objective))
    }

    pub async fn delete(&self, id: Id) -> ServiceResult<()> {
        let objectives = self.uow.objectives();
        let objective = objectives
            .find_by_id(id, &[])
            .await?
            .ok_or_else(|| ServiceError::not_found::<Objective>(id))?;

        objectives.remove(&objective)?;
        self.uow.commit().await?;

        tracing::info!(%id, "objective deleted");
        Ok(())
    }

    /// First objective matching `predicate`, with its project and assignees.
    pub async fn get<P>(&self, predicate: P) -> ServiceResult<Option<ObjectiveDto>>
    where
        P: Fn(&Objective) -> bool + Send,
    {
        let found = self.uow.objectives().find_one(predicate, DETAIL).await?;
        Ok(found.map(|objective| self.mapper.objective_to_dto(&objective)))
    }

    pub async fn get_by_id(&self, id: Id) -> ServiceResult<Option<ObjectiveDto>> {
        let found = self.uow.objectives().find_by_id(id, DETAIL).await?;
        Ok(found.map(|objective| self.mapper.objective_to_dto(&objective)))
    }

    /// Every objective, with assignees.
    pub async fn get_all(&self) -> ServiceResult<Vec<ObjectiveDto>> {
        let objectives = self.uow.objectives().find_all_including(LISTING).await?;
        Ok(objectives
            .iter()
            .map(|objective| self.mapper.objective_to_dto(objective))
            .collect())
    }

    pub fn dispose(&self) {
        self.uow.dispose();
    }

    /// Members are only loaded when they are going to be checked.
    async fn load_project(&self, id: Id) -> ServiceResult<Option<Project>> {
        let includes: &[ProjectInclude] = if self.options.enforce_assignee_membership {
            &[ProjectInclude::Employees]
        } else {
            &[]
        };
        Ok(self.uow.projects().find_by_id(id, includes).await?)
    }

    fn check_assignees(&self, project: Option<&Project>, assignees: &[Employee]) -> ServiceResult<()> {
        if !self.options.enforce_assignee_membership {
            return Ok(());
        }
        let outsiders = non_members(project, assignees);
        if outsiders.is_empty() {
            return Ok(());
        }
        tracing::warn!(?outsiders, "rejecting assignees outside the project");
        let ids = outsiders
            .iter()
            .map(Id::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(ServiceError::invalid(
            "employees",
            format!("must be members of the project: {}", ids),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pm_db::{MemoryStore, RepositoryError};
    use pm_models::{EmployeeDto, ObjectiveStatus};

    struct Fixture {
        store: Arc<MemoryStore>,
        project: Project,
        member: Employee,
        outsider: Employee,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let member = Employee::new(Id::new_v4());
            let outsider = Employee::new(Id::new_v4());
            let mut project = Project::new(Id::new_v4(), Utc::now());
            project.name = Some("Apollo".into());
            project.employees = Some(vec![member.clone()]);

            let uow = UnitOfWork::new(store.clone());
            uow.employees().add(member.clone()).unwrap();
            uow.employees().add(outsider.clone()).unwrap();
            uow.projects().add(project.clone()).unwrap();
            uow.commit().await.unwrap();

            Self {
                store,
                project,
                member,
                outsider,
            }
        }

        fn service(&self) -> ObjectiveService {
            self.service_with(ServicesConfig::default())
        }

        fn service_with(&self, options: ServicesConfig) -> ObjectiveService {
            ObjectiveService::new(
                Arc::new(UnitOfWork::new(self.store.clone())),
                Arc::new(Mapper::new()),
                options,
            )
        }

        fn strict(&self) -> ObjectiveService {
            self.service_with(ServicesConfig {
                enforce_assignee_membership: true,
            })
        }

        fn dto(&self, assignees: &[Id]) -> ObjectiveDto {
            let mut dto = ObjectiveDto::new(self.project.id);
            dto.name = Some("Launch".into());
            dto.employees = Some(assignees.iter().copied().map(EmployeeDto::reference).collect());
            dto
        }
    }

    #[tokio::test]
    async fn test_add_none_touches_nothing() {
        let fx = Fixture::new().await;
        let reads = fx.store.reads();
        let commits = fx.store.commits();

        let err = fx.service().add(None).await.unwrap_err();
        assert!(matches!(err, ServiceError::ArgumentNull { .. }));
        assert_eq!(fx.store.reads(), reads);
        assert_eq!(fx.store.commits(), commits);
    }

    #[tokio::test]
    async fn test_add_drops_unknown_assignee() {
        let fx = Fixture::new().await;
        let ghost = Id::new_v4();

        let created = fx
            .service()
            .add(Some(fx.dto(&[fx.member.id, ghost])))
            .await
            .unwrap();
        assert_eq!(created.employee_ids(), vec![fx.member.id]);
        assert_eq!(created.project.as_ref().map(|p| p.id), Some(fx.project.id));

        let stored = fx.service().get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.employee_ids(), vec![fx.member.id]);
        assert!(!stored.employee_ids().contains(&ghost));
    }

    #[tokio::test]
    async fn test_add_with_unknown_project_fails_at_commit() {
        let fx = Fixture::new().await;
        let commits = fx.store.commits();
        let dto = ObjectiveDto::new(Id::new_v4());

        let err = fx.service().add(Some(dto)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::ForeignKey(_))));
        assert_eq!(fx.store.commits(), commits);
    }

    #[tokio::test]
    async fn test_update_absent_id_inserts() {
        let fx = Fixture::new().await;
        let mut dto = fx.dto(&[fx.member.id]);
        dto.id = Id::new_v4();
        dto.status = ObjectiveStatus::InProgress;

        let saved = fx.service().update(Some(dto.clone())).await.unwrap();
        assert_eq!(saved.id, dto.id);

        let stored = fx.service().get_by_id(dto.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ObjectiveStatus::InProgress);
        assert_eq!(stored.employee_ids(), vec![fx.member.id]);
    }

    #[tokio::test]
    async fn test_update_replaces_assignees() {
        let fx = Fixture::new().await;
        let created = fx.service().add(Some(fx.dto(&[fx.member.id]))).await.unwrap();

        let mut edit = created.clone();
        edit.employees = Some(vec![EmployeeDto::reference(fx.outsider.id)]);
        edit.comment = Some("moved".into());
        fx.service().update(Some(edit)).await.unwrap();

        let stored = fx.service().get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.employee_ids(), vec![fx.outsider.id]);
        assert_eq!(stored.comment.as_deref(), Some("moved"));
    }

    #[tokio::test]
    async fn test_membership_not_enforced_by_default() {
        let fx = Fixture::new().await;
        let created = fx.service().add(Some(fx.dto(&[fx.outsider.id]))).await.unwrap();
        assert_eq!(created.employee_ids(), vec![fx.outsider.id]);
    }

    #[tokio::test]
    async fn test_membership_enforced_when_enabled() {
        let fx = Fixture::new().await;
        let commits = fx.store.commits();

        let err = fx
            .strict()
            .add(Some(fx.dto(&[fx.member.id, fx.outsider.id])))
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => assert!(errors.has_error("employees")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.store.commits(), commits);

        let created = fx.strict().add(Some(fx.dto(&[fx.member.id]))).await.unwrap();
        assert_eq!(created.employee_ids(), vec![fx.member.id]);
    }

    #[tokio::test]
    async fn test_delete() {
        let fx = Fixture::new().await;
        let missing = Id::new_v4();
        let err = fx.service().delete(missing).await.unwrap_err();
        assert_eq!(err.error_code(), "not_found");

        let created = fx.service().add(Some(fx.dto(&[]))).await.unwrap();
        fx.service().delete(created.id).await.unwrap();
        assert!(fx.service().get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_loads_project_and_assignees() {
        let fx = Fixture::new().await;
        fx.service().add(Some(fx.dto(&[fx.member.id]))).await.unwrap();

        let found = fx
            .service()
            .get(|o| o.name.as_deref() == Some("Launch"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.project.and_then(|p| p.name), Some("Apollo".to_string()));
        assert_eq!(found.employees.map(|e| e.len()), Some(1));

        let all = fx.service().get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].project.is_none());
    }
}
