//! # pm-services
//!
//! Business logic for Project Manager RS.
//!
//! Every service owns one [`UnitOfWork`](pm_db::UnitOfWork) and commits it
//! exactly once per write operation. Association lists on incoming DTOs are
//! reconciled by resolving each referenced id against the store and replacing
//! the related set wholesale.

pub mod associations;
pub mod blocking;
pub mod context;
pub mod employees;
pub mod error;
pub mod objectives;
pub mod projects;
pub mod query;
pub mod seed;

pub use context::ServiceContext;
pub use employees::EmployeeService;
pub use error::{ServiceError, ServiceResult};
pub use objectives::ObjectiveService;
pub use projects::ProjectService;
pub use query::ProjectSort;
pub use seed::{ensure_seed_data, SeedReport};

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use pm_auth::MemoryDirectory;
    use pm_core::config::ServicesConfig;
    use pm_core::traits::Id;
    use pm_db::{MemoryStore, UnitOfWork};
    use pm_models::{Employee, EmployeeDto, ObjectiveDto, ObjectiveStatus, ProjectDto};

    use crate::{ServiceContext, ServiceError};

    struct World {
        store: Arc<MemoryStore>,
        ctx: ServiceContext,
    }

    impl World {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let ctx = ServiceContext::new(
                store.clone(),
                Arc::new(MemoryDirectory::default()),
                ServicesConfig::default(),
            );
            Self { store, ctx }
        }

        async fn employees(&self, count: usize) -> Vec<Employee> {
            let uow = UnitOfWork::new(self.store.clone());
            let mut created = Vec::with_capacity(count);
            for n in 0..count {
                let mut employee = Employee::new(Id::new_v4());
                employee.first_name = Some(format!("Employee {}", n));
                created.push(uow.employees().add(employee).unwrap());
            }
            uow.commit().await.unwrap();
            created
        }
    }

    #[tokio::test]
    async fn test_project_add_persists_open_end_and_resolved_members() {
        let world = World::new();
        let staff = world.employees(2).await;
        let ghost = Id::new_v4();
        let commits_before = world.store.commits();

        let mut dto = ProjectDto::new(Utc::now());
        dto.name = Some("P1".into());
        dto.priority = 100;
        dto.employees = Some(vec![
            EmployeeDto::reference(staff[0].id),
            EmployeeDto::reference(ghost),
            EmployeeDto::reference(staff[1].id),
        ]);

        let created = world.ctx.projects().add(Some(dto)).await.unwrap();
        assert_eq!(world.store.commits(), commits_before + 1);

        let stored = world
            .ctx
            .projects()
            .get(|p| p.name.as_deref() == Some("P1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.end, None);
        assert_eq!(stored.priority, 100);
        assert_eq!(stored.employee_ids(), vec![staff[0].id, staff[1].id]);
    }

    #[tokio::test]
    async fn test_objective_update_for_absent_id_inserts() {
        let world = World::new();
        let staff = world.employees(1).await;
        let project = world
            .ctx
            .projects()
            .add(Some(ProjectDto::new(Utc::now())))
            .await
            .unwrap();

        let mut dto = ObjectiveDto::new(project.id);
        dto.id = Id::new_v4();
        dto.name = Some("Write report".into());
        dto.status = ObjectiveStatus::Done;
        dto.employees = Some(vec![EmployeeDto::reference(staff[0].id)]);

        world.ctx.objectives().update(Some(dto.clone())).await.unwrap();

        let stored = world
            .ctx
            .objectives()
            .get_by_id(dto.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name.as_deref(), Some("Write report"));
        assert_eq!(stored.status, ObjectiveStatus::Done);
        assert_eq!(stored.project.as_ref().map(|p| p.id), Some(project.id));
        assert_eq!(stored.employee_ids(), vec![staff[0].id]);
    }

    #[tokio::test]
    async fn test_objective_add_drops_unknown_employee_silently() {
        let world = World::new();
        let project = world
            .ctx
            .projects()
            .add(Some(ProjectDto::new(Utc::now())))
            .await
            .unwrap();
        let ghost = Id::new_v4();

        let mut dto = ObjectiveDto::new(project.id);
        dto.employees = Some(vec![EmployeeDto::reference(ghost)]);
        let created = world.ctx.objectives().add(Some(dto)).await.unwrap();

        let stored = world
            .ctx
            .objectives()
            .get_by_id(created.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.employee_ids().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_a_project_removes_its_objectives() {
        let world = World::new();
        let project = world
            .ctx
            .projects()
            .add(Some(ProjectDto::new(Utc::now())))
            .await
            .unwrap();
        let objective = world
            .ctx
            .objectives()
            .add(Some(ObjectiveDto::new(project.id)))
            .await
            .unwrap();

        world.ctx.projects().delete(project.id).await.unwrap();

        assert!(world
            .ctx
            .objectives()
            .get_by_id(objective.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deletes_of_unknown_ids_fail_without_committing() {
        let world = World::new();
        let commits = world.store.commits();
        let id = Id::new_v4();

        for result in [
            world.ctx.projects().delete(id).await,
            world.ctx.objectives().delete(id).await,
            world.ctx.employees().delete(id).await,
        ] {
            assert!(matches!(result, Err(ServiceError::NotFound { id: missing, .. }) if missing == id));
        }
        assert_eq!(world.store.commits(), commits);
    }

    #[tokio::test]
    async fn test_null_items_fail_before_any_io() {
        let world = World::new();

        assert!(world.ctx.projects().add(None).await.is_err());
        assert!(world.ctx.projects().update(None).await.is_err());
        assert!(world.ctx.objectives().add(None).await.is_err());
        assert!(world.ctx.objectives().update(None).await.is_err());
        assert!(world.ctx.employees().update(None).await.is_err());
        assert!(world.ctx.employees().register(None, "Secret1!").await.is_err());

        assert_eq!(world.store.reads(), 0);
        assert_eq!(world.store.commits(), 0);
    }
}
