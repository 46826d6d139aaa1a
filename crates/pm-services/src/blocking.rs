//! Synchronous facade over the async services
//!
//! Each wrapper drives the async service on a shared current-thread runtime,
//! so ordering and error semantics are those of the async operation. Must not
//! be used from inside another tokio runtime: `block_on` panics there.

use std::sync::Arc;

use pm_core::config::{AppConfig, SeedConfig};
use pm_core::traits::Id;
use pm_models::{Employee, EmployeeDto, Objective, ObjectiveDto, Project, ProjectDto};
use tokio::runtime::{Builder, Runtime};

use crate::context::ServiceContext;
use crate::employees::EmployeeService;
use crate::error::ServiceResult;
use crate::objectives::ObjectiveService;
use crate::projects::ProjectService;
use crate::query::ProjectSort;
use crate::seed::{ensure_seed_data, SeedReport};

fn runtime() -> ServiceResult<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Owns the runtime and hands out blocking services
pub struct BlockingContext {
    ctx: ServiceContext,
    runtime: Arc<Runtime>,
}

impl BlockingContext {
    pub fn new(ctx: ServiceContext) -> ServiceResult<Self> {
        Ok(Self {
            ctx,
            runtime: Arc::new(runtime()?),
        })
    }

    /// Build the store and directory from configuration.
    pub fn open(config: &AppConfig) -> ServiceResult<Self> {
        let runtime = runtime()?;
        let ctx = runtime.block_on(ServiceContext::from_config(config))?;
        Ok(Self {
            ctx,
            runtime: Arc::new(runtime),
        })
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    pub fn seed(&self, config: &SeedConfig) -> ServiceResult<SeedReport> {
        self.runtime.block_on(ensure_seed_data(&self.ctx, config))
    }

    pub fn projects(&self) -> BlockingProjectService {
        BlockingProjectService {
            inner: self.ctx.projects(),
            runtime: self.runtime.clone(),
        }
    }

    pub fn objectives(&self) -> BlockingObjectiveService {
        BlockingObjectiveService {
            inner: self.ctx.objectives(),
            runtime: self.runtime.clone(),
        }
    }

    pub fn employees(&self) -> BlockingEmployeeService {
        BlockingEmployeeService {
            inner: self.ctx.employees(),
            runtime: self.runtime.clone(),
        }
    }
}

pub struct BlockingProjectService {
    inner: ProjectService,
    runtime: Arc<Runtime>,
}

impl BlockingProjectService {
    pub fn add(&self, item: Option<ProjectDto>) -> ServiceResult<ProjectDto> {
        self.runtime.block_on(self.inner.add(item))
    }

    pub fn update(&self, item: Option<ProjectDto>) -> ServiceResult<ProjectDto> {
        self.runtime.block_on(self.inner.update(item))
    }

    pub fn delete(&self, id: Id) -> ServiceResult<()> {
        self.runtime.block_on(self.inner.delete(id))
    }

    pub fn get<P>(&self, predicate: P) -> ServiceResult<Option<ProjectDto>>
    where
        P: Fn(&Project) -> bool + Send,
    {
        self.runtime.block_on(self.inner.get(predicate))
    }

    pub fn get_by_id(&self, id: Id) -> ServiceResult<Option<ProjectDto>> {
        self.runtime.block_on(self.inner.get_by_id(id))
    }

    pub fn get_all(&self) -> ServiceResult<Vec<ProjectDto>> {
        self.runtime.block_on(self.inner.get_all())
    }

    pub fn search(&self, term: Option<&str>, sort: ProjectSort) -> ServiceResult<Vec<ProjectDto>> {
        self.runtime.block_on(self.inner.search(term, sort))
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

pub struct BlockingObjectiveService {
    inner: ObjectiveService,
    runtime: Arc<Runtime>,
}

impl BlockingObjectiveService {
    pub fn add(&self, item: Option<ObjectiveDto>) -> ServiceResult<ObjectiveDto> {
        self.runtime.block_on(self.inner.add(item))
    }

    pub fn update(&self, item: Option<ObjectiveDto>) -> ServiceResult<ObjectiveDto> {
        self.runtime.block_on(self.inner.update(item))
    }

    pub fn delete(&self, id: Id) -> ServiceResult<()> {
        self.runtime.block_on(self.inner.delete(id))
    }

    pub fn get<P>(&self, predicate: P) -> ServiceResult<Option<ObjectiveDto>>
    where
        P: Fn(&Objective) -> bool + Send,
    {
        self.runtime.block_on(self.inner.get(predicate))
    }

    pub fn get_by_id(&self, id: Id) -> ServiceResult<Option<ObjectiveDto>> {
        self.runtime.block_on(self.inner.get_by_id(id))
    }

    pub fn get_all(&self) -> ServiceResult<Vec<ObjectiveDto>> {
        self.runtime.block_on(self.inner.get_all())
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

pub struct BlockingEmployeeService {
    inner: EmployeeService,
    runtime: Arc<Runtime>,
}

impl BlockingEmployeeService {
    pub fn register(&self, item: Option<EmployeeDto>, password: &str) -> ServiceResult<EmployeeDto> {
        self.runtime.block_on(self.inner.register(item, password))
    }

    pub fn update(&self, item: Option<EmployeeDto>) -> ServiceResult<EmployeeDto> {
        self.runtime.block_on(self.inner.update(item))
    }

    pub fn delete(&self, id: Id) -> ServiceResult<()> {
        self.runtime.block_on(self.inner.delete(id))
    }

    pub fn get<P>(&self, predicate: P) -> ServiceResult<Option<EmployeeDto>>
    where
        P: Fn(&Employee) -> bool + Send,
    {
        self.runtime.block_on(self.inner.get(predicate))
    }

    pub fn get_by_id(&self, id: Id) -> ServiceResult<Option<EmployeeDto>> {
        self.runtime.block_on(self.inner.get_by_id(id))
    }

    pub fn get_all(&self) -> ServiceResult<Vec<EmployeeDto>> {
        self.runtime.block_on(self.inner.get_all())
    }

    pub fn search(&self, term: Option<&str>) -> ServiceResult<Vec<EmployeeDto>> {
        self.runtime.block_on(self.inner.search(term))
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use chrono::Utc;

    fn context() -> BlockingContext {
        BlockingContext::open(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_blocking_round_trip() {
        let ctx = context();
        let report = ctx.seed(&SeedConfig::default()).unwrap();
        assert!(report.project_created);

        let mut dto = ProjectDto::new(Utc::now());
        dto.name = Some("Vostok".into());
        let created = ctx.projects().add(Some(dto)).unwrap();

        let found = ctx
            .projects()
            .get(|p| p.name.as_deref() == Some("Vostok"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(ctx.projects().get_all().unwrap().len(), 2);
        assert!(!ctx.context().options().enforce_assignee_membership);

        ctx.projects().delete(created.id).unwrap();
        assert!(ctx.projects().get_by_id(created.id).unwrap().is_none());
    }

    #[test]
    fn test_blocking_errors_match_async() {
        let ctx = context();
        assert!(matches!(
            ctx.objectives().add(None),
            Err(ServiceError::ArgumentNull { param: "item" })
        ));
        assert_eq!(
            ctx.employees().delete(Id::new_v4()).unwrap_err().error_code(),
            "not_found"
        );
    }
}
