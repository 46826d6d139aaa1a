//! Unit of work
//!
//! Hands out one memoized [`Repository`] per entity type and commits every
//! change they staged, across types and in staging order, as one write.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pm_models::{Employee, Objective, Project};

use crate::repository::{Repository, RepositoryResult, Session};
use crate::store::{Record, Store};

type AnyRepository = Arc<dyn Any + Send + Sync>;

pub struct UnitOfWork {
    session: Arc<Session>,
    repositories: Mutex<HashMap<TypeId, AnyRepository>>,
}

impl UnitOfWork {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            session: Arc::new(Session::new(store)),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The repository for `T`, created on first use and reused afterwards
    pub fn repository<T: Record>(&self) -> Arc<Repository<T>> {
        let key = TypeId::of::<T>();
        let mut repositories = self.repositories.lock();

        if let Some(existing) = repositories.get(&key) {
            if let Ok(repository) = existing.clone().downcast::<Repository<T>>() {
                return repository;
            }
        }

        tracing::debug!(entity = T::TYPE_NAME, "creating repository");
        let repository = Arc::new(Repository::<T>::new(self.session.clone()));
        repositories.insert(key, repository.clone());
        repository
    }

    pub fn employees(&self) -> Arc<Repository<Employee>> {
        self.repository()
    }

    pub fn projects(&self) -> Arc<Repository<Project>> {
        self.repository()
    }

    pub fn objectives(&self) -> Arc<Repository<Objective>> {
        self.repository()
    }

    /// Number of staged, uncommitted changes
    pub fn pending(&self) -> usize {
        self.session.pending()
    }

    /// Apply every staged change atomically.
    ///
    /// The store is reached even when nothing is staged. Staged changes are
    /// consumed whether or not the write succeeds.
    pub async fn commit(&self) -> RepositoryResult<usize> {
        let store = self.session.store()?;
        let changes = self.session.take_staged();
        let count = changes.len();

        match store.apply(changes).await {
            Ok(()) => {
                tracing::info!(changes = count, "unit of work committed");
                Ok(count)
            }
            Err(error) => {
                tracing::warn!(changes = count, error = %error, "unit of work commit failed");
                Err(error)
            }
        }
    }

    /// Discard staged changes and release the store. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.session.dispose() {
            self.repositories.lock().clear();
            tracing::debug!("unit of work disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.session.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repository::RepositoryError;
    use chrono::Utc;
    use pm_core::traits::Id;
    use pm_models::{Employee, ProjectInclude};

    fn project(name: &str) -> Project {
        let mut project = Project::new(Id::new_v4(), Utc::now());
        project.name = Some(name.to_string());
        project
    }

    #[tokio::test]
    async fn test_repository_is_memoized_per_type() {
        let uow = UnitOfWork::new(Arc::new(MemoryStore::new()));

        let first = uow.projects();
        let second = uow.repository::<Project>();
        assert!(Arc::ptr_eq(&first, &second));

        // a different type gets its own repository, sharing staged changes
        let employees = uow.employees();
        first.add(project("Apollo")).unwrap();
        employees.add(Employee::new(Id::new_v4())).unwrap();
        assert_eq!(uow.pending(), 2);
    }

    #[tokio::test]
    async fn test_staged_changes_invisible_until_commit() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        let apollo = uow.projects().add(project("Apollo")).unwrap();

        assert!(uow.projects().find_by_id(apollo.id, &[]).await.unwrap().is_none());

        assert_eq!(uow.commit().await.unwrap(), 1);
        assert_eq!(uow.pending(), 0);
        let found = uow.projects().find_by_id(apollo.id, &[]).await.unwrap();
        assert_eq!(found.and_then(|p| p.name), Some("Apollo".to_string()));
    }

    #[tokio::test]
    async fn test_commit_spans_types_in_order() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());

        let member = uow.employees().add(Employee::new(Id::new_v4())).unwrap();
        let mut apollo = project("Apollo");
        apollo.employees = Some(vec![member.clone()]);
        let apollo = uow.projects().add(apollo).unwrap();
        uow.commit().await.unwrap();

        let loaded = uow
            .projects()
            .find_by_id(apollo.id, &[ProjectInclude::Employees])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.member_ids(), vec![member.id]);
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn test_empty_commit_still_reaches_store() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        assert_eq!(uow.commit().await.unwrap(), 0);
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());

        uow.projects().add(project("Apollo")).unwrap();
        // objective pointing at a project that does not exist
        uow.objectives()
            .add(pm_models::Objective::new(Id::new_v4(), Id::new_v4()))
            .unwrap();

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKey(_)));
        assert_eq!(uow.pending(), 0);
        assert!(uow.projects().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        let projects = uow.projects();
        projects.add(project("Apollo")).unwrap();

        uow.dispose();
        uow.dispose();

        assert!(uow.is_disposed());
        assert_eq!(uow.pending(), 0);
        assert!(matches!(uow.commit().await, Err(RepositoryError::Disposed)));
        assert!(matches!(projects.add(project("Gemini")), Err(RepositoryError::Disposed)));
        assert!(matches!(projects.find_all().await, Err(RepositoryError::Disposed)));
        assert_eq!(store.commits(), 0);
    }
}
