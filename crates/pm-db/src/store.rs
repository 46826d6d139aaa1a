//! Store abstraction
//!
//! A [`Table`] answers reads for one entity type, a [`Store`] owns all tables
//! and applies a batch of [`StagedChange`]s as one atomic write.

use async_trait::async_trait;
use pm_core::traits::{Entity, Id, Identifiable};
use pm_models::{Employee, Objective, Project};

use crate::repository::RepositoryResult;

/// Read access to the rows of one entity type
#[async_trait]
pub trait Table<T: Entity>: Send + Sync {
    /// Every row, without navigation
    async fn select_all(&self) -> RepositoryResult<Vec<T>>;

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    /// Fill one navigation relation of `item` from the store
    async fn include(&self, item: &mut T, include: T::Include) -> RepositoryResult<()>;
}

/// A pending write for one entity type
///
/// `Update` overwrites the whole row and inserts it when absent. A navigation
/// set that is `Some` replaces the stored association rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Insert(T),
    Update(T),
    Delete(Id),
}

impl<T: Identifiable> Change<T> {
    pub fn id(&self) -> Id {
        match self {
            Change::Insert(item) | Change::Update(item) => item.id(),
            Change::Delete(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Insert(_) => "insert",
            Change::Update(_) => "update",
            Change::Delete(_) => "delete",
        }
    }
}

/// A change tagged with its entity type, in the order it was staged
#[derive(Debug, Clone, PartialEq)]
pub enum StagedChange {
    Employee(Change<Employee>),
    Project(Change<Project>),
    Objective(Change<Objective>),
}

impl StagedChange {
    pub fn entity(&self) -> &'static str {
        match self {
            StagedChange::Employee(_) => Employee::TYPE_NAME,
            StagedChange::Project(_) => Project::TYPE_NAME,
            StagedChange::Objective(_) => Objective::TYPE_NAME,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            StagedChange::Employee(change) => change.id(),
            StagedChange::Project(change) => change.id(),
            StagedChange::Objective(change) => change.id(),
        }
    }
}

/// Backing storage shared by every unit of work
#[async_trait]
pub trait Store: Send + Sync {
    fn employees(&self) -> &dyn Table<Employee>;
    fn projects(&self) -> &dyn Table<Project>;
    fn objectives(&self) -> &dyn Table<Objective>;

    /// Apply every change in order, all or nothing
    async fn apply(&self, changes: Vec<StagedChange>) -> RepositoryResult<()>;
}

/// Entity types the store knows how to persist
pub trait Record: Entity {
    fn stage(change: Change<Self>) -> StagedChange;
    fn table(store: &dyn Store) -> &dyn Table<Self>;
}

impl Record for Employee {
    fn stage(change: Change<Self>) -> StagedChange {
        StagedChange::Employee(change)
    }

    fn table(store: &dyn Store) -> &dyn Table<Self> {
        store.employees()
    }
}

impl Record for Project {
    fn stage(change: Change<Self>) -> StagedChange {
        StagedChange::Project(change)
    }

    fn table(store: &dyn Store) -> &dyn Table<Self> {
        store.projects()
    }
}

impl Record for Objective {
    fn stage(change: Change<Self>) -> StagedChange {
        StagedChange::Objective(change)
    }

    fn table(store: &dyn Store) -> &dyn Table<Self> {
        store.objectives()
    }
}
