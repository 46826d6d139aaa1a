//! Generic repository
//!
//! One [`Repository`] per entity type, handed out by a
//! [`UnitOfWork`](crate::UnitOfWork). Reads always go to the store; writes are
//! only staged and become durable when the unit of work commits.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pm_core::traits::{Id, Identifiable};

use crate::store::{Change, Record, StagedChange, Store};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Unit of work has been disposed")]
    Disposed,
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// State shared by a unit of work and all of its repositories
pub(crate) struct Session {
    store: RwLock<Option<Arc<dyn Store>>>,
    staged: Mutex<Vec<StagedChange>>,
}

impl Session {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store: RwLock::new(Some(store)),
            staged: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn store(&self) -> RepositoryResult<Arc<dyn Store>> {
        self.store.read().clone().ok_or(RepositoryError::Disposed)
    }

    pub(crate) fn stage(&self, change: StagedChange) -> RepositoryResult<()> {
        let store = self.store.read();
        if store.is_none() {
            return Err(RepositoryError::Disposed);
        }
        self.staged.lock().push(change);
        Ok(())
    }

    pub(crate) fn take_staged(&self) -> Vec<StagedChange> {
        std::mem::take(&mut *self.staged.lock())
    }

    pub(crate) fn pending(&self) -> usize {
        self.staged.lock().len()
    }

    /// Drops staged changes and the store handle. Returns false when already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let released = self.store.write().take().is_some();
        self.staged.lock().clear();
        released
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.store.read().is_none()
    }
}

/// Data access for one entity type
pub struct Repository<T: Record> {
    session: Arc<Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// Every stored row, without navigation
    pub async fn find_all(&self) -> RepositoryResult<Vec<T>> {
        let store = self.session.store()?;
        let items = T::table(store.as_ref()).select_all().await?;
        tracing::debug!(entity = T::TYPE_NAME, count = items.len(), "loaded all");
        Ok(items)
    }

    /// Every stored row with the given relations loaded
    pub async fn find_all_including(&self, includes: &[T::Include]) -> RepositoryResult<Vec<T>> {
        let store = self.session.store()?;
        let table = T::table(store.as_ref());
        let mut items = table.select_all().await?;
        for item in items.iter_mut() {
            for include in includes {
                table.include(item, *include).await?;
            }
        }
        tracing::debug!(
            entity = T::TYPE_NAME,
            count = items.len(),
            ?includes,
            "loaded all with relations"
        );
        Ok(items)
    }

    /// First row matching `predicate`, with the given relations loaded.
    /// `Ok(None)` when nothing matches.
    pub async fn find_one<P>(&self, predicate: P, includes: &[T::Include]) -> RepositoryResult<Option<T>>
    where
        P: Fn(&T) -> bool + Send,
    {
        let store = self.session.store()?;
        let table = T::table(store.as_ref());
        let found = table.select_all().await?.into_iter().find(|item| predicate(item));
        match found {
            Some(mut item) => {
                for include in includes {
                    table.include(&mut item, *include).await?;
                }
                Ok(Some(item))
            }
            None => {
                tracing::debug!(entity = T::TYPE_NAME, "no row matched predicate");
                Ok(None)
            }
        }
    }

    /// Keyed lookup, with the given relations loaded
    pub async fn find_by_id(&self, id: Id, includes: &[T::Include]) -> RepositoryResult<Option<T>> {
        let store = self.session.store()?;
        let table = T::table(store.as_ref());
        let Some(mut item) = table.select_by_id(id).await? else {
            tracing::debug!(entity = T::TYPE_NAME, %id, "row not found");
            return Ok(None);
        };
        for include in includes {
            table.include(&mut item, *include).await?;
        }
        Ok(Some(item))
    }

    /// Stage an insert
    pub fn add(&self, item: T) -> RepositoryResult<T> {
        self.stage(Change::Insert(item.clone()))?;
        Ok(item)
    }

    /// Stage a full overwrite (inserting when the row is absent)
    pub fn update(&self, item: T) -> RepositoryResult<T> {
        self.stage(Change::Update(item.clone()))?;
        Ok(item)
    }

    /// Stage a delete
    pub fn remove(&self, item: &T) -> RepositoryResult<()> {
        self.remove_by_id(item.id())
    }

    pub fn remove_by_id(&self, id: Id) -> RepositoryResult<()> {
        self.stage(Change::Delete(id))
    }

    fn stage(&self, change: Change<T>) -> RepositoryResult<()> {
        tracing::debug!(
            entity = T::TYPE_NAME,
            id = %change.id(),
            change = change.kind(),
            "staged"
        );
        self.session.stage(T::stage(change))
    }
}
