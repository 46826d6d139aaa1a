//! Shared service wiring
//!
//! The context holds the long-lived collaborators (store, directory, mapper)
//! and hands out services. Each service gets its own unit of work.

use std::sync::Arc;

use pm_auth::{AccountDirectory, Action, CurrentUser, MemoryDirectory, PasswordPolicy};
use pm_core::config::{AppConfig, ServicesConfig, StoreKind};
use pm_db::{Database, MemoryStore, PgStore, RepositoryError, Store, UnitOfWork};
use pm_models::Mapper;

use crate::employees::EmployeeService;
use crate::error::ServiceResult;
use crate::objectives::ObjectiveService;
use crate::projects::ProjectService;

#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn Store>,
    directory: Arc<dyn AccountDirectory>,
    mapper: Arc<Mapper>,
    options: ServicesConfig,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn AccountDirectory>,
        options: ServicesConfig,
    ) -> Self {
        Self {
            store,
            directory,
            mapper: Arc::new(Mapper::new()),
            options,
        }
    }

    /// Build the store and directory described by `config`.
    ///
    /// The PostgreSQL store connects eagerly so a bad URL fails here rather
    /// than on the first query.
    pub async fn from_config(config: &AppConfig) -> ServiceResult<Self> {
        let store: Arc<dyn Store> = match config.store.kind {
            StoreKind::Memory => {
                tracing::info!("using in-memory store");
                Arc::new(MemoryStore::new())
            }
            StoreKind::Postgres => {
                let db = Database::connect(&config.database)
                    .await
                    .map_err(RepositoryError::from)?;
                db.ping().await.map_err(RepositoryError::from)?;
                tracing::info!(stats = ?db.stats(), "using PostgreSQL store");
                Arc::new(PgStore::from_database(&db))
            }
        };
        let directory = Arc::new(MemoryDirectory::new(PasswordPolicy::from(&config.auth)));

        Ok(Self::new(store, directory, config.services.clone()))
    }

    pub fn with_mapper(mut self, mapper: Arc<Mapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    pub fn options(&self) -> &ServicesConfig {
        &self.options
    }

    pub fn unit_of_work(&self) -> Arc<UnitOfWork> {
        Arc::new(UnitOfWork::new(self.store.clone()))
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(self.unit_of_work(), self.mapper.clone())
    }

    pub fn objectives(&self) -> ObjectiveService {
        ObjectiveService::new(self.unit_of_work(), self.mapper.clone(), self.options.clone())
    }

    pub fn employees(&self) -> EmployeeService {
        EmployeeService::new(
            self.unit_of_work(),
            self.directory.clone(),
            self.mapper.clone(),
        )
    }

    /// Role check for `action`, logged when denied.
    pub fn authorize(&self, user: &CurrentUser, action: Action) -> ServiceResult<()> {
        if let Err(error) = user.authorize(action) {
            tracing::warn!(user = %user.user_name, ?action, %error, "access denied");
            return Err(error.into());
        }
        Ok(())
    }
}
