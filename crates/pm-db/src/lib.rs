//! # pm-db
//!
//! Persistence layer for Project Manager RS.
//!
//! Services never talk to a store directly. They open a [`UnitOfWork`], read
//! through its [`Repository`] handles, stage changes, and commit once. A
//! [`Store`] applies a whole commit atomically; two are provided:
//! - [`MemoryStore`] for tests and the default CLI setup
//! - [`PgStore`] for PostgreSQL, on top of the [`Database`] pool

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;
pub mod store;
pub mod unit_of_work;

pub use memory::MemoryStore;
pub use pool::{Database, PoolStats};
pub use postgres::PgStore;
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use store::{Change, Record, StagedChange, Store, Table};
pub use unit_of_work::UnitOfWork;
