//! Core traits shared by entities and the persistence layer.

use std::fmt::Debug;

use uuid::Uuid;

/// Primary key type. The nil UUID marks an entity that has no id yet.
pub type Id = Uuid;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Id;

    fn is_new_record(&self) -> bool {
        self.id().is_nil()
    }
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Clone + Send + Sync + 'static {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;

    /// Navigation relations that a read can load eagerly.
    type Include: Copy + Eq + Debug + Send + Sync + 'static;
}

/// Returns `id` unless it is nil, in which case a fresh v4 id is generated.
pub fn assign_id(id: Id) -> Id {
    if id.is_nil() {
        Uuid::new_v4()
    } else {
        id
    }
}
