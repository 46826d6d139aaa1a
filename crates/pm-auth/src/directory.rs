//! Account directory contract
//!
//! Every operation is keyed by account id. Operations on an id the directory
//! does not know fail with [`DirectoryError::AccountNotFound`].

use async_trait::async_trait;
use pm_core::traits::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Account not found: {0}")]
    AccountNotFound(Id),
    #[error("Role not found: {0}")]
    RoleNotFound(String),
    #[error("Email already taken: {0}")]
    DuplicateEmail(String),
    #[error("Role already exists: {0}")]
    DuplicateRole(String),
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Password rejected: {0}")]
    PasswordPolicy(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Credential record for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Id,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
}

/// Input for [`AccountDirectory::create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub id: Id,
    pub email: String,
    pub user_name: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: Id,
    pub name: String,
}

/// Credential store used by the employee service
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_id(&self, id: Id) -> DirectoryResult<Option<Account>>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Account>>;

    async fn create(&self, account: NewAccount, password: &str) -> DirectoryResult<Account>;

    async fn remove(&self, id: Id) -> DirectoryResult<()>;

    /// Names of the roles the account holds
    async fn get_roles(&self, id: Id) -> DirectoryResult<Vec<String>>;

    async fn remove_from_roles(&self, id: Id, roles: &[String]) -> DirectoryResult<()>;

    async fn add_to_roles(&self, id: Id, roles: &[String]) -> DirectoryResult<()>;

    async fn generate_password_reset_token(&self, id: Id) -> DirectoryResult<String>;

    async fn reset_password(&self, id: Id, token: &str, new_password: &str) -> DirectoryResult<()>;

    async fn generate_change_email_token(&self, id: Id, new_email: &str) -> DirectoryResult<String>;

    async fn change_email(&self, id: Id, new_email: &str, token: &str) -> DirectoryResult<()>;

    async fn set_username(&self, id: Id, user_name: &str) -> DirectoryResult<()>;

    async fn check_password(&self, id: Id, password: &str) -> DirectoryResult<bool>;

    /// Fails with [`DirectoryError::RoleNotFound`] for an unknown id
    async fn find_role_by_id(&self, id: Id) -> DirectoryResult<RoleRecord>;

    async fn find_role_by_name(&self, name: &str) -> DirectoryResult<Option<RoleRecord>>;

    async fn create_role(&self, name: &str) -> DirectoryResult<RoleRecord>;

    async fn roles(&self) -> DirectoryResult<Vec<RoleRecord>>;
}
