//! # pm-auth
//!
//! Credentials and authorization for Project Manager RS.
//!
//! - [`AccountDirectory`]: the credential store the services talk to
//! - [`MemoryDirectory`]: an in-process directory with Argon2 password hashes
//! - [`PasswordPolicy`]: password strength rules
//! - [`CurrentUser`]: role-based permission checks

pub mod directory;
pub mod memory;
pub mod password;
pub mod permissions;

pub use directory::{Account, AccountDirectory, DirectoryError, DirectoryResult, NewAccount, RoleRecord};
pub use memory::MemoryDirectory;
pub use password::PasswordPolicy;
pub use permissions::{Action, AuthError, CurrentUser, RoleName};
