//! In-process account directory
//!
//! Passwords are stored as Argon2 hashes. Reset and change-email tokens are
//! single use. Role names match case-insensitively.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use pm_core::traits::Id;
use uuid::Uuid;

use crate::directory::{
    Account, AccountDirectory, DirectoryError, DirectoryResult, NewAccount, RoleRecord,
};
use crate::password::{self, PasswordPolicy};

#[derive(Debug, Clone)]
struct AccountEntry {
    account: Account,
    password_hash: String,
    roles: BTreeSet<String>,
    reset_tokens: Vec<String>,
    /// token -> requested email
    email_tokens: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Id, AccountEntry>,
    roles: Vec<RoleRecord>,
}

impl State {
    fn entry(&self, id: Id) -> DirectoryResult<&AccountEntry> {
        self.accounts.get(&id).ok_or(DirectoryError::AccountNotFound(id))
    }

    fn entry_mut(&mut self, id: Id) -> DirectoryResult<&mut AccountEntry> {
        self.accounts.get_mut(&id).ok_or(DirectoryError::AccountNotFound(id))
    }

    fn email_taken(&self, email: &str, except: Option<Id>) -> bool {
        self.accounts.values().any(|entry| {
            Some(entry.account.id) != except
                && entry
                    .account
                    .email
                    .as_deref()
                    .map(|existing| existing.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
        })
    }

    /// Canonical role name, or `RoleNotFound`
    fn role_name(&self, name: &str) -> DirectoryResult<String> {
        self.roles
            .iter()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .map(|role| role.name.clone())
            .ok_or_else(|| DirectoryError::RoleNotFound(name.to_string()))
    }
}

/// Account directory kept in process memory
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    policy: PasswordPolicy,
    state: RwLock<State>,
}

impl MemoryDirectory {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(State::default()),
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    pub fn account_count(&self) -> usize {
        self.state.read().accounts.len()
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: Id) -> DirectoryResult<Option<Account>> {
        Ok(self.state.read().accounts.get(&id).map(|e| e.account.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Account>> {
        let state = self.state.read();
        Ok(state
            .accounts
            .values()
            .find(|entry| {
                entry
                    .account
                    .email
                    .as_deref()
                    .map(|existing| existing.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .map(|entry| entry.account.clone()))
    }

    async fn create(&self, account: NewAccount, password: &str) -> DirectoryResult<Account> {
        self.policy.check(password)?;
        let password_hash = password::hash_password(password)?;

        let mut state = self.state.write();
        if state.email_taken(&account.email, None) {
            return Err(DirectoryError::DuplicateEmail(account.email));
        }

        let id = pm_core::traits::assign_id(account.id);
        let created = Account {
            id,
            email: Some(account.email),
            user_name: Some(account.user_name),
            first_name: account.first_name,
        };
        state.accounts.insert(
            id,
            AccountEntry {
                account: created.clone(),
                password_hash,
                roles: BTreeSet::new(),
                reset_tokens: Vec::new(),
                email_tokens: HashMap::new(),
            },
        );
        tracing::info!(account_id = %id, "account created");
        Ok(created)
    }

    async fn remove(&self, id: Id) -> DirectoryResult<()> {
        self.state
            .write()
            .accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(DirectoryError::AccountNotFound(id))
    }

    async fn get_roles(&self, id: Id) -> DirectoryResult<Vec<String>> {
        let state = self.state.read();
        Ok(state.entry(id)?.roles.iter().cloned().collect())
    }

    async fn remove_from_roles(&self, id: Id, roles: &[String]) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let entry = state.entry_mut(id)?;
        for role in roles {
            entry.roles.retain(|held| !held.eq_ignore_ascii_case(role));
        }
        Ok(())
    }

    async fn add_to_roles(&self, id: Id, roles: &[String]) -> DirectoryResult<()> {
        let mut state = self.state.write();
        state.entry(id)?;
        let names = roles
            .iter()
            .map(|role| state.role_name(role))
            .collect::<DirectoryResult<Vec<_>>>()?;
        state.entry_mut(id)?.roles.extend(names);
        Ok(())
    }

    async fn generate_password_reset_token(&self, id: Id) -> DirectoryResult<String> {
        let token = password::generate_token();
        self.state.write().entry_mut(id)?.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn reset_password(&self, id: Id, token: &str, new_password: &str) -> DirectoryResult<()> {
        {
            let state = self.state.read();
            if !state.entry(id)?.reset_tokens.iter().any(|t| t == token) {
                return Err(DirectoryError::InvalidToken);
            }
        }
        self.policy.check(new_password)?;
        let password_hash = password::hash_password(new_password)?;

        let mut state = self.state.write();
        let entry = state.entry_mut(id)?;
        let before = entry.reset_tokens.len();
        entry.reset_tokens.retain(|t| t != token);
        if entry.reset_tokens.len() == before {
            return Err(DirectoryError::InvalidToken);
        }
        entry.password_hash = password_hash;
        tracing::info!(account_id = %id, "password reset");
        Ok(())
    }

    async fn generate_change_email_token(&self, id: Id, new_email: &str) -> DirectoryResult<String> {
        let token = password::generate_token();
        self.state
            .write()
            .entry_mut(id)?
            .email_tokens
            .insert(token.clone(), new_email.to_string());
        Ok(token)
    }

    async fn change_email(&self, id: Id, new_email: &str, token: &str) -> DirectoryResult<()> {
        let mut state = self.state.write();
        let requested = state.entry(id)?.email_tokens.get(token).cloned();
        match requested {
            Some(requested) if requested.eq_ignore_ascii_case(new_email) => {}
            _ => return Err(DirectoryError::InvalidToken),
        }
        if state.email_taken(new_email, Some(id)) {
            return Err(DirectoryError::DuplicateEmail(new_email.to_string()));
        }

        let entry = state.entry_mut(id)?;
        entry.email_tokens.remove(token);
        entry.account.email = Some(new_email.to_string());
        tracing::info!(account_id = %id, "email changed");
        Ok(())
    }

    async fn set_username(&self, id: Id, user_name: &str) -> DirectoryResult<()> {
        self.state.write().entry_mut(id)?.account.user_name = Some(user_name.to_string());
        Ok(())
    }

    async fn check_password(&self, id: Id, password: &str) -> DirectoryResult<bool> {
        let hash = self.state.read().entry(id)?.password_hash.clone();
        Ok(password::verify_password(password, &hash))
    }

    async fn find_role_by_id(&self, id: Id) -> DirectoryResult<RoleRecord> {
        self.state
            .read()
            .roles
            .iter()
            .find(|role| role.id == id)
            .cloned()
            .ok_or_else(|| DirectoryError::RoleNotFound(id.to_string()))
    }

    async fn find_role_by_name(&self, name: &str) -> DirectoryResult<Option<RoleRecord>> {
        Ok(self
            .state
            .read()
            .roles
            .iter()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn create_role(&self, name: &str) -> DirectoryResult<RoleRecord> {
        let mut state = self.state.write();
        if state.role_name(name).is_ok() {
            return Err(DirectoryError::DuplicateRole(name.to_string()));
        }
        let role = RoleRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        state.roles.push(role.clone());
        tracing::info!(role = %role.name, "role created");
        Ok(role)
    }

    async fn roles(&self) -> DirectoryResult<Vec<RoleRecord>> {
        Ok(self.state.read().roles.clone())
    }
}
