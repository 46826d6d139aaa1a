//! Employee service
//!
//! Employees live in two places: the account directory (credentials, email,
//! roles) and the employee table (profile). Updates reconcile the directory
//! first and then stage the profile change, committing once at the end.

use std::sync::Arc;

use pm_auth::{AccountDirectory, DirectoryError, NewAccount};
use pm_core::traits::{assign_id, Id};
use pm_db::UnitOfWork;
use pm_models::{Employee, EmployeeDto, EmployeeInclude, Mapper};
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};
use crate::query::{employee_matches, normalize_term};

const DETAIL: &[EmployeeInclude] = &[EmployeeInclude::Projects];

pub struct EmployeeService {
    uow: Arc<UnitOfWork>,
    directory: Arc<dyn AccountDirectory>,
    mapper: Arc<Mapper>,
}

impl EmployeeService {
    pub fn new(
        uow: Arc<UnitOfWork>,
        directory: Arc<dyn AccountDirectory>,
        mapper: Arc<Mapper>,
    ) -> Self {
        Self {
            uow,
            directory,
            mapper,
        }
    }

    /// Create the directory account and the employee row under one id.
    ///
    /// The email doubles as the user name. If the row cannot be committed
    /// the account is removed again.
    pub async fn register(&self, item: Option<EmployeeDto>, password: &str) -> ServiceResult<EmployeeDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;

        let email = item
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ServiceError::invalid("email", "can't be blank"))?
            .to_string();

        let account = self
            .directory
            .create(
                NewAccount {
                    id: assign_id(item.id),
                    email: email.clone(),
                    user_name: email.clone(),
                    first_name: item.first_name.clone(),
                },
                password,
            )
            .await?;

        if let Some(role_ids) = &item.roles {
            let names = self.role_names(role_ids).await?;
            self.directory.add_to_roles(account.id, &names).await?;
        }

        let mut employee = self.mapper.employee_from_dto(&item);
        employee.id = account.id;
        employee.email = Some(email.clone());
        employee.user_name = Some(email);
        let employee = self.uow.employees().add(employee)?;

        if let Err(error) = self.uow.commit().await {
            tracing::warn!(id = %account.id, %error, "employee row rejected, removing account");
            if let Err(cleanup) = self.directory.remove(account.id).await {
                tracing::warn!(id = %account.id, error = %cleanup, "account cleanup failed");
            }
            return Err(error.into());
        }

        tracing::info!(id = %employee.id, "employee registered");
        let mut dto = self.mapper.employee_to_dto(&employee);
        dto.roles = item.roles;
        Ok(dto)
    }

    /// Reconcile roles, password and email with the directory, then sync the
    /// profile row. Commits exactly once.
    pub async fn update(&self, item: Option<EmployeeDto>) -> ServiceResult<EmployeeDto> {
        let item = item.ok_or(ServiceError::ArgumentNull { param: "item" })?;
        item.validate()?;
        let id = item.id;

        let account = self.directory.find_by_id(id).await?;
        let current_email = account.and_then(|account| account.email);

        if let Some(role_ids) = &item.roles {
            let names = self.role_names(role_ids).await?;
            let current = self.directory.get_roles(id).await?;
            self.directory.remove_from_roles(id, &current).await?;
            self.directory.add_to_roles(id, &names).await?;
            tracing::info!(%id, removed = ?current, added = ?names, "roles replaced");
        }

        if let Some(password) = &item.password {
            let token = self.directory.generate_password_reset_token(id).await?;
            self.directory.reset_password(id, &token, password).await?;
            tracing::info!(%id, "password reset");
        }

        let new_email = item
            .email
            .as_deref()
            .filter(|email| current_email.as_deref() != Some(*email));
        if let Some(email) = new_email {
            let token = self.directory.generate_change_email_token(id, email).await?;
            self.directory.change_email(id, email, &token).await?;
            self.directory.set_username(id, email).await?;
            tracing::info!(%id, "email changed");
        }

        let employees = self.uow.employees();
        let synced = match employees.find_by_id(id, &[]).await? {
            Some(mut employee) => {
                self.mapper.apply_employee_profile(&mut employee, &item);
                if let Some(email) = new_email {
                    employee.email = Some(email.to_string());
                    employee.user_name = Some(email.to_string());
                }
                Some(employees.update(employee)?)
            }
            None => {
                tracing::debug!(%id, "no employee row to sync");
                None
            }
        };

        self.uow.commit().await?;

        let mut dto = match synced {
            Some(employee) => self.mapper.employee_to_dto(&employee),
            None => EmployeeDto {
                password: None,
                ..item.clone()
            },
        };
        dto.roles = item.roles;
        Ok(dto)
    }

    /// Remove the employee row, then the directory account.
    pub async fn delete(&self, id: Id) -> ServiceResult<()> {
        let employees = self.uow.employees();
        let employee = employees
            .find_by_id(id, &[])
            .await?
            .ok_or_else(|| ServiceError::not_found::<Employee>(id))?;

        employees.remove(&employee)?;
        self.uow.commit().await?;

        match self.directory.remove(id).await {
            Ok(()) => {}
            Err(DirectoryError::AccountNotFound(_)) => {
                tracing::debug!(%id, "employee had no directory account");
            }
            Err(error) => return Err(error.into()),
        }

        tracing::info!(%id, "employee deleted");
        Ok(())
    }

    /// First employee matching `predicate`, with their projects.
    pub async fn get<P>(&self, predicate: P) -> ServiceResult<Option<EmployeeDto>>
    where
        P: Fn(&Employee) -> bool + Send,
    {
        let found = self.uow.employees().find_one(predicate, DETAIL).await?;
        Ok(found.map(|employee| self.mapper.employee_to_dto(&employee)))
    }

    pub async fn get_by_id(&self, id: Id) -> ServiceResult<Option<EmployeeDto>> {
        let found = self.uow.employees().find_by_id(id, DETAIL).await?;
        Ok(found.map(|employee| self.mapper.employee_to_dto(&employee)))
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<EmployeeDto>> {
        let employees = self.uow.employees().find_all().await?;
        Ok(self.to_dtos(&employees))
    }

    /// Employees whose first name, family name or patronymic contains `term`.
    pub async fn search(&self, term: Option<&str>) -> ServiceResult<Vec<EmployeeDto>> {
        let mut employees = self.uow.employees().find_all().await?;
        if let Some(needle) = normalize_term(term) {
            employees.retain(|employee| employee_matches(employee, &needle));
        }
        Ok(self.to_dtos(&employees))
    }

    pub fn dispose(&self) {
        self.uow.dispose();
    }

    async fn role_names(&self, role_ids: &[Id]) -> ServiceResult<Vec<String>> {
        let mut names = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            names.push(self.directory.find_role_by_id(*role_id).await?.name);
        }
        Ok(names)
    }

    fn to_dtos(&self, employees: &[Employee]) -> Vec<EmployeeDto> {
        employees
            .iter()
            .map(|employee| self.mapper.employee_to_dto(employee))
            .collect()
    }
}
