//! Startup seed data
//!
//! Ensures the fixed roles, one administrator and a default project exist.
//! Every step checks first, so running it on every start is harmless.

use chrono::Utc;
use pm_auth::{NewAccount, RoleName};
use pm_core::config::SeedConfig;
use pm_models::{EmployeeDto, ProjectDto};
use serde::Serialize;

use crate::context::ServiceContext;
use crate::error::ServiceResult;

/// What a seeding run created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub roles_created: Vec<String>,
    pub admin_created: bool,
    pub admin_account_restored: bool,
    pub project_created: bool,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.roles_created.is_empty()
            && !self.admin_created
            && !self.admin_account_restored
            && !self.project_created
    }
}

pub async fn ensure_seed_data(ctx: &ServiceContext, config: &SeedConfig) -> ServiceResult<SeedReport> {
    let mut report = SeedReport::default();
    if !config.enabled {
        tracing::info!("seeding disabled");
        return Ok(report);
    }

    let directory = ctx.directory();

    for role in RoleName::ALL {
        if directory.find_role_by_name(role.as_str()).await?.is_none() {
            directory.create_role(role.as_str()).await?;
            report.roles_created.push(role.to_string());
        }
    }

    let admin_id = match directory.find_by_email(&config.admin_email).await? {
        Some(account) => account.id,
        None => {
            let admin_role = directory
                .find_role_by_name(RoleName::Admin.as_str())
                .await?
                .map(|role| role.id);

            let email = config.admin_email.trim().to_string();
            let stored = {
                let email = email.clone();
                ctx.employees()
                    .get(move |e| {
                        e.email
                            .as_deref()
                            .is_some_and(|stored| stored.eq_ignore_ascii_case(&email))
                    })
                    .await?
            };

            match stored {
                // The directory is not persistent; the row outlives it.
                Some(existing) => {
                    let account = directory
                        .create(
                            NewAccount {
                                id: existing.id,
                                email: email.clone(),
                                user_name: email,
                                first_name: existing.first_name.clone(),
                            },
                            &config.admin_password,
                        )
                        .await?;
                    if admin_role.is_some() {
                        directory
                            .add_to_roles(account.id, &[RoleName::Admin.to_string()])
                            .await?;
                    }
                    tracing::info!(id = %account.id, "admin account restored for existing employee");
                    report.admin_account_restored = true;
                    account.id
                }
                None => {
                    let item = EmployeeDto {
                        email: Some(email),
                        first_name: Some(config.admin_first_name.clone()),
                        roles: admin_role.map(|id| vec![id]),
                        ..EmployeeDto::default()
                    };
                    let admin = ctx
                        .employees()
                        .register(Some(item), &config.admin_password)
                        .await?;
                    report.admin_created = true;
                    admin.id
                }
            }
        }
    };

    let defaults = &config.default_project;
    if defaults.enabled && ctx.projects().get_all().await?.is_empty() {
        let mut project = ProjectDto::new(Utc::now());
        project.name = Some(defaults.name.clone());
        project.customer_name = Some(defaults.customer_name.clone());
        project.performer_name = Some(defaults.performer_name.clone());
        project.priority = defaults.priority;
        project.supervisor_id = admin_id;
        project.employees = Some(vec![EmployeeDto::reference(admin_id)]);
        ctx.projects().add(Some(project)).await?;
        report.project_created = true;
    }

    if report.is_empty() {
        tracing::debug!("seed data already present");
    } else {
        tracing::info!(?report, "seed data created");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_auth::{AccountDirectory, MemoryDirectory};
    use pm_core::config::ServicesConfig;
    use pm_db::MemoryStore;
    use std::sync::Arc;

    fn context() -> ServiceContext {
        ServiceContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDirectory::default()),
            ServicesConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let ctx = context();
        let config = SeedConfig::default();

        let first = ensure_seed_data(&ctx, &config).await.unwrap();
        assert_eq!(first.roles_created.len(), 3);
        assert!(first.admin_created);
        assert!(first.project_created);

        let second = ensure_seed_data(&ctx, &config).await.unwrap();
        assert!(second.is_empty());

        let projects = ctx.projects().get_all().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name.as_deref(), Some("Test"));
        assert_eq!(projects[0].priority, 100);

        let admin = ctx
            .directory()
            .find_by_email(&config.admin_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projects[0].employee_ids(), vec![admin.id]);
        assert_eq!(
            ctx.directory().get_roles(admin.id).await.unwrap(),
            vec!["Admin".to_string()]
        );
        assert!(ctx
            .directory()
            .check_password(admin.id, &config.admin_password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_restart_with_fresh_directory_reuses_admin_row() {
        let store = Arc::new(MemoryStore::new());
        let config = SeedConfig::default();
        let start = || {
            ServiceContext::new(
                store.clone(),
                Arc::new(MemoryDirectory::default()),
                ServicesConfig::default(),
            )
        };

        let first = start();
        assert!(ensure_seed_data(&first, &config).await.unwrap().admin_created);
        let admin_id = first.employees().get_all().await.unwrap()[0].id;

        let second = start();
        let report = ensure_seed_data(&second, &config).await.unwrap();
        assert!(!report.admin_created);
        assert!(report.admin_account_restored);
        assert!(!report.project_created);

        let employees = second.employees().get_all().await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].id, admin_id);

        let account = second
            .directory()
            .find_by_email(&config.admin_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.id, admin_id);
        assert_eq!(
            second.directory().get_roles(admin_id).await.unwrap(),
            vec!["Admin".to_string()]
        );
        assert!(second
            .directory()
            .check_password(admin_id, &config.admin_password)
            .await
            .unwrap());

        let projects = second.projects().get_all().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].supervisor_id, admin_id);
    }

    #[tokio::test]
    async fn test_disabled_seed_does_nothing() {
        let ctx = context();
        let config = SeedConfig {
            enabled: false,
            ..SeedConfig::default()
        };

        assert!(ensure_seed_data(&ctx, &config).await.unwrap().is_empty());
        assert!(ctx.directory().roles().await.unwrap().is_empty());
    }
}
