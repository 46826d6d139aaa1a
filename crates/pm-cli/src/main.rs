//! Project Manager administrative CLI
//!
//! Runs one service operation per invocation and prints the result as JSON.
//! The acting role is checked before the store is opened. An in-memory store
//! is seeded on every run so it starts with the administrator and the default
//! project; a persistent store is only seeded by `pm seed`.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pm_auth::{Action, CurrentUser, RoleName};
use pm_core::config::LoggingConfig;
use pm_core::config::StoreKind;
use pm_core::AppConfig;
use pm_models::{EmployeeDto, ObjectiveDto, ObjectiveStatus, ProjectDto};
use pm_services::blocking::BlockingContext;
use pm_services::ProjectSort;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pm", about = "Manage projects, objectives and employees")]
struct Opts {
    /// Configuration file (defaults to config/default.* when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Role to act as: admin, team-lead, user or anonymous
    #[arg(long, global = true, default_value = "admin")]
    role: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ensure roles, the administrator and the default project exist
    Seed,
    Projects {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Objectives {
        #[command(subcommand)]
        command: ObjectiveCommand,
    },
    Employees {
        #[command(subcommand)]
        command: EmployeeCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
        /// name, start or priority
        #[arg(long, default_value_t = ProjectSort::Name)]
        sort: ProjectSort,
    },
    Show {
        id: Uuid,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        performer: Option<String>,
        #[arg(long)]
        supervisor: Option<Uuid>,
        /// RFC 3339; defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        /// Employee id; repeat for several members
        #[arg(long = "member")]
        members: Vec<Uuid>,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum ObjectiveCommand {
    Show {
        id: Uuid,
    },
    Add {
        #[arg(long)]
        project: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        author: Option<String>,
        /// to-do, in-progress or done
        #[arg(long, default_value_t = ObjectiveStatus::ToDo)]
        status: ObjectiveStatus,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        /// Employee id; repeat for several assignees
        #[arg(long = "assignee")]
        assignees: Vec<Uuid>,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum EmployeeCommand {
    List {
        /// Matches first name, family name or patronymic
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: Uuid,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let opts = Opts::parse();
    let config = AppConfig::load(opts.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.logging);
    tracing::debug!(store = ?config.store.kind, role = %opts.role, "configuration loaded");

    let user = acting_user(&opts.role)?;
    user.authorize(opts.command.action())?;

    let app = BlockingContext::open(&config).context("opening store")?;
    let seeded = if opts.command.seeds(config.store.kind) {
        Some(app.seed(&config.seed)?)
    } else {
        None
    };

    match opts.command {
        Command::Seed => print(&seeded),
        Command::Projects { command } => run_projects(&app, command),
        Command::Objectives { command } => run_objectives(&app, &user, command),
        Command::Employees { command } => run_employees(&app, command),
    }
}

impl Command {
    fn action(&self) -> Action {
        match self {
            Command::Seed => Action::Seed,
            Command::Projects { command } => match command {
                ProjectCommand::List { .. } => Action::ListProjects,
                ProjectCommand::Show { .. } => Action::ViewProject,
                ProjectCommand::Add { .. } => Action::AddProject,
                ProjectCommand::Delete { .. } => Action::DeleteProject,
            },
            Command::Objectives { command } => match command {
                ObjectiveCommand::Show { .. } => Action::ViewObjectives,
                ObjectiveCommand::Add { .. } => Action::AddObjective,
                ObjectiveCommand::Delete { .. } => Action::DeleteObjective,
            },
            Command::Employees { command } => match command {
                EmployeeCommand::List { .. } => Action::ViewEmployees,
                EmployeeCommand::Show { .. } => Action::ViewEmployee,
            },
        }
    }

    /// Whether seed data is written before running this command.
    fn seeds(&self, store: StoreKind) -> bool {
        matches!(self, Command::Seed) || store == StoreKind::Memory
    }
}

fn run_projects(app: &BlockingContext, command: ProjectCommand) -> anyhow::Result<()> {
    let projects = app.projects();

    match command {
        ProjectCommand::List { search, sort } => {
            print(&projects.search(search.as_deref(), sort)?)
        }
        ProjectCommand::Show { id } => {
            let project = projects
                .get_by_id(id)?
                .with_context(|| format!("project {} not found", id))?;
            print(&project)
        }
        ProjectCommand::Add {
            name,
            customer,
            performer,
            supervisor,
            start,
            end,
            priority,
            members,
        } => {
            let mut dto = ProjectDto::new(start.unwrap_or_else(Utc::now));
            dto.name = Some(name);
            dto.customer_name = customer;
            dto.performer_name = performer;
            dto.supervisor_id = supervisor.unwrap_or_default();
            dto.end = end;
            dto.priority = priority;
            dto.employees = Some(members.into_iter().map(EmployeeDto::reference).collect());
            print(&projects.add(Some(dto))?)
        }
        ProjectCommand::Delete { id } => {
            projects.delete(id)?;
            print(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn run_objectives(
    app: &BlockingContext,
    user: &CurrentUser,
    command: ObjectiveCommand,
) -> anyhow::Result<()> {
    let objectives = app.objectives();

    match command {
        ObjectiveCommand::Show { id } => {
            let objective = objectives
                .get_by_id(id)?
                .with_context(|| format!("objective {} not found", id))?;
            print(&objective)
        }
        ObjectiveCommand::Add {
            project,
            name,
            author,
            status,
            comment,
            priority,
            assignees,
        } => {
            let mut dto = ObjectiveDto::new(project);
            dto.name = Some(name);
            dto.author = author.or_else(|| Some(user.user_name.clone()));
            dto.status = status;
            dto.comment = comment;
            dto.priority = priority;
            dto.employees = Some(assignees.into_iter().map(EmployeeDto::reference).collect());
            print(&objectives.add(Some(dto))?)
        }
        ObjectiveCommand::Delete { id } => {
            objectives.delete(id)?;
            print(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn run_employees(app: &BlockingContext, command: EmployeeCommand) -> anyhow::Result<()> {
    let employees = app.employees();

    match command {
        EmployeeCommand::List { search } => {
                    print(&employees.search(search.as_deref())?)
        }
        EmployeeCommand::Show { id } => {
            let employee = employees
                .get_by_id(id)?
                .with_context(|| format!("employee {} not found", id))?;
            print(&employee)
        }
    }
}

/// `anonymous` acts without signing in; anything else must name a role.
fn acting_user(role: &str) -> anyhow::Result<CurrentUser> {
    if role.eq_ignore_ascii_case("anonymous") {
        return Ok(CurrentUser::anonymous());
    }
    let role: RoleName = role.parse()?;
    Ok(CurrentUser::new(Uuid::nil(), format!("cli-{}", role.as_str().to_lowercase())).with_role(role))
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.clone().into());

    let json = logging.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let text = (!logging.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pm_auth::AuthError;

    #[test]
    fn test_cli_definition() {
        Opts::command().debug_assert();
    }

    #[test]
    fn test_parse_project_add() {
        let opts = Opts::parse_from([
            "pm", "--role", "team-lead", "projects", "add", "--name", "P1", "--priority", "100",
            "--member", "6f9619ff-8b86-d011-b42d-00c04fc964ff",
        ]);
        assert_eq!(opts.role, "team-lead");
        match opts.command {
            Command::Projects {
                command: ProjectCommand::Add { name, priority, members, end, .. },
            } => {
                assert_eq!(name, "P1");
                assert_eq!(priority, 100);
                assert_eq!(members.len(), 1);
                assert!(end.is_none());
            }
            _ => panic!("expected projects add"),
        }
    }

    #[test]
    fn test_parse_sort_and_status() {
        let opts = Opts::parse_from(["pm", "projects", "list", "--sort", "priority"]);
        assert!(matches!(
            opts.command,
            Command::Projects {
                command: ProjectCommand::List { sort: ProjectSort::Priority, .. }
            }
        ));

        let result = Opts::try_parse_from([
            "pm", "objectives", "add", "--project", "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "--name", "x", "--status", "blocked",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_anonymous_delete_is_rejected_before_any_work() {
        let opts = Opts::parse_from([
            "pm", "--role", "anonymous", "projects", "delete",
            "6f9619ff-8b86-d011-b42d-00c04fc964ff",
        ]);
        let action = opts.command.action();
        assert_eq!(action, Action::DeleteProject);
        assert_eq!(
            acting_user(&opts.role).unwrap().authorize(action),
            Err(AuthError::Unauthenticated(Action::DeleteProject))
        );
    }

    #[test]
    fn test_seed_needs_admin() {
        let opts = Opts::parse_from(["pm", "--role", "team-lead", "seed"]);
        assert!(!acting_user(&opts.role).unwrap().can(opts.command.action()));
        assert!(acting_user("admin").unwrap().can(Action::Seed));
    }

    #[test]
    fn test_persistent_store_is_seeded_only_on_request() {
        let list = Opts::parse_from(["pm", "projects", "list"]).command;
        assert!(list.seeds(StoreKind::Memory));
        assert!(!list.seeds(StoreKind::Postgres));

        let seed = Opts::parse_from(["pm", "seed"]).command;
        assert!(seed.seeds(StoreKind::Postgres));
    }

    #[test]
    fn test_acting_user() {
        assert!(acting_user("anonymous").unwrap().is_anonymous());
        let lead = acting_user("team-lead").unwrap();
        assert!(lead.has_role(RoleName::TeamLead));
        assert!(lead.can(Action::AddProject));
        assert!(acting_user("root").is_err());
    }
}
