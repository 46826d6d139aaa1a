//! PostgreSQL store
//!
//! Tables: employees, projects, objectives, project_employees,
//! objective_employees. The schema is provisioned outside this crate; join
//! rows and objectives cascade on delete of their owners.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pm_core::traits::Id;
use pm_models::{
    Employee, EmployeeInclude, Objective, ObjectiveInclude, Project, ProjectInclude,
};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::pool::Database;
use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{Change, StagedChange, Store, Table};

/// Employee database row
#[derive(Debug, Clone, FromRow)]
pub struct EmployeeRow {
    pub id: Id,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub family_name: Option<String>,
    pub patronymic: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            email: row.email,
            user_name: row.user_name,
            first_name: row.first_name,
            family_name: row.family_name,
            patronymic: row.patronymic,
            projects: None,
            objectives: None,
        }
    }
}

/// Project database row
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: Id,
    pub name: Option<String>,
    pub customer_name: Option<String>,
    pub performer_name: Option<String>,
    pub supervisor_id: Id,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub priority: i32,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            customer_name: row.customer_name,
            performer_name: row.performer_name,
            supervisor_id: row.supervisor_id,
            start: row.start_at,
            end: row.end_at,
            priority: row.priority,
            employees: None,
            objectives: None,
        }
    }
}

/// Objective database row
#[derive(Debug, Clone, FromRow)]
pub struct ObjectiveRow {
    pub id: Id,
    pub name: Option<String>,
    pub author: Option<String>,
    pub project_id: Id,
    pub status: String,
    pub comment: Option<String>,
    pub priority: i32,
}

impl TryFrom<ObjectiveRow> for Objective {
    type Error = RepositoryError;

    fn try_from(row: ObjectiveRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| RepositoryError::Corrupt(format!("objective {}: {}", row.id, e)))?;
        Ok(Objective {
            id: row.id,
            name: row.name,
            author: row.author,
            project_id: row.project_id,
            project: None,
            status,
            comment: row.comment,
            priority: row.priority,
            employees: None,
        })
    }
}

fn objectives_from(rows: Vec<ObjectiveRow>) -> RepositoryResult<Vec<Objective>> {
    rows.into_iter().map(Objective::try_from).collect()
}

/// Translate constraint violations into repository errors
fn map_error(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_foreign_key_violation() {
            return RepositoryError::ForeignKey(db.message().to_string());
        }
        if db.is_unique_violation() {
            return RepositoryError::Conflict(db.message().to_string());
        }
    }
    RepositoryError::Database(error)
}

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    async fn project_by_id(&self, id: Id) -> RepositoryResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, customer_name, performer_name, supervisor_id,
                   start_at, end_at, priority
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Project::from))
    }
}

#[async_trait]
impl Table<Employee> for PgStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, email, user_name, first_name, family_name, patronymic
            FROM employees
            ORDER BY family_name, first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, email, user_name, first_name, family_name, patronymic
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::from))
    }

    async fn include(&self, item: &mut Employee, include: EmployeeInclude) -> RepositoryResult<()> {
        match include {
            EmployeeInclude::Projects => {
                let rows = sqlx::query_as::<_, ProjectRow>(
                    r#"
                    SELECT p.id, p.name, p.customer_name, p.performer_name, p.supervisor_id,
                           p.start_at, p.end_at, p.priority
                    FROM projects p
                    JOIN project_employees pe ON pe.project_id = p.id
                    WHERE pe.employee_id = $1
                    ORDER BY p.name
                    "#,
                )
                .bind(item.id)
                .fetch_all(&self.pool)
                .await?;
                item.projects = Some(rows.into_iter().map(Project::from).collect());
            }
            EmployeeInclude::Objectives => {
                let rows = sqlx::query_as::<_, ObjectiveRow>(
                    r#"
                    SELECT o.id, o.name, o.author, o.project_id, o.status, o.comment, o.priority
                    FROM objectives o
                    JOIN objective_employees oe ON oe.objective_id = o.id
                    WHERE oe.employee_id = $1
                    ORDER BY o.priority DESC
                    "#,
                )
                .bind(item.id)
                .fetch_all(&self.pool)
                .await?;
                item.objectives = Some(objectives_from(rows)?);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table<Project> for PgStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, customer_name, performer_name, supervisor_id,
                   start_at, end_at, priority
            FROM projects
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Project>> {
        self.project_by_id(id).await
    }

    async fn include(&self, item: &mut Project, include: ProjectInclude) -> RepositoryResult<()> {
        match include {
            ProjectInclude::Employees => {
                let rows = sqlx::query_as::<_, EmployeeRow>(
                    r#"
                    SELECT e.id, e.email, e.user_name, e.first_name, e.family_name, e.patronymic
                    FROM employees e
                    JOIN project_employees pe ON pe.employee_id = e.id
                    WHERE pe.project_id = $1
                    ORDER BY e.family_name, e.first_name
                    "#,
                )
                .bind(item.id)
                .fetch_all(&self.pool)
                .await?;
                item.employees = Some(rows.into_iter().map(Employee::from).collect());
            }
            ProjectInclude::Objectives => {
                let rows = sqlx::query_as::<_, ObjectiveRow>(
                    r#"
                    SELECT id, name, author, project_id, status, comment, priority
                    FROM objectives
                    WHERE project_id = $1
                    ORDER BY priority DESC
                    "#,
                )
                .bind(item.id)
                .fetch_all(&self.pool)
                .await?;
                item.objectives = Some(objectives_from(rows)?);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table<Objective> for PgStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Objective>> {
        let rows = sqlx::query_as::<_, ObjectiveRow>(
            r#"
            SELECT id, name, author, project_id, status, comment, priority
            FROM objectives
            ORDER BY priority DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        objectives_from(rows)
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Objective>> {
        let row = sqlx::query_as::<_, ObjectiveRow>(
            r#"
            SELECT id, name, author, project_id, status, comment, priority
            FROM objectives
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Objective::try_from).transpose()
    }

    async fn include(&self, item: &mut Objective, include: ObjectiveInclude) -> RepositoryResult<()> {
        match include {
            ObjectiveInclude::Project => {
                item.project = self.project_by_id(item.project_id).await?.map(Box::new);
            }
            ObjectiveInclude::Employees => {
                let rows = sqlx::query_as::<_, EmployeeRow>(
                    r#"
                    SELECT e.id, e.email, e.user_name, e.first_name, e.family_name, e.patronymic
                    FROM employees e
                    JOIN objective_employees oe ON oe.employee_id = e.id
                    WHERE oe.objective_id = $1
                    ORDER BY e.family_name, e.first_name
                    "#,
                )
                .bind(item.id)
                .fetch_all(&self.pool)
                .await?;
                item.employees = Some(rows.into_iter().map(Employee::from).collect());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn employees(&self) -> &dyn Table<Employee> {
        self
    }

    fn projects(&self) -> &dyn Table<Project> {
        self
    }

    fn objectives(&self) -> &dyn Table<Objective> {
        self
    }

    async fn apply(&self, changes: Vec<StagedChange>) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                StagedChange::Employee(change) => write_employee(&mut tx, change).await?,
                StagedChange::Project(change) => write_project(&mut tx, change).await?,
                StagedChange::Objective(change) => write_objective(&mut tx, change).await?,
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

const EMPLOYEE_INSERT: &str = r#"
    INSERT INTO employees (id, email, user_name, first_name, family_name, patronymic)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const EMPLOYEE_UPSERT_TAIL: &str = r#"
    ON CONFLICT (id) DO UPDATE SET
        email = EXCLUDED.email,
        user_name = EXCLUDED.user_name,
        first_name = EXCLUDED.first_name,
        family_name = EXCLUDED.family_name,
        patronymic = EXCLUDED.patronymic
"#;

const PROJECT_INSERT: &str = r#"
    INSERT INTO projects (id, name, customer_name, performer_name, supervisor_id,
                          start_at, end_at, priority)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const PROJECT_UPSERT_TAIL: &str = r#"
    ON CONFLICT (id) DO UPDATE SET
        name = EXCLUDED.name,
        customer_name = EXCLUDED.customer_name,
        performer_name = EXCLUDED.performer_name,
        supervisor_id = EXCLUDED.supervisor_id,
        start_at = EXCLUDED.start_at,
        end_at = EXCLUDED.end_at,
        priority = EXCLUDED.priority
"#;

const OBJECTIVE_INSERT: &str = r#"
    INSERT INTO objectives (id, name, author, project_id, status, comment, priority)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

const OBJECTIVE_UPSERT_TAIL: &str = r#"
    ON CONFLICT (id) DO UPDATE SET
        name = EXCLUDED.name,
        author = EXCLUDED.author,
        project_id = EXCLUDED.project_id,
        status = EXCLUDED.status,
        comment = EXCLUDED.comment,
        priority = EXCLUDED.priority
"#;

fn statement(insert: &str, upsert_tail: &str, upsert: bool) -> String {
    if upsert {
        format!("{insert}{upsert_tail}")
    } else {
        insert.to_string()
    }
}

async fn write_employee(conn: &mut PgConnection, change: Change<Employee>) -> RepositoryResult<()> {
    let (employee, upsert) = match change {
        Change::Delete(id) => {
            sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(map_error)?;
            return Ok(());
        }
        Change::Insert(employee) => (employee, false),
        Change::Update(employee) => (employee, true),
    };

    sqlx::query(&statement(EMPLOYEE_INSERT, EMPLOYEE_UPSERT_TAIL, upsert))
        .bind(employee.id)
        .bind(&employee.email)
        .bind(&employee.user_name)
        .bind(&employee.first_name)
        .bind(&employee.family_name)
        .bind(&employee.patronymic)
        .execute(&mut *conn)
        .await
        .map_err(map_error)?;
    Ok(())
}

async fn write_project(conn: &mut PgConnection, change: Change<Project>) -> RepositoryResult<()> {
    let (project, upsert) = match change {
        Change::Delete(id) => {
            sqlx::query("DELETE FROM projects WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(map_error)?;
            return Ok(());
        }
        Change::Insert(project) => (project, false),
        Change::Update(project) => (project, true),
    };

    sqlx::query(&statement(PROJECT_INSERT, PROJECT_UPSERT_TAIL, upsert))
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.customer_name)
        .bind(&project.performer_name)
        .bind(project.supervisor_id)
        .bind(project.start)
        .bind(project.end)
        .bind(project.priority)
        .execute(&mut *conn)
        .await
        .map_err(map_error)?;

    if let Some(members) = &project.employees {
        let ids: Vec<Id> = members.iter().map(|e| e.id).collect();
        replace_links(conn, Link::ProjectMembers, project.id, ids).await?;
    }
    Ok(())
}

async fn write_objective(conn: &mut PgConnection, change: Change<Objective>) -> RepositoryResult<()> {
    let (objective, upsert) = match change {
        Change::Delete(id) => {
            sqlx::query("DELETE FROM objectives WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(map_error)?;
            return Ok(());
        }
        Change::Insert(objective) => (objective, false),
        Change::Update(objective) => (objective, true),
    };

    sqlx::query(&statement(OBJECTIVE_INSERT, OBJECTIVE_UPSERT_TAIL, upsert))
        .bind(objective.id)
        .bind(&objective.name)
        .bind(&objective.author)
        .bind(objective.project_id)
        .bind(objective.status.as_str())
        .bind(&objective.comment)
        .bind(objective.priority)
        .execute(&mut *conn)
        .await
        .map_err(map_error)?;

    if let Some(assignees) = &objective.employees {
        let ids: Vec<Id> = assignees.iter().map(|e| e.id).collect();
        replace_links(conn, Link::ObjectiveAssignees, objective.id, ids).await?;
    }
    Ok(())
}

/// Many-to-many join tables
#[derive(Debug, Clone, Copy)]
enum Link {
    ProjectMembers,
    ObjectiveAssignees,
}

impl Link {
    fn delete_sql(self) -> &'static str {
        match self {
            Link::ProjectMembers => "DELETE FROM project_employees WHERE project_id = $1",
            Link::ObjectiveAssignees => "DELETE FROM objective_employees WHERE objective_id = $1",
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            Link::ProjectMembers => {
                "INSERT INTO project_employees (project_id, employee_id) SELECT $1, UNNEST($2::uuid[])"
            }
            Link::ObjectiveAssignees => {
                "INSERT INTO objective_employees (objective_id, employee_id) SELECT $1, UNNEST($2::uuid[])"
            }
        }
    }
}

async fn replace_links(
    conn: &mut PgConnection,
    link: Link,
    owner: Id,
    employee_ids: Vec<Id>,
) -> RepositoryResult<()> {
    sqlx::query(link.delete_sql())
        .bind(owner)
        .execute(&mut *conn)
        .await
        .map_err(map_error)?;

    if !employee_ids.is_empty() {
        sqlx::query(link.insert_sql())
            .bind(owner)
            .bind(employee_ids)
            .execute(&mut *conn)
            .await
            .map_err(map_error)?;
    }
    Ok(())
}
