//! In-memory store
//!
//! Keeps rows and association rows behind one lock. A commit is applied to a
//! copy of the tables and swapped in only when every change succeeded, so a
//! failing commit leaves nothing behind. Foreign keys and cascades follow the
//! relational layout used by [`PgStore`](crate::PgStore).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use pm_core::traits::{Entity, Id};
use pm_models::{
    Employee, EmployeeInclude, Objective, ObjectiveInclude, Project, ProjectInclude,
};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{Change, StagedChange, Store, Table};

#[derive(Debug, Clone, Default)]
struct Tables {
    employees: Vec<Employee>,
    projects: Vec<Project>,
    objectives: Vec<Objective>,
    /// (project_id, employee_id)
    project_members: BTreeSet<(Id, Id)>,
    /// (objective_id, employee_id)
    objective_assignees: BTreeSet<(Id, Id)>,
}

fn position<T, F: Fn(&T) -> bool>(rows: &[T], matches: F) -> Option<usize> {
    rows.iter().position(matches)
}

fn bare_employee(employee: &Employee) -> Employee {
    Employee {
        projects: None,
        objectives: None,
        ..employee.clone()
    }
}

fn bare_project(project: &Project) -> Project {
    Project {
        employees: None,
        objectives: None,
        ..project.clone()
    }
}

fn bare_objective(objective: &Objective) -> Objective {
    Objective {
        project: None,
        employees: None,
        ..objective.clone()
    }
}

impl Tables {
    fn has_employee(&self, id: Id) -> bool {
        self.employees.iter().any(|e| e.id == id)
    }

    fn has_project(&self, id: Id) -> bool {
        self.projects.iter().any(|p| p.id == id)
    }

    fn apply(&mut self, change: StagedChange) -> RepositoryResult<()> {
        match change {
            StagedChange::Employee(change) => self.apply_employee(change),
            StagedChange::Project(change) => self.apply_project(change),
            StagedChange::Objective(change) => self.apply_objective(change),
        }
    }

    fn apply_employee(&mut self, change: Change<Employee>) -> RepositoryResult<()> {
        match change {
            Change::Insert(employee) => {
                if self.has_employee(employee.id) {
                    return Err(duplicate::<Employee>(employee.id));
                }
                self.employees.push(bare_employee(&employee));
            }
            Change::Update(employee) => {
                upsert(&mut self.employees, bare_employee(&employee), |e| e.id == employee.id);
            }
            Change::Delete(id) => {
                self.employees.retain(|e| e.id != id);
                self.project_members.retain(|(_, employee)| *employee != id);
                self.objective_assignees.retain(|(_, employee)| *employee != id);
            }
        }
        Ok(())
    }

    fn apply_project(&mut self, change: Change<Project>) -> RepositoryResult<()> {
        match change {
            Change::Insert(project) => {
                if self.has_project(project.id) {
                    return Err(duplicate::<Project>(project.id));
                }
                self.projects.push(bare_project(&project));
                self.replace_members(&project)?;
            }
            Change::Update(project) => {
                upsert(&mut self.projects, bare_project(&project), |p| p.id == project.id);
                self.replace_members(&project)?;
            }
            Change::Delete(id) => {
                self.projects.retain(|p| p.id != id);
                self.project_members.retain(|(project, _)| *project != id);
                let owned: Vec<Id> = self
                    .objectives
                    .iter()
                    .filter(|o| o.project_id == id)
                    .map(|o| o.id)
                    .collect();
                for objective_id in owned {
                    self.delete_objective(objective_id);
                }
            }
        }
        Ok(())
    }

    fn apply_objective(&mut self, change: Change<Objective>) -> RepositoryResult<()> {
        match change {
            Change::Insert(objective) => {
                if position(&self.objectives, |o| o.id == objective.id).is_some() {
                    return Err(duplicate::<Objective>(objective.id));
                }
                self.check_owner(&objective)?;
                self.objectives.push(bare_objective(&objective));
                self.replace_assignees(&objective)?;
            }
            Change::Update(objective) => {
                self.check_owner(&objective)?;
                upsert(&mut self.objectives, bare_objective(&objective), |o| o.id == objective.id);
                self.replace_assignees(&objective)?;
            }
            Change::Delete(id) => self.delete_objective(id),
        }
        Ok(())
    }

    fn delete_objective(&mut self, id: Id) {
        self.objectives.retain(|o| o.id != id);
        self.objective_assignees.retain(|(objective, _)| *objective != id);
    }

    fn check_owner(&self, objective: &Objective) -> RepositoryResult<()> {
        if self.has_project(objective.project_id) {
            Ok(())
        } else {
            Err(RepositoryError::ForeignKey(format!(
                "objective {} references missing project {}",
                objective.id, objective.project_id
            )))
        }
    }

    fn replace_members(&mut self, project: &Project) -> RepositoryResult<()> {
        let Some(members) = &project.employees else {
            return Ok(());
        };
        for member in members {
            if !self.has_employee(member.id) {
                return Err(RepositoryError::ForeignKey(format!(
                    "project {} references missing employee {}",
                    project.id, member.id
                )));
            }
        }
        self.project_members.retain(|(p, _)| *p != project.id);
        self.project_members
            .extend(members.iter().map(|member| (project.id, member.id)));
        Ok(())
    }

    fn replace_assignees(&mut self, objective: &Objective) -> RepositoryResult<()> {
        let Some(assignees) = &objective.employees else {
            return Ok(());
        };
        for assignee in assignees {
            if !self.has_employee(assignee.id) {
                return Err(RepositoryError::ForeignKey(format!(
                    "objective {} references missing employee {}",
                    objective.id, assignee.id
                )));
            }
        }
        self.objective_assignees.retain(|(o, _)| *o != objective.id);
        self.objective_assignees
            .extend(assignees.iter().map(|assignee| (objective.id, assignee.id)));
        Ok(())
    }

    fn employees_where<F: Fn(Id) -> bool>(&self, linked: F) -> Vec<Employee> {
        self.employees.iter().filter(|e| linked(e.id)).cloned().collect()
    }
}

fn upsert<T, F: Fn(&T) -> bool>(rows: &mut Vec<T>, row: T, matches: F) {
    match position(rows, matches) {
        Some(index) => rows[index] = row,
        None => rows.push(row),
    }
}

fn duplicate<T: Entity>(id: Id) -> RepositoryError {
    RepositoryError::Conflict(format!("{} {} already exists", T::TYPE_NAME, id))
}

/// Store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    reads: AtomicUsize,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read calls served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of commits applied so far
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn read(&self) -> parking_lot::RwLockReadGuard<'_, Tables> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.tables.read()
    }
}

#[async_trait]
impl Table<Employee> for MemoryStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Employee>> {
        Ok(self.read().employees.clone())
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Employee>> {
        Ok(self.read().employees.iter().find(|e| e.id == id).cloned())
    }

    async fn include(&self, item: &mut Employee, include: EmployeeInclude) -> RepositoryResult<()> {
        let tables = self.read();
        match include {
            EmployeeInclude::Projects => {
                item.projects = Some(
                    tables
                        .projects
                        .iter()
                        .filter(|p| tables.project_members.contains(&(p.id, item.id)))
                        .cloned()
                        .collect(),
                );
            }
            EmployeeInclude::Objectives => {
                item.objectives = Some(
                    tables
                        .objectives
                        .iter()
                        .filter(|o| tables.objective_assignees.contains(&(o.id, item.id)))
                        .cloned()
                        .collect(),
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table<Project> for MemoryStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Project>> {
        Ok(self.read().projects.clone())
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Project>> {
        Ok(self.read().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn include(&self, item: &mut Project, include: ProjectInclude) -> RepositoryResult<()> {
        let tables = self.read();
        match include {
            ProjectInclude::Employees => {
                let project_id = item.id;
                item.employees = Some(
                    tables.employees_where(|e| tables.project_members.contains(&(project_id, e))),
                );
            }
            ProjectInclude::Objectives => {
                item.objectives = Some(
                    tables
                        .objectives
                        .iter()
                        .filter(|o| o.project_id == item.id)
                        .cloned()
                        .collect(),
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Table<Objective> for MemoryStore {
    async fn select_all(&self) -> RepositoryResult<Vec<Objective>> {
        Ok(self.read().objectives.clone())
    }

    async fn select_by_id(&self, id: Id) -> RepositoryResult<Option<Objective>> {
        Ok(self.read().objectives.iter().find(|o| o.id == id).cloned())
    }

    async fn include(&self, item: &mut Objective, include: ObjectiveInclude) -> RepositoryResult<()> {
        let tables = self.read();
        match include {
            ObjectiveInclude::Project => {
                item.project = tables
                    .projects
                    .iter()
                    .find(|p| p.id == item.project_id)
                    .cloned()
                    .map(Box::new);
            }
            ObjectiveInclude::Employees => {
                let objective_id = item.id;
                item.employees = Some(tables.employees_where(|e| {
                    tables.objective_assignees.contains(&(objective_id, e))
                }));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
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
        let mut tables = self.tables.write();
        let mut next = tables.clone();
        for change in changes {
            next.apply(change)?;
        }
        *tables = next;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn employee() -> Employee {
        Employee::new(Id::new_v4())
    }

    fn project_with(members: &[&Employee]) -> Project {
        let mut project = Project::new(Id::new_v4(), Utc::now());
        project.employees = Some(members.iter().map(|e| (*e).clone()).collect());
        project
    }

    async fn seed(store: &MemoryStore, changes: Vec<StagedChange>) {
        store.apply(changes).await.unwrap();
    }

    #[tokio::test]
    async fn test_member_set_is_replaced() {
        let store = MemoryStore::new();
        let (a, b) = (employee(), employee());
        let mut project = project_with(&[&a]);
        seed(
            &store,
            vec![
                StagedChange::Employee(Change::Insert(a.clone())),
                StagedChange::Employee(Change::Insert(b.clone())),
                StagedChange::Project(Change::Insert(project.clone())),
            ],
        )
        .await;

        project.employees = Some(vec![b.clone()]);
        seed(&store, vec![StagedChange::Project(Change::Update(project.clone()))]).await;

        let mut loaded = Table::<Project>::select_by_id(&store, project.id)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.employees.is_none());
        Table::<Project>::include(&store, &mut loaded, ProjectInclude::Employees)
            .await
            .unwrap();
        assert_eq!(loaded.member_ids(), vec![b.id]);
    }

    #[tokio::test]
    async fn test_unloaded_members_are_kept() {
        let store = MemoryStore::new();
        let a = employee();
        let mut project = project_with(&[&a]);
        seed(
            &store,
            vec![
                StagedChange::Employee(Change::Insert(a.clone())),
                StagedChange::Project(Change::Insert(project.clone())),
            ],
        )
        .await;

        project.employees = None;
        project.priority = 5;
        seed(&store, vec![StagedChange::Project(Change::Update(project.clone()))]).await;

        let mut loaded = Table::<Project>::select_by_id(&store, project.id)
            .await
            .unwrap()
            .unwrap();
        Table::<Project>::include(&store, &mut loaded, ProjectInclude::Employees)
            .await
            .unwrap();
        assert_eq!(loaded.priority, 5);
        assert_eq!(loaded.member_ids(), vec![a.id]);
    }

    #[tokio::test]
    async fn test_project_delete_cascades() {
        let store = MemoryStore::new();
        let a = employee();
        let project = project_with(&[&a]);
        let mut objective = Objective::new(Id::new_v4(), project.id);
        objective.employees = Some(vec![a.clone()]);
        seed(
            &store,
            vec![
                StagedChange::Employee(Change::Insert(a.clone())),
                StagedChange::Project(Change::Insert(project.clone())),
                StagedChange::Objective(Change::Insert(objective.clone())),
            ],
        )
        .await;

        seed(&store, vec![StagedChange::Project(Change::Delete(project.id))]).await;

        assert!(Table::<Objective>::select_all(&store).await.unwrap().is_empty());
        let mut survivor = Table::<Employee>::select_by_id(&store, a.id)
            .await
            .unwrap()
            .unwrap();
        Table::<Employee>::include(&store, &mut survivor, EmployeeInclude::Objectives)
            .await
            .unwrap();
        assert_eq!(survivor.objectives, Some(vec![]));
    }

    #[tokio::test]
    async fn test_employee_delete_removes_links() {
        let store = MemoryStore::new();
        let a = employee();
        let project = project_with(&[&a]);
        seed(
            &store,
            vec![
                StagedChange::Employee(Change::Insert(a.clone())),
                StagedChange::Project(Change::Insert(project.clone())),
                StagedChange::Employee(Change::Delete(a.id)),
            ],
        )
        .await;

        let mut loaded = Table::<Project>::select_by_id(&store, project.id)
            .await
            .unwrap()
            .unwrap();
        Table::<Project>::include(&store, &mut loaded, ProjectInclude::Employees)
            .await
            .unwrap();
        assert!(loaded.member_ids().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_a_conflict() {
        let store = MemoryStore::new();
        let a = employee();
        let result = store
            .apply(vec![
                StagedChange::Employee(Change::Insert(a.clone())),
                StagedChange::Employee(Change::Insert(a.clone())),
            ])
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert!(Table::<Employee>::select_all(&store).await.unwrap().is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_update_of_absent_row_inserts() {
        let store = MemoryStore::new();
        let project = Project::new(Id::new_v4(), Utc::now());
        let objective = Objective::new(Id::new_v4(), project.id);
        seed(
            &store,
            vec![
                StagedChange::Project(Change::Insert(project)),
                StagedChange::Objective(Change::Update(objective.clone())),
            ],
        )
        .await;

        let loaded = Table::<Objective>::select_by_id(&store, objective.id).await.unwrap();
        assert_eq!(loaded, Some(objective));
    }

    #[tokio::test]
    async fn test_reads_are_counted() {
        let store = MemoryStore::new();
        assert_eq!(store.reads(), 0);
        Table::<Project>::select_all(&store).await.unwrap();
        Table::<Employee>::select_by_id(&store, Id::new_v4()).await.unwrap();
        assert_eq!(store.reads(), 2);
    }
}
