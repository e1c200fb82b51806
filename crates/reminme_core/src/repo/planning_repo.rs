//! Habit and project task persistence.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD for habits, habit checks and project tasks.
//! - Own the recursive subtask cascade and batch subtask insert.
//!
//! # Invariants
//! - At most one check row exists per (habit, date); toggling flips it.
//! - A subtask always inherits the project of its parent.
//! - Deleting a task removes its whole subtree in one transaction.

use crate::model::planning::{
    Habit, HabitCadence, HabitCheck, HabitCheckToggle, HabitDraft, ProjectTask, SubtaskDraft,
    TaskDraft, TaskPatch, TaskPriority, TaskStatus,
};
use crate::model::{RecordId, UserId};
use crate::repo::{
    begin_immediate, bool_to_int, ensure_connection_ready, new_id, opt_id, row_bool,
    row_optional_uuid, row_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const HABIT_SELECT_SQL: &str = "SELECT
    id, user_id, title, cadence, archived, position, created_at, updated_at
FROM todo_habits";

const TASK_SELECT_SQL: &str = "SELECT
    id, user_id, project, title, description, status, priority, parent_task_id, due_date,
    position, created_at, updated_at
FROM projects_tasks";

/// Filter options for listing tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub project: Option<String>,
    pub status: Option<TaskStatus>,
    pub parent_task_id: Option<RecordId>,
}

/// Repository interface for habits and tasks.
pub trait PlanningRepository {
    fn create_habit(&self, owner: UserId, draft: &HabitDraft) -> RepoResult<Habit>;
    fn update_habit(&self, owner: UserId, id: RecordId, draft: &HabitDraft) -> RepoResult<Habit>;
    fn get_habit(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Habit>>;
    fn list_habits(&self, owner: UserId, include_archived: bool) -> RepoResult<Vec<Habit>>;
    /// Deletes the habit and its checks in one transaction.
    fn delete_habit(&self, owner: UserId, id: RecordId) -> RepoResult<()>;
    /// Inserts the check for `check_date` when missing, removes it otherwise.
    fn toggle_habit_check(
        &self,
        owner: UserId,
        habit_id: RecordId,
        check_date: &str,
    ) -> RepoResult<HabitCheckToggle>;
    /// Lists checks with dates in the inclusive range, oldest first.
    fn list_habit_checks(
        &self,
        owner: UserId,
        habit_id: RecordId,
        from: Option<&str>,
        to: Option<&str>,
    ) -> RepoResult<Vec<HabitCheck>>;

    fn create_task(&self, owner: UserId, draft: &TaskDraft) -> RepoResult<ProjectTask>;
    fn patch_task(&self, owner: UserId, id: RecordId, patch: &TaskPatch)
        -> RepoResult<ProjectTask>;
    fn get_task(&self, owner: UserId, id: RecordId) -> RepoResult<Option<ProjectTask>>;
    fn list_tasks(&self, owner: UserId, query: &TaskQuery) -> RepoResult<Vec<ProjectTask>>;
    /// Distinct project names, sorted case-insensitively.
    fn list_projects(&self, owner: UserId) -> RepoResult<Vec<String>>;
    /// Deletes the task and all of its descendants. Returns the removed row count.
    fn delete_task(&self, owner: UserId, id: RecordId) -> RepoResult<usize>;
    /// Inserts children under `parent_id` in one transaction.
    fn insert_subtasks(
        &self,
        owner: UserId,
        parent_id: RecordId,
        subtasks: &[SubtaskDraft],
    ) -> RepoResult<Vec<ProjectTask>>;
}

/// SQLite-backed planning repository.
pub struct SqlitePlanningRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlanningRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PlanningRepository for SqlitePlanningRepository<'_> {
    fn create_habit(&self, owner: UserId, draft: &HabitDraft) -> RepoResult<Habit> {
        let id = new_id();
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM todo_habits WHERE user_id = ?1;",
            params![owner.to_string()],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO todo_habits (id, user_id, title, cadence, archived, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                owner.to_string(),
                draft.title.as_str(),
                draft.cadence.as_str(),
                bool_to_int(draft.archived),
                position,
            ],
        )?;
        load_habit(self.conn, owner, id)?.ok_or(RepoError::not_found("habit", id))
    }

    fn update_habit(&self, owner: UserId, id: RecordId, draft: &HabitDraft) -> RepoResult<Habit> {
        let changed = self.conn.execute(
            "UPDATE todo_habits
             SET title = ?3, cadence = ?4, archived = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                draft.title.as_str(),
                draft.cadence.as_str(),
                bool_to_int(draft.archived),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("habit", id));
        }
        load_habit(self.conn, owner, id)?.ok_or(RepoError::not_found("habit", id))
    }

    fn get_habit(&self, owner: UserId, id: RecordId) -> RepoResult<Option<Habit>> {
        load_habit(self.conn, owner, id)
    }

    fn list_habits(&self, owner: UserId, include_archived: bool) -> RepoResult<Vec<Habit>> {
        let mut sql = format!("{HABIT_SELECT_SQL} WHERE user_id = ?1");
        if !include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(" ORDER BY position ASC, created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }
        Ok(habits)
    }

    fn delete_habit(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        ensure_habit_owned(&tx, owner, id)?;
        tx.execute(
            "DELETE FROM todo_habit_checks WHERE habit_id = ?1;",
            params![id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM todo_habits WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn toggle_habit_check(
        &self,
        owner: UserId,
        habit_id: RecordId,
        check_date: &str,
    ) -> RepoResult<HabitCheckToggle> {
        let tx = begin_immediate(self.conn)?;
        ensure_habit_owned(&tx, owner, habit_id)?;

        let removed = tx.execute(
            "DELETE FROM todo_habit_checks WHERE habit_id = ?1 AND check_date = ?2;",
            params![habit_id.to_string(), check_date],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO todo_habit_checks (id, habit_id, check_date) VALUES (?1, ?2, ?3);",
                params![new_id().to_string(), habit_id.to_string(), check_date],
            )?;
        }
        tx.commit()?;

        Ok(HabitCheckToggle {
            habit_id,
            check_date: check_date.to_string(),
            checked: removed == 0,
        })
    }

    fn list_habit_checks(
        &self,
        owner: UserId,
        habit_id: RecordId,
        from: Option<&str>,
        to: Option<&str>,
    ) -> RepoResult<Vec<HabitCheck>> {
        ensure_habit_owned(self.conn, owner, habit_id)?;
        let mut sql = "SELECT id, habit_id, check_date, created_at
             FROM todo_habit_checks WHERE habit_id = ?"
            .to_string();
        let mut bind_values = vec![Value::Text(habit_id.to_string())];
        if let Some(from) = from {
            sql.push_str(" AND check_date >= ?");
            bind_values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = to {
            sql.push_str(" AND check_date <= ?");
            bind_values.push(Value::Text(to.to_string()));
        }
        sql.push_str(" ORDER BY check_date ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut checks = Vec::new();
        while let Some(row) = rows.next()? {
            checks.push(HabitCheck {
                id: row_uuid(row, "id")?,
                habit_id: row_uuid(row, "habit_id")?,
                check_date: row.get("check_date")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(checks)
    }

    fn create_task(&self, owner: UserId, draft: &TaskDraft) -> RepoResult<ProjectTask> {
        let project = match draft.parent_task_id {
            Some(parent_id) => {
                load_task(self.conn, owner, parent_id)?
                    .ok_or(RepoError::not_found("task", parent_id))?
                    .project
            }
            None => draft.project.clone(),
        };
        insert_task(
            self.conn,
            owner,
            &project,
            draft.parent_task_id,
            &NewTaskRow {
                title: &draft.title,
                description: draft.description.as_deref(),
                status: draft.status,
                priority: draft.priority,
                due_date: draft.due_date.as_deref(),
            },
        )
    }

    fn patch_task(
        &self,
        owner: UserId,
        id: RecordId,
        patch: &TaskPatch,
    ) -> RepoResult<ProjectTask> {
        let tx = begin_immediate(self.conn)?;
        let mut task = load_task(&tx, owner, id)?.ok_or(RepoError::not_found("task", id))?;

        if let Some(title) = patch.title.as_deref() {
            task.title = title.trim().to_string();
        }
        if let Some(description) = patch.description.as_deref() {
            let trimmed = description.trim();
            task.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date.as_deref() {
            let trimmed = due_date.trim();
            task.due_date = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(position) = patch.position {
            task.position = position;
        }

        tx.execute(
            "UPDATE projects_tasks
             SET
                title = ?3,
                description = ?4,
                status = ?5,
                priority = ?6,
                due_date = ?7,
                position = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.as_deref(),
                task.position,
            ],
        )?;
        let updated = load_task(&tx, owner, id)?.ok_or(RepoError::not_found("task", id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn get_task(&self, owner: UserId, id: RecordId) -> RepoResult<Option<ProjectTask>> {
        load_task(self.conn, owner, id)
    }

    fn list_tasks(&self, owner: UserId, query: &TaskQuery) -> RepoResult<Vec<ProjectTask>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        if let Some(project) = query.project.as_deref() {
            sql.push_str(" AND project = ?");
            bind_values.push(Value::Text(project.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(parent_id) = query.parent_task_id {
            sql.push_str(" AND parent_task_id = ?");
            bind_values.push(Value::Text(parent_id.to_string()));
        }
        sql.push_str(" ORDER BY project COLLATE NOCASE ASC, position ASC, created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn list_projects(&self, owner: UserId) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT project FROM projects_tasks
             WHERE user_id = ?1
             ORDER BY project COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(row.get(0)?);
        }
        Ok(projects)
    }

    fn delete_task(&self, owner: UserId, id: RecordId) -> RepoResult<usize> {
        let tx = begin_immediate(self.conn)?;
        let removed = tx.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM projects_tasks WHERE id = ?1 AND user_id = ?2
                UNION ALL
                SELECT child.id
                FROM projects_tasks child
                JOIN subtree parent ON child.parent_task_id = parent.id
                WHERE child.user_id = ?2
             )
             DELETE FROM projects_tasks WHERE id IN (SELECT id FROM subtree);",
            params![id.to_string(), owner.to_string()],
        )?;
        if removed == 0 {
            return Err(RepoError::not_found("task", id));
        }
        tx.commit()?;
        Ok(removed)
    }

    fn insert_subtasks(
        &self,
        owner: UserId,
        parent_id: RecordId,
        subtasks: &[SubtaskDraft],
    ) -> RepoResult<Vec<ProjectTask>> {
        let tx = begin_immediate(self.conn)?;
        let parent = load_task(&tx, owner, parent_id)?
            .ok_or(RepoError::not_found("task", parent_id))?;

        let mut created = Vec::with_capacity(subtasks.len());
        for subtask in subtasks {
            created.push(insert_task(
                &tx,
                owner,
                &parent.project,
                Some(parent_id),
                &NewTaskRow {
                    title: &subtask.title,
                    description: subtask.description.as_deref(),
                    status: TaskStatus::Todo,
                    priority: parent.priority,
                    due_date: None,
                },
            )?);
        }
        tx.commit()?;
        Ok(created)
    }
}

struct NewTaskRow<'a> {
    title: &'a str,
    description: Option<&'a str>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<&'a str>,
}

fn insert_task(
    conn: &Connection,
    owner: UserId,
    project: &str,
    parent_task_id: Option<RecordId>,
    row: &NewTaskRow<'_>,
) -> RepoResult<ProjectTask> {
    let id = new_id();
    let position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM projects_tasks
         WHERE user_id = ?1 AND project = ?2 AND parent_task_id IS ?3;",
        params![owner.to_string(), project, opt_id(parent_task_id)],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO projects_tasks (
            id, user_id, project, title, description, status, priority, parent_task_id,
            due_date, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            id.to_string(),
            owner.to_string(),
            project,
            row.title,
            row.description,
            row.status.as_str(),
            row.priority.as_str(),
            opt_id(parent_task_id),
            row.due_date,
            position,
        ],
    )?;
    load_task(conn, owner, id)?.ok_or(RepoError::not_found("task", id))
}

fn ensure_habit_owned(conn: &Connection, owner: UserId, habit_id: RecordId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM todo_habits WHERE id = ?1 AND user_id = ?2);",
        params![habit_id.to_string(), owner.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("habit", habit_id));
    }
    Ok(())
}

fn load_habit(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<Habit>> {
    let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_habit_row(row)?));
    }
    Ok(None)
}

fn load_task(conn: &Connection, owner: UserId, id: RecordId) -> RepoResult<Option<ProjectTask>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1 AND user_id = ?2;"))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let cadence_raw: String = row.get("cadence")?;
    let cadence = HabitCadence::parse(&cadence_raw)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid habit cadence `{cadence_raw}`")))?;
    Ok(Habit {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        title: row.get("title")?,
        cadence,
        archived: row_bool(row, "archived")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<ProjectTask> {
    let status_raw: String = row.get("status")?;
    let status = TaskStatus::parse(&status_raw)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid task status `{status_raw}`")))?;
    let priority_raw: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task priority `{priority_raw}`"))
    })?;
    Ok(ProjectTask {
        id: row_uuid(row, "id")?,
        user_id: row_uuid(row, "user_id")?,
        project: row.get("project")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        parent_task_id: row_optional_uuid(row, "parent_task_id")?,
        due_date: row.get("due_date")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
