use chrono::NaiveDate;
use reminme_core::auth::create_user;
use reminme_core::db::open_db_in_memory;
use reminme_core::model::planning::{
    HabitCadence, HabitDraft, SubtaskDraft, TaskDraft, TaskPatch, TaskPriority, TaskStatus,
};
use reminme_core::{PlanningService, RepoError, SqlitePlanningRepository, TaskQuery};

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date should be valid")
}

fn task(project: &str, title: &str) -> TaskDraft {
    TaskDraft {
        project: project.to_string(),
        title: title.to_string(),
        ..TaskDraft::default()
    }
}

#[test]
fn toggling_twice_restores_unchecked_state() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );
    let today = day("2026-03-10");

    let habit = service
        .create_habit(
            owner,
            HabitDraft {
                title: "Stretch".to_string(),
                cadence: HabitCadence::Daily,
                archived: false,
            },
        )
        .expect("create habit should succeed");

    let first = service
        .toggle_check(owner, habit.id, None, today)
        .expect("toggle check should succeed");
    assert!(first.checked);
    assert_eq!(first.check_date, "2026-03-10");

    let progress = service
        .list_habit_progress(owner, today, false)
        .expect("list habit progress should succeed");
    assert!(progress[0].checked_today);
    assert_eq!(progress[0].streak, 1);

    let second = service
        .toggle_check(owner, habit.id, None, today)
        .expect("toggle check should succeed");
    assert!(!second.checked);
    assert!(service
        .list_checks(owner, habit.id, None, None)
        .expect("list checks should succeed")
        .is_empty());
}

#[test]
fn toggle_rejects_malformed_date() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );
    let habit = service
        .create_habit(
            owner,
            HabitDraft {
                title: "Read".to_string(),
                ..HabitDraft::default()
            },
        )
        .expect("create habit should succeed");

    match service.toggle_check(owner, habit.id, Some("10/03/2026"), day("2026-03-10")) {
        Err(RepoError::Validation(err)) => assert_eq!(err.field, "date"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn habit_progress_reports_streak_from_stored_checks() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );
    let today = day("2026-03-10");
    let habit = service
        .create_habit(
            owner,
            HabitDraft {
                title: "Journal".to_string(),
                ..HabitDraft::default()
            },
        )
        .expect("create habit should succeed");

    for date in ["2026-03-07", "2026-03-08", "2026-03-09"] {
        service
            .toggle_check(owner, habit.id, Some(date), today)
            .expect("toggle check should succeed");
    }

    let progress = service
        .list_habit_progress(owner, today, false)
        .expect("list habit progress should succeed");
    assert_eq!(progress.len(), 1);
    assert!(!progress[0].checked_today);
    assert_eq!(progress[0].streak, 3);
}

#[test]
fn archived_habits_are_hidden_unless_requested() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );
    service
        .create_habit(
            owner,
            HabitDraft {
                title: "Old habit".to_string(),
                cadence: HabitCadence::Weekly,
                archived: true,
            },
        )
        .expect("create habit should succeed");

    let today = day("2026-03-10");
    assert!(service
        .list_habit_progress(owner, today, false)
        .expect("list habit progress should succeed")
        .is_empty());
    let progress = service
        .list_habit_progress(owner, today, true)
        .expect("list habit progress should succeed");
    assert_eq!(progress.len(), 1);
}

#[test]
fn deleting_task_removes_whole_subtree() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );

    let root = service
        .create_task(owner, task("Launch", "Ship v1"))
        .expect("create task should succeed");
    let child = service
        .create_task(
            owner,
            TaskDraft {
                parent_task_id: Some(root.id),
                ..task("ignored", "Write docs")
            },
        )
        .expect("create task should succeed");
    assert_eq!(child.project, "Launch");
    service
        .create_task(
            owner,
            TaskDraft {
                parent_task_id: Some(child.id),
                ..task("ignored", "Proofread")
            },
        )
        .expect("create task should succeed");
    let sibling = service
        .create_task(owner, task("Launch", "Announce"))
        .expect("create task should succeed");

    assert_eq!(service.delete_task(owner, root.id).expect("delete task should succeed"), 3);

    let remaining = service
        .list_tasks(owner, &TaskQuery::default())
        .expect("list tasks should succeed");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, sibling.id);
}

#[test]
fn subtasks_inherit_parent_project_and_priority() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );

    let parent = service
        .create_task(
            owner,
            TaskDraft {
                priority: TaskPriority::High,
                status: TaskStatus::InProgress,
                ..task("Move", "Pack the flat")
            },
        )
        .expect("create task should succeed");

    let children = service
        .add_subtasks(
            owner,
            parent.id,
            vec![
                SubtaskDraft {
                    title: "Buy boxes".to_string(),
                    description: None,
                },
                SubtaskDraft {
                    title: " ".to_string(),
                    description: None,
                },
                SubtaskDraft {
                    title: "Label boxes".to_string(),
                    description: Some("  by room ".to_string()),
                },
            ],
        )
        .expect("add subtasks should succeed");

    assert_eq!(children.len(), 2);
    for child in &children {
        assert_eq!(child.project, "Move");
        assert_eq!(child.priority, TaskPriority::High);
        assert_eq!(child.status, TaskStatus::Todo);
        assert_eq!(child.parent_task_id, Some(parent.id));
    }
    assert_eq!(children[1].description.as_deref(), Some("by room"));

    let listed = service
        .list_tasks(
            owner,
            &TaskQuery {
                parent_task_id: Some(parent.id),
                ..TaskQuery::default()
            },
        )
        .expect("list tasks should succeed");
    assert_eq!(listed.len(), 2);
}

#[test]
fn task_patch_merges_and_clears_due_date() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = PlanningService::new(
        SqlitePlanningRepository::try_new(&conn).expect("repository should initialize"),
    );

    let created = service
        .create_task(
            owner,
            TaskDraft {
                due_date: Some("2026-06-01".to_string()),
                ..task("Garden", "Plant tomatoes")
            },
        )
        .expect("create task should succeed");

    let patched = service
        .patch_task(
            owner,
            created.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                due_date: Some(String::new()),
                ..TaskPatch::default()
            },
        )
        .expect("patch task should succeed");
    assert_eq!(patched.status, TaskStatus::Done);
    assert_eq!(patched.due_date, None);
    assert_eq!(patched.title, "Plant tomatoes");

    let projects = service
        .list_projects(owner)
        .expect("list projects should succeed");
    assert_eq!(projects, vec!["Garden".to_string()]);
}
