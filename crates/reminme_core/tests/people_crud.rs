use reminme_core::auth::create_user;
use reminme_core::db::open_db_in_memory;
use reminme_core::model::person::{
    CaptureDraft, EventDraft, FollowUpDraft, FollowUpPatch, MemoryDraft, PersonDraft,
};
use reminme_core::{
    FollowUpQuery, PeopleQuery, PeopleService, RepoError, SqlitePeopleRepository, Tags, UserId,
};
use reminme_core::ContentDraft;
use rusqlite::{params, Connection};

fn seed_user(conn: &Connection, email: &str) -> UserId {
    create_user(conn, email, None).expect("user should be created").id
}

fn content(text: &str) -> ContentDraft {
    ContentDraft {
        content: text.to_string(),
    }
}

fn count(conn: &Connection, sql: &str, id: &str) -> i64 {
    conn.query_row(sql, params![id], |row| row.get(0)).expect("query should return a row")
}

#[test]
fn person_detail_collects_memories_follow_ups_and_events() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let person = service
        .create_person(owner, PersonDraft::named("  Grace Hopper "))
        .expect("create person should succeed");
    assert_eq!(person.name, "Grace Hopper");

    service
        .create_memory(owner, Some(person.id), content("Prefers morning calls"), Tags::default())
        .expect("create memory should succeed");
    service
        .create_follow_up(
            owner,
            FollowUpDraft {
                person_id: Some(person.id),
                description: "Send the compiler paper".to_string(),
                due_date: Some("2026-04-01".to_string()),
            },
        )
        .expect("create follow up should succeed");
    service
        .create_event(
            owner,
            EventDraft {
                person_id: Some(person.id),
                title: "Birthday".to_string(),
                event_date: "1906-12-09".to_string(),
                recurring_yearly: true,
                ..EventDraft::default()
            },
        )
        .expect("create event should succeed");

    let detail = service
        .get_person_detail(owner, person.id)
        .expect("get person detail should succeed");
    assert_eq!(detail.person.id, person.id);
    assert_eq!(detail.memories.len(), 1);
    assert_eq!(detail.follow_ups.len(), 1);
    assert_eq!(detail.events.len(), 1);
}

#[test]
fn deleting_person_removes_dependents_and_reports_memory_ids() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let person = service
        .create_person(owner, PersonDraft::named("Linus"))
        .expect("create person should succeed");
    let memory = service
        .create_memory(owner, Some(person.id), content("Maintains a kernel"), Tags::default())
        .expect("create memory should succeed");
    let loose = service
        .create_memory(owner, None, content("Unrelated thought"), Tags::default())
        .expect("create memory should succeed");
    service
        .create_follow_up(
            owner,
            FollowUpDraft {
                person_id: Some(person.id),
                description: "Review patch".to_string(),
                due_date: None,
            },
        )
        .expect("create follow up should succeed");

    let deleted = service.delete_person(owner, person.id).expect("delete person should succeed");
    assert_eq!(deleted, vec![memory.id]);

    let person_id = person.id.to_string();
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM memories WHERE person_id = ?1;", &person_id),
        0
    );
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM follow_ups WHERE person_id = ?1;", &person_id),
        0
    );
    assert!(service.get_memory(owner, loose.id).is_ok());
    assert!(matches!(
        service.get_person(owner, person.id),
        Err(RepoError::NotFound { entity: "person", .. })
    ));
}

#[test]
fn records_of_another_owner_are_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let intruder = seed_user(&conn, "eve@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let person = service
        .create_person(owner, PersonDraft::named("Ken"))
        .expect("create person should succeed");

    assert!(matches!(
        service.get_person(intruder, person.id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        service.update_person(intruder, person.id, PersonDraft::named("Mallory")),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        service.delete_person(intruder, person.id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(service
        .list_people(intruder, &PeopleQuery::default())
        .expect("list people should succeed")
        .is_empty());
    assert!(matches!(
        service.create_memory(intruder, Some(person.id), content("note"), Tags::default()),
        Err(RepoError::NotFound { .. })
    ));

    let reloaded = service
        .get_person(owner, person.id)
        .expect("get person should succeed");
    assert_eq!(reloaded.name, "Ken");
}

#[test]
fn list_people_filters_by_name_case_insensitively() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    service
        .create_person(owner, PersonDraft::named("Barbara Liskov"))
        .expect("create person should succeed");
    service
        .create_person(owner, PersonDraft::named("Alan Kay"))
        .expect("create person should succeed");

    let all = service
        .list_people(owner, &PeopleQuery::default())
        .expect("list people should succeed");
    let names: Vec<&str> = all.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, vec!["Alan Kay", "Barbara Liskov"]);

    let filtered = service
        .list_people(
            owner,
            &PeopleQuery {
                name_contains: Some("LISK".to_string()),
                limit: None,
            },
        )
        .expect("list people should succeed");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Barbara Liskov");
}

#[test]
fn follow_up_patch_completes_and_clears_due_date() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let follow_up = service
        .create_follow_up(
            owner,
            FollowUpDraft {
                person_id: None,
                description: "Book flights".to_string(),
                due_date: Some("2026-05-01".to_string()),
            },
        )
        .expect("create follow up should succeed");

    let patched = service
        .patch_follow_up(
            owner,
            follow_up.id,
            FollowUpPatch {
                completed: Some(true),
                due_date: Some(String::new()),
                ..FollowUpPatch::default()
            },
        )
        .expect("patch follow up should succeed");
    assert!(patched.completed);
    assert_eq!(patched.due_date, None);
    assert_eq!(patched.description, "Book flights");

    let open = service
        .list_follow_ups(
            owner,
            &FollowUpQuery {
                person_id: None,
                completed: Some(false),
            },
        )
        .expect("list follow ups should succeed");
    assert!(open.is_empty());
}

#[test]
fn capture_reuses_existing_person_by_name() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let existing = service
        .create_person(owner, PersonDraft::named("Margaret Hamilton"))
        .expect("create person should succeed");

    let result = service
        .save_capture(
            owner,
            CaptureDraft {
                person: Some(PersonDraft::named("margaret hamilton")),
                memories: vec![
                    MemoryDraft {
                        content: "Led Apollo flight software".to_string(),
                        tags: Tags::default(),
                    },
                    MemoryDraft {
                        content: "   ".to_string(),
                        tags: Tags::default(),
                    },
                ],
                follow_ups: vec![FollowUpDraft {
                    person_id: None,
                    description: "Ask about the book".to_string(),
                    due_date: Some("someday".to_string()),
                }],
                events: vec![EventDraft {
                    title: "Talk".to_string(),
                    event_date: "not a date".to_string(),
                    ..EventDraft::default()
                }],
            },
        )
        .expect("save capture should succeed");

    assert!(!result.person_created);
    assert_eq!(result.person.as_ref().map(|person| person.id), Some(existing.id));
    assert_eq!(result.memories.len(), 1);
    assert_eq!(result.memories[0].person_id, Some(existing.id));
    assert_eq!(result.follow_ups.len(), 1);
    assert_eq!(result.follow_ups[0].due_date, None);
    assert!(result.events.is_empty());
}

#[test]
fn capture_creates_person_when_missing() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let result = service
        .save_capture(
            owner,
            CaptureDraft {
                person: Some(PersonDraft::named("Frances Allen")),
                memories: vec![MemoryDraft {
                    content: "Optimizing compilers".to_string(),
                    tags: Tags::default(),
                }],
                ..CaptureDraft::default()
            },
        )
        .expect("save capture should succeed");

    assert!(result.person_created);
    let people = service
        .list_people(owner, &PeopleQuery::default())
        .expect("list people should succeed");
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name, "Frances Allen");
}

#[test]
fn memories_by_ids_preserve_requested_order_and_skip_foreign_rows() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_user(&conn, "ada@example.com");
    let other = seed_user(&conn, "bob@example.com");
    let service = PeopleService::new(
        SqlitePeopleRepository::try_new(&conn).expect("repository should initialize"),
    );

    let first = service
        .create_memory(owner, None, content("first"), Tags::default())
        .expect("create memory should succeed");
    let second = service
        .create_memory(owner, None, content("second"), Tags::default())
        .expect("create memory should succeed");
    let foreign = service
        .create_memory(other, None, content("foreign"), Tags::default())
        .expect("create memory should succeed");

    let found = service
        .get_memories_by_ids(owner, &[second.id, foreign.id, first.id])
        .expect("get memories by ids should succeed");
    let contents: Vec<&str> = found.iter().map(|memory| memory.content.as_str()).collect();
    assert_eq!(contents, vec!["second", "first"]);
}
