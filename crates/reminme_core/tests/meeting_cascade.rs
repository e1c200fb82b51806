use reminme_core::auth::create_user;
use reminme_core::db::open_db_in_memory;
use reminme_core::model::meeting::{
    AgendaItemPatch, AttendeeDraft, ContextCardDraft, MeetingDraft, QuestionDraft, QuestionPatch,
};
use reminme_core::{
    ContentDraft, ContextCardQuery, MeetingService, RepoError, SqliteMeetingRepository, Tags,
    UserId,
};
use rusqlite::Connection;

fn draft_with_children() -> MeetingDraft {
    MeetingDraft {
        title: "Quarterly review".to_string(),
        purpose: Some("Agree on the roadmap".to_string()),
        attendees: vec![
            AttendeeDraft {
                name: "Ada".to_string(),
                role: Some("CEO".to_string()),
                ..AttendeeDraft::default()
            },
            AttendeeDraft {
                name: "Grace".to_string(),
                ..AttendeeDraft::default()
            },
        ],
        agenda: vec!["Numbers".to_string(), "Hiring".to_string()],
        ..MeetingDraft::default()
    }
}

fn titled(title: &str) -> MeetingDraft {
    MeetingDraft {
        title: title.to_string(),
        ..MeetingDraft::default()
    }
}

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .expect("query should return a row")
}

fn seed_owner(conn: &Connection) -> UserId {
    create_user(conn, "ada@example.com", None).expect("user should be created").id
}

#[test]
fn create_meeting_inserts_inline_attendees_and_agenda_in_order() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let meeting = service
        .create_meeting(owner, draft_with_children())
        .expect("create meeting should succeed");
    let detail = service.get_meeting(owner, meeting.id).expect("get meeting should succeed");

    assert_eq!(detail.attendees.len(), 2);
    let agenda: Vec<&str> = detail.agenda.iter().map(|item| item.item.as_str()).collect();
    assert_eq!(agenda, vec!["Numbers", "Hiring"]);
    assert!(detail.agenda.iter().all(|item| !item.completed));
}

#[test]
fn delete_meeting_removes_children_and_detaches_context_cards() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let meeting = service
        .create_meeting(owner, draft_with_children())
        .expect("create meeting should succeed");
    service
        .add_note(
            owner,
            meeting.id,
            ContentDraft {
                content: "Budget is tight".to_string(),
            },
            Tags::default(),
        )
        .expect("add note should succeed");
    service
        .add_question(
            owner,
            meeting.id,
            QuestionDraft {
                question: "What slipped last quarter?".to_string(),
                category: None,
            },
        )
        .expect("add question should succeed");
    let card = service
        .create_context_card(
            owner,
            ContextCardDraft {
                meeting_id: Some(meeting.id),
                title: "Background".to_string(),
                ..ContextCardDraft::default()
            },
        )
        .expect("create context card should succeed");

    service.delete_meeting(owner, meeting.id).expect("delete meeting should succeed");

    for table in [
        "meetings",
        "meeting_attendees",
        "meeting_agenda",
        "meeting_notes",
        "meeting_questions",
    ] {
        assert_eq!(table_count(&conn, table), 0, "{table} still has rows");
    }
    let cards = service
        .list_context_cards(owner, &ContextCardQuery::default())
        .expect("list context cards should succeed");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, card.id);
    assert_eq!(cards[0].meeting_id, None);
}

#[test]
fn failed_meeting_delete_rolls_back_every_child_delete() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let meeting = service
        .create_meeting(owner, draft_with_children())
        .expect("create meeting should succeed");
    service
        .add_note(
            owner,
            meeting.id,
            ContentDraft {
                content: "Keep me".to_string(),
            },
            Tags::default(),
        )
        .expect("add note should succeed");

    conn.execute_batch(
        "CREATE TRIGGER block_note_delete BEFORE DELETE ON meeting_notes
         BEGIN
            SELECT RAISE(ABORT, 'blocked');
         END;",
    )
    .expect("execute batch should succeed");

    assert!(matches!(
        service.delete_meeting(owner, meeting.id),
        Err(RepoError::Db(_))
    ));

    let detail = service.get_meeting(owner, meeting.id).expect("get meeting should succeed");
    assert_eq!(detail.attendees.len(), 2);
    assert_eq!(detail.agenda.len(), 2);
    assert_eq!(detail.notes.len(), 1);
}

#[test]
fn answering_question_marks_it_answered() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let meeting = service
        .create_meeting(owner, titled("1:1"))
        .expect("create meeting should succeed");
    let question = service
        .add_question(
            owner,
            meeting.id,
            QuestionDraft {
                question: "How is the team?".to_string(),
                category: Some("people".to_string()),
            },
        )
        .expect("add question should succeed");
    assert!(!question.answered);

    let answered = service
        .patch_question(
            owner,
            meeting.id,
            question.id,
            QuestionPatch {
                answer: Some("Tired but happy".to_string()),
                answered: None,
            },
        )
        .expect("patch question should succeed");
    assert!(answered.answered);
    assert_eq!(answered.answer.as_deref(), Some("Tired but happy"));
}

#[test]
fn generated_questions_append_after_existing_ones() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let meeting = service
        .create_meeting(owner, titled("Vendor call"))
        .expect("create meeting should succeed");
    service
        .add_question(
            owner,
            meeting.id,
            QuestionDraft {
                question: "Pricing?".to_string(),
                category: None,
            },
        )
        .expect("add question should succeed");

    let appended = service
        .append_generated_questions(
            owner,
            meeting.id,
            vec![
                QuestionDraft {
                    question: "Support hours?".to_string(),
                    category: None,
                },
                QuestionDraft {
                    question: "  ".to_string(),
                    category: None,
                },
                QuestionDraft {
                    question: "Exit clauses?".to_string(),
                    category: Some("legal".to_string()),
                },
            ],
        )
        .expect("append generated questions should succeed");
    assert_eq!(appended.len(), 2);

    let detail = service.get_meeting(owner, meeting.id).expect("get meeting should succeed");
    let questions: Vec<&str> = detail
        .questions
        .iter()
        .map(|question| question.question.as_str())
        .collect();
    assert_eq!(questions, vec!["Pricing?", "Support hours?", "Exit clauses?"]);
}

#[test]
fn child_rows_are_scoped_to_their_meeting() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = seed_owner(&conn);
    let intruder = create_user(&conn, "eve@example.com", None).expect("user should be created").id;
    let service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let first = service
        .create_meeting(owner, draft_with_children())
        .expect("create meeting should succeed");
    let second = service
        .create_meeting(owner, titled("Other"))
        .expect("create meeting should succeed");
    let item_id = service
        .get_meeting(owner, first.id)
        .expect("get meeting should succeed").agenda[0].id;

    let patch = AgendaItemPatch {
        item: None,
        completed: Some(true),
    };
    assert!(matches!(
        service.patch_agenda_item(owner, second.id, item_id, patch.clone()),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        service.patch_agenda_item(intruder, first.id, item_id, patch.clone()),
        Err(RepoError::NotFound { .. })
    ));

    let patched = service
        .patch_agenda_item(owner, first.id, item_id, patch)
        .expect("patch agenda item should succeed");
    assert!(patched.completed);
}
