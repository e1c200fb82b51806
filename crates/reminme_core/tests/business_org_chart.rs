use reminme_core::auth::create_user;
use reminme_core::db::open_db_in_memory;
use reminme_core::model::business::{
    BusinessDraft, BusinessPersonDraft, OrgChart, OrgChartDraft, OrgChartPerson, OrgMeetingDraft,
    OrgPersonDraft, OrgTeamDraft,
};
use reminme_core::model::meeting::MeetingDraft;
use reminme_core::{
    BusinessService, ContentDraft, MeetingService, RepoError, SqliteBusinessRepository,
    SqliteMeetingRepository, Tags,
};

fn org_person(key: &str, name: &str, reports_to: Option<&str>) -> OrgPersonDraft {
    OrgPersonDraft {
        key: Some(key.to_string()),
        name: name.to_string(),
        title: None,
        reports_to: reports_to.map(str::to_string),
    }
}

fn find_person<'a>(chart: &'a OrgChart, name: &str) -> &'a OrgChartPerson {
    chart
        .people
        .iter()
        .find(|person| person.name == name)
        .expect("chart should contain the person")
}

fn sample_chart() -> OrgChartDraft {
    OrgChartDraft {
        people: vec![
            org_person("ceo", "Ada", None),
            org_person("cto", "Grace", Some("ceo")),
            org_person("eng", "Linus", Some("cto")),
        ],
        teams: vec![OrgTeamDraft {
            key: Some("platform".to_string()),
            name: "Platform".to_string(),
            member_keys: vec!["cto".to_string(), "eng".to_string(), "eng".to_string()],
        }],
        meetings: vec![OrgMeetingDraft {
            title: "Platform sync".to_string(),
            cadence: Some("weekly".to_string()),
            team_key: Some("platform".to_string()),
        }],
    }
}

#[test]
fn org_chart_replace_resolves_keys_to_ids() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = BusinessService::new(
        SqliteBusinessRepository::try_new(&conn).expect("repository should initialize"),
    );
    let business = service
        .create_business(owner, BusinessDraft::named("Analytical Engines"))
        .expect("create business should succeed");

    let chart = service
        .save_org_chart(owner, business.id, sample_chart())
        .expect("save org chart should succeed");

    assert_eq!(chart.people.len(), 3);
    let ceo = find_person(&chart, "Ada");
    let cto = find_person(&chart, "Grace");
    let eng = find_person(&chart, "Linus");
    assert_eq!(ceo.reports_to, None);
    assert_eq!(cto.reports_to, Some(ceo.id));
    assert_eq!(eng.reports_to, Some(cto.id));

    assert_eq!(chart.teams.len(), 1);
    let team = &chart.teams[0];
    assert_eq!(team.member_ids.len(), 2);
    assert!(team.member_ids.contains(&cto.id));
    assert!(team.member_ids.contains(&eng.id));

    assert_eq!(chart.meetings.len(), 1);
    assert_eq!(chart.meetings[0].team_id, Some(team.id));

    let reloaded = service.get_org_chart(owner, business.id).expect("get org chart should succeed");
    assert_eq!(reloaded, chart);
}

#[test]
fn org_chart_replace_with_empty_draft_clears_everything() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = BusinessService::new(
        SqliteBusinessRepository::try_new(&conn).expect("repository should initialize"),
    );
    let business = service
        .create_business(owner, BusinessDraft::named("Analytical Engines"))
        .expect("create business should succeed");

    service
        .save_org_chart(owner, business.id, sample_chart())
        .expect("save org chart should succeed");
    let cleared = service
        .save_org_chart(owner, business.id, OrgChartDraft::default())
        .expect("save org chart should succeed");

    assert!(cleared.people.is_empty());
    assert!(cleared.teams.is_empty());
    assert!(cleared.meetings.is_empty());

    let leftover: i64 = conn
        .query_row("SELECT COUNT(*) FROM org_chart_team_members;", [], |row| {
            row.get(0)
        })
        .expect("query should return a row");
    assert_eq!(leftover, 0);
}

#[test]
fn invalid_org_chart_leaves_previous_chart_untouched() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = BusinessService::new(
        SqliteBusinessRepository::try_new(&conn).expect("repository should initialize"),
    );
    let business = service
        .create_business(owner, BusinessDraft::named("Analytical Engines"))
        .expect("create business should succeed");
    service
        .save_org_chart(owner, business.id, sample_chart())
        .expect("save org chart should succeed");

    let broken = OrgChartDraft {
        people: vec![org_person("a", "Solo", Some("ghost"))],
        ..OrgChartDraft::default()
    };
    assert!(matches!(
        service.save_org_chart(owner, business.id, broken),
        Err(RepoError::Validation(_))
    ));

    let chart = service.get_org_chart(owner, business.id).expect("get org chart should succeed");
    assert_eq!(chart.people.len(), 3);
}

#[test]
fn org_chart_of_foreign_business_is_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let intruder = create_user(&conn, "eve@example.com", None).expect("user should be created").id;
    let service = BusinessService::new(
        SqliteBusinessRepository::try_new(&conn).expect("repository should initialize"),
    );
    let business = service
        .create_business(owner, BusinessDraft::named("Analytical Engines"))
        .expect("create business should succeed");

    assert!(matches!(
        service.get_org_chart(intruder, business.id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        service.save_org_chart(intruder, business.id, sample_chart()),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn deleting_business_removes_children_and_detaches_meetings() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let business_service =
        BusinessService::new(
            SqliteBusinessRepository::try_new(&conn).expect("repository should initialize"),
        );
    let meeting_service = MeetingService::new(
        SqliteMeetingRepository::try_new(&conn).expect("repository should initialize"),
    );

    let business = business_service
        .create_business(owner, BusinessDraft::named("Analytical Engines"))
        .expect("create business should succeed");
    business_service
        .add_person(
            owner,
            business.id,
            BusinessPersonDraft {
                name: "Charles".to_string(),
                ..BusinessPersonDraft::default()
            },
        )
        .expect("add person should succeed");
    business_service
        .add_note(
            owner,
            business.id,
            ContentDraft {
                content: "Needs funding".to_string(),
            },
            Tags::default(),
        )
        .expect("add note should succeed");
    business_service
        .save_org_chart(owner, business.id, sample_chart())
        .expect("save org chart should succeed");
    let meeting = meeting_service
        .create_meeting(
            owner,
            MeetingDraft {
                title: "Pitch".to_string(),
                business_id: Some(business.id),
                ..MeetingDraft::default()
            },
        )
        .expect("create meeting should succeed");

    business_service.delete_business(owner, business.id).expect("delete business should succeed");

    assert!(matches!(
        business_service.get_business(owner, business.id),
        Err(RepoError::NotFound { .. })
    ));
    for table in ["business_people", "business_notes", "org_chart_people"] {
        let remaining: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
            .expect("query should return a row");
        assert_eq!(remaining, 0, "{table} still has rows");
    }
    let detached = meeting_service
        .get_meeting(owner, meeting.id)
        .expect("get meeting should succeed");
    assert_eq!(detached.meeting.business_id, None);
}
