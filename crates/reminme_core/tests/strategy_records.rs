use reminme_core::auth::create_user;
use reminme_core::db::open_db_in_memory;
use reminme_core::model::strategy::{
    Citation, NewConversationStep, NewConversationStrategy, NewResearchResult, ResearchKind,
    ResearchSuggestion,
};
use reminme_core::{RepoError, ResearchQuery, SqliteStrategyRepository, StrategyService};

fn step(title: &str) -> NewConversationStep {
    NewConversationStep {
        title: title.to_string(),
        description: None,
        sample_phrase: None,
    }
}

#[test]
fn strategy_steps_are_stored_in_order_and_blank_steps_dropped() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = StrategyService::new(
        SqliteStrategyRepository::try_new(&conn).expect("repository should initialize"),
    );

    let detail = service
        .record_strategy(
            owner,
            NewConversationStrategy {
                person_id: None,
                situation: "Salary review".to_string(),
                goal: "Get a raise".to_string(),
                summary: Some("Lead with impact".to_string()),
                citations: vec![Citation {
                    title: "Negotiation guide".to_string(),
                    url: "https://example.com/guide".to_string(),
                }],
                steps: vec![step("Open warmly"), step("  "), step("State the ask")],
            },
        )
        .expect("record strategy should succeed");

    let titles: Vec<&str> = detail.steps.iter().map(|step| step.title.as_str()).collect();
    assert_eq!(titles, vec!["Open warmly", "State the ask"]);
    let positions: Vec<i64> = detail.steps.iter().map(|step| step.position).collect();
    assert_eq!(positions, vec![0, 1]);

    let loaded = service
        .get_strategy(owner, detail.strategy.id)
        .expect("get strategy should succeed");
    assert_eq!(loaded, detail);
    assert_eq!(loaded.strategy.citations.len(), 1);

    service.delete_strategy(owner, detail.strategy.id).expect("delete strategy should succeed");
    assert!(matches!(
        service.get_strategy(owner, detail.strategy.id),
        Err(RepoError::NotFound { .. })
    ));
    let steps: i64 = conn
        .query_row("SELECT COUNT(*) FROM conversation_steps;", [], |row| row.get(0))
        .expect("query should return a row");
    assert_eq!(steps, 0);
}

#[test]
fn strategy_requires_situation_and_goal() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let service = StrategyService::new(
        SqliteStrategyRepository::try_new(&conn).expect("repository should initialize"),
    );

    let result = service.record_strategy(
        owner,
        NewConversationStrategy {
            person_id: None,
            situation: "Team conflict".to_string(),
            goal: " ".to_string(),
            summary: None,
            citations: Vec::new(),
            steps: Vec::new(),
        },
    );
    match result {
        Err(RepoError::Validation(err)) => assert_eq!(err.field, "goal"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn research_results_filter_by_kind_and_stay_private() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let owner = create_user(&conn, "ada@example.com", None).expect("user should be created").id;
    let intruder = create_user(&conn, "eve@example.com", None).expect("user should be created").id;
    let service = StrategyService::new(
        SqliteStrategyRepository::try_new(&conn).expect("repository should initialize"),
    );

    let stack = service
        .record_research(
            owner,
            NewResearchResult {
                business_id: None,
                kind: ResearchKind::TechStack,
                subject: "Payments startup".to_string(),
                query: "what stack for payments".to_string(),
                summary: None,
                suggestions: vec![ResearchSuggestion {
                    name: "PostgreSQL".to_string(),
                    category: Some("database".to_string()),
                    rationale: None,
                }],
                citations: Vec::new(),
            },
        )
        .expect("record research should succeed");
    service
        .record_research(
            owner,
            NewResearchResult {
                business_id: None,
                kind: ResearchKind::Company,
                subject: "Acme".to_string(),
                query: "who is acme".to_string(),
                summary: Some("Makes anvils".to_string()),
                suggestions: Vec::new(),
                citations: Vec::new(),
            },
        )
        .expect("record research should succeed");

    let stacks = service
        .list_research(
            owner,
            &ResearchQuery {
                business_id: None,
                kind: Some(ResearchKind::TechStack),
            },
        )
        .expect("list research should succeed");
    assert_eq!(stacks.len(), 1);
    assert_eq!(stacks[0].suggestions[0].name, "PostgreSQL");

    assert!(matches!(
        service.get_research(intruder, stack.id),
        Err(RepoError::NotFound { .. })
    ));
    assert!(service
        .list_research(intruder, &ResearchQuery::default())
        .expect("list research should succeed")
        .is_empty());
}
