use meetings_core::db::open_db_in_memory;
use meetings_core::{
    MeetingError, MeetingInput, MeetingListItem, MeetingRecord, MeetingService,
    SqliteIdentityRepository, SqliteMeetingRepository, User,
};
use rusqlite::{params, Connection};
use serde_json::json;
use uuid::Uuid;

type Service<'conn> =
    MeetingService<SqliteMeetingRepository<'conn>, SqliteIdentityRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    MeetingService::new(
        SqliteMeetingRepository::new(conn),
        SqliteIdentityRepository::new(conn),
    )
}

fn seed_user(conn: &Connection, username: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        first_name: Some("Test".to_string()),
        last_name: None,
    };
    SqliteIdentityRepository::new(conn).upsert_user(&user).unwrap();
    user.id
}

fn create(service: &Service<'_>, agenda: &str, creator: Uuid) -> MeetingRecord {
    service
        .create(&MeetingInput::new(agenda, creator.to_string()))
        .unwrap()
}

fn ids(items: &[MeetingListItem]) -> Vec<Uuid> {
    items.iter().map(|item| item.meeting.id).collect()
}

fn no_params() -> Vec<(String, String)> {
    Vec::new()
}

#[test]
fn list_returns_active_meetings_in_insertion_order_with_creator_login() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = seed_user(&conn, "alice@example.com");
    let orphan_creator = Uuid::new_v4();

    let first = create(&service, "First", alice);
    let second = create(&service, "Second", orphan_creator);
    let third = create(&service, "Third", alice);

    let items = service.list(no_params()).unwrap();
    assert_eq!(ids(&items), vec![first.id, second.id, third.id]);
    assert_eq!(items[0].created_by_email.as_deref(), Some("alice@example.com"));
    assert_eq!(items[1].created_by_email, None);

    let payload = serde_json::to_value(&items[0]).unwrap();
    assert_eq!(payload["createdByEmail"], json!("alice@example.com"));
    assert_eq!(payload["agenda"], json!("First"));
    assert!(payload.get("user").is_none());
    assert!(payload.get("meeting").is_none());
}

#[test]
fn deleted_meetings_never_appear_in_listings_but_remain_retrievable() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = seed_user(&conn, "alice@example.com");

    let kept = create(&service, "Planning", alice);
    let removed = create(&service, "Planning", alice);
    service.delete_one(&removed.id.to_string()).unwrap();

    let filters: Vec<Vec<(&str, String)>> = vec![
        vec![],
        vec![("agenda", "plan".to_string())],
        vec![("createBy", "alice".to_string())],
        vec![("deleted", "true".to_string())],
        vec![("deleted", "0".to_string())],
        vec![("id", removed.id.to_string())],
        vec![("timestampFrom", "1970-01-01".to_string())],
    ];
    for params in filters {
        let listed = ids(&service.list(params.clone()).unwrap());
        assert!(
            !listed.contains(&removed.id),
            "deleted meeting listed for {params:?}"
        );
    }

    assert_eq!(
        ids(&service.list([("deleted", "false")]).unwrap()),
        vec![kept.id]
    );
    for value in ["0", "0.0", "yes"] {
        assert!(
            service.list([("deleted", value)]).unwrap().is_empty(),
            "deleted={value} should match nothing"
        );
    }

    let detail = service.get_by_id(&removed.id.to_string()).unwrap();
    assert!(detail.deleted);
}

#[test]
fn create_by_matches_joined_login_not_raw_creator_id() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = seed_user(&conn, "Alice.Smith@Example.com");
    let bob = seed_user(&conn, "bob@example.com");

    let by_alice = create(&service, "Roadmap", alice);
    create(&service, "Budget", bob);
    create(&service, "Orphaned", Uuid::new_v4());

    let found = service.list([("createBy", "alice.smith")]).unwrap();
    assert_eq!(ids(&found), vec![by_alice.id]);

    let found = service.list([("createBy", "EXAMPLE.COM")]).unwrap();
    assert_eq!(found.len(), 2);

    let raw_id_fragment = alice.simple().to_string()[..8].to_string();
    assert!(service
        .list([("createBy", raw_id_fragment)])
        .unwrap()
        .is_empty());
}

#[test]
fn create_by_pattern_is_matched_literally() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = seed_user(&conn, "alice@example.com");
    create(&service, "Roadmap", alice);

    assert!(service.list([("createBy", "a.*e")]).unwrap().is_empty());
    assert_eq!(service.list([("createBy", "e@e")]).unwrap().len(), 1);
}

#[test]
fn agenda_filter_is_trimmed_case_insensitive_substring() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let creator = Uuid::new_v4();

    let review = create(&service, "Quarterly Review", creator);
    create(&service, "Standup", creator);

    let found = service.list([("agenda", "  review  ")]).unwrap();
    assert_eq!(ids(&found), vec![review.id]);

    let all = service.list([("agenda", "   ")]).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn date_time_bounds_are_inclusive_and_open_ended() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let creator = Uuid::new_v4();

    let mut created = Vec::new();
    for (agenda, date) in [
        ("May", "2024-05-31T23:59:59Z"),
        ("June", "2024-06-01"),
        ("July", "2024-07-01T12:00:00Z"),
    ] {
        let input = MeetingInput {
            date_time: Some(json!(date)),
            ..MeetingInput::new(agenda, creator.to_string())
        };
        created.push(service.create(&input).unwrap().id);
    }
    let unscheduled = create(&service, "Unscheduled", creator);

    let from_june = service.list([("dateTimeFrom", "2024-06-01")]).unwrap();
    assert_eq!(ids(&from_june), vec![created[1], created[2]]);

    let until_june = service.list([("dateTimeTo", "2024-06-01")]).unwrap();
    assert_eq!(ids(&until_june), vec![created[0], created[1]]);

    let window = service
        .list([
            ("dateTimeFrom", "2024-06-01T00:00:00Z"),
            ("dateTimeTo", "2024-06-30"),
        ])
        .unwrap();
    assert_eq!(ids(&window), vec![created[1]]);

    assert!(!ids(&from_june).contains(&unscheduled.id));
}

#[test]
fn bare_year_bound_means_start_of_that_year() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let creator = Uuid::new_v4();

    let last_year = service
        .create(&MeetingInput {
            date_time: Some(json!("2023-06-01")),
            ..MeetingInput::new("Last year", creator.to_string())
        })
        .unwrap();
    let this_year = service
        .create(&MeetingInput {
            date_time: Some(json!("2024-01-01")),
            ..MeetingInput::new("This year", creator.to_string())
        })
        .unwrap();

    let found = service.list([("dateTimeFrom", "2024")]).unwrap();
    assert_eq!(ids(&found), vec![this_year.id]);

    let found = service.list([("dateTimeTo", "2023")]).unwrap();
    assert!(found.is_empty());
    let found = service.list([("dateTimeTo", "2024")]).unwrap();
    assert_eq!(ids(&found), vec![last_year.id, this_year.id]);
}

#[test]
fn timestamp_bounds_filter_on_creation_time() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let creator = Uuid::new_v4();

    let old = create(&service, "Old", creator);
    let recent = create(&service, "Recent", creator);
    conn.execute(
        "UPDATE meetings SET created_at = ?1 WHERE id = ?2;",
        params![1_704_067_200_000_i64, old.id.to_string()],
    )
    .unwrap();

    let found = service.list([("timestampFrom", "2024-06-01")]).unwrap();
    assert_eq!(ids(&found), vec![recent.id]);

    let found = service
        .list([
            ("timestampFrom", "2024-01-01"),
            ("timestampTo", "2024-01-01T00:00:00Z"),
        ])
        .unwrap();
    assert_eq!(ids(&found), vec![old.id]);
}

#[test]
fn malformed_dates_surface_as_store_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service
        .create(&MeetingInput {
            date_time: Some(json!("2024-06-01")),
            ..MeetingInput::new("Sync", Uuid::new_v4().to_string())
        })
        .unwrap();

    let err = service.list([("dateTimeFrom", "not-a-date")]).unwrap_err();
    assert!(matches!(err, MeetingError::Store(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_payload()["error"], json!("internal server error"));
}

#[test]
fn pass_through_parameters_filter_by_field_equality() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let creator = Uuid::new_v4();
    let contact = Uuid::new_v4();
    let lead = Uuid::new_v4();

    let in_room = service
        .create(&MeetingInput {
            location: Some("Room 4".to_string()),
            attendees: Some(json!([contact.to_string()])),
            ..MeetingInput::new("Design", creator.to_string())
        })
        .unwrap();
    let with_lead = service
        .create(&MeetingInput {
            location: Some("room 4".to_string()),
            attendees_lead: Some(json!([lead.to_string()])),
            ..MeetingInput::new("Pitch", Uuid::new_v4().to_string())
        })
        .unwrap();

    assert_eq!(
        ids(&service.list([("location", "Room 4")]).unwrap()),
        vec![in_room.id]
    );
    assert_eq!(
        ids(&service.list([("attendees", contact.to_string())]).unwrap()),
        vec![in_room.id]
    );
    assert_eq!(
        ids(&service.list([("attendeesLead", lead.to_string())]).unwrap()),
        vec![with_lead.id]
    );
    assert_eq!(
        ids(&service.list([("createdBy", creator.to_string())]).unwrap()),
        vec![in_room.id]
    );
    assert_eq!(
        ids(&service.list([("_id", with_lead.id.simple().to_string())]).unwrap()),
        vec![with_lead.id]
    );
    assert!(service
        .list([("location", "Room 4"), ("agenda", "pitch")])
        .unwrap()
        .is_empty());
    assert!(service.list([("page", "2")]).unwrap().is_empty());
}
