mod common;

use modelkit_core::{build_batch_update, BatchUpdater, KitError, ModelService, Row};

fn seed_items(conn: &rusqlite::Connection) {
    conn.execute_batch(
        "INSERT INTO items (id, status, label) VALUES (1, 'new', 'a'), (2, 'new', 'b'), (3, 'new', 'c');",
    )
    .unwrap();
}

fn status_of(conn: &rusqlite::Connection, id: i64) -> String {
    conn.query_row("SELECT status FROM items WHERE id = ?1", [id], |row| row.get(0))
        .unwrap()
}

#[test]
fn builds_one_case_statement_per_column() {
    let rows = [
        Row::new().with("id", 1).with("status", "A"),
        Row::new().with("id", 2).with("status", "B"),
    ];
    let statement = build_batch_update("items", &rows).unwrap();

    assert_eq!(
        statement.sql,
        "UPDATE items SET status = CASE WHEN id = 1 THEN 'A' WHEN id = 2 THEN 'B' ELSE status END WHERE id IN (1, 2)"
    );
    assert_eq!(statement.reference_column, "id");
    assert_eq!(statement.row_count, 2);
}

#[test]
fn updates_rows_in_batch_and_keeps_others() {
    let conn = common::open();
    seed_items(&conn);
    let rows = [
        Row::new().with("id", 1).with("status", "A").with("label", "x"),
        Row::new().with("id", 3).with("status", "O'Brien").with("label", "z"),
    ];

    assert!(BatchUpdater::new(&conn).update_all_batch_by_table("items", &rows));

    assert_eq!(status_of(&conn, 1), "A");
    assert_eq!(status_of(&conn, 2), "new");
    assert_eq!(status_of(&conn, 3), "O'Brien");
    assert_eq!(
        common::text(&conn, "SELECT label FROM items WHERE id = 3").as_deref(),
        Some("z")
    );
}

#[test]
fn reference_column_falls_back_to_first_column() {
    let conn = common::open();
    seed_items(&conn);
    let rows = [
        Row::new().with("label", "a").with("status", "first"),
        Row::new().with("label", "b").with("status", "second"),
    ];

    let affected = BatchUpdater::new(&conn)
        .try_update_all_batch_by_table("items", &rows)
        .unwrap();

    assert_eq!(affected, 2);
    assert_eq!(status_of(&conn, 1), "first");
    assert_eq!(status_of(&conn, 2), "second");
}

#[test]
fn empty_batch_fails_without_touching_database() {
    let conn = common::open();
    seed_items(&conn);
    let updater = BatchUpdater::new(&conn);

    assert!(!updater.update_all_batch_by_table("items", &[]));
    assert!(matches!(
        updater.try_update_all_batch_by_table("items", &[]),
        Err(KitError::EmptyInput)
    ));
    assert_eq!(status_of(&conn, 1), "new");
}

#[test]
fn missing_reference_column_fails() {
    let conn = common::open();
    seed_items(&conn);
    let rows = [Row::new().with("code", "a").with("status", "A")];
    let updater = BatchUpdater::new(&conn);

    assert!(!updater.update_all_batch_by_table("items", &rows));
    match updater.try_update_all_batch_by_table("items", &rows) {
        Err(KitError::MissingColumn { table, column }) => {
            assert_eq!(table, "items");
            assert_eq!(column, "code");
        }
        other => panic!("expected missing column, got {other:?}"),
    }
    assert_eq!(status_of(&conn, 1), "new");
}

#[test]
fn no_matching_rows_reports_failure() {
    let conn = common::open();
    seed_items(&conn);
    let rows = [Row::new().with("id", 99).with("status", "A")];

    assert!(!BatchUpdater::new(&conn).update_all_batch_by_table("items", &rows));
}

#[test]
fn rows_with_differing_columns_are_rejected() {
    let rows = [
        Row::new().with("id", 1).with("status", "A"),
        Row::new().with("id", 2).with("label", "b"),
    ];

    assert!(matches!(
        build_batch_update("items", &rows),
        Err(KitError::IncompleteRow { index: 1, .. })
    ));
}

#[test]
fn unsafe_table_name_is_rejected() {
    let rows = [Row::new().with("id", 1).with("status", "A")];

    assert!(matches!(
        build_batch_update("items; DROP TABLE items", &rows),
        Err(KitError::InvalidIdentifier(_))
    ));
}

#[test]
fn entity_batch_targets_prefixed_table() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));
    let rows = [
        Row::new().with("id", 1).with("sort", 10),
        Row::new().with("id", 2).with("sort", 20),
    ];

    assert!(service.update_all_batch_by_entity(&rows));

    let sort: i64 = conn
        .query_row("SELECT sort FROM mk_articles WHERE id = 2", [], |row| row.get(0))
        .unwrap();
    assert_eq!(sort, 20);
}
