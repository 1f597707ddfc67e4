mod common;

use common::ids;
use modelkit_core::{
    CompareOp, Condition, Direction, EntityDef, FieldRules, KitError, ModelService, QueryStage,
    Relation, RelationDirectives, ResultShape, SearchMode, SearchOutput, SearchParams,
    SqliteModelRepository, Value,
};
use std::sync::Arc;

fn search_ids(params: SearchParams) -> Vec<i64> {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));
    ids(&service.all(&params, &RelationDirectives::new()).unwrap())
}

fn relation_ids(relations: RelationDirectives) -> Vec<i64> {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));
    ids(&service.all(&SearchParams::new(), &relations).unwrap())
}

#[test]
fn default_order_is_sort_then_id_descending() {
    assert_eq!(search_ids(SearchParams::new()), vec![2, 4, 1, 3]);
}

#[test]
fn like_rule_wraps_value_in_wildcards() {
    assert_eq!(search_ids(SearchParams::new().filter("title", "Rust")), vec![2, 1]);
}

#[test]
fn like_rule_matches_wildcard_characters_literally() {
    assert_eq!(search_ids(SearchParams::new().filter("title", "0%")), vec![4]);
}

#[test]
fn in_rule_accepts_lists_and_scalars() {
    assert_eq!(
        search_ids(SearchParams::new().filter(
            "category",
            vec![Value::from("home"), Value::from("tech")]
        )),
        vec![2, 1, 3]
    );
    assert_eq!(search_ids(SearchParams::new().filter("category", "tech")), vec![1]);
}

#[test]
fn zero_is_an_exact_match_but_empty_is_ignored() {
    assert_eq!(search_ids(SearchParams::new().filter("status", 0)), vec![2]);
    assert_eq!(search_ids(SearchParams::new().filter("status", "")), vec![2, 4, 1, 3]);
    assert_eq!(search_ids(SearchParams::new().filter("title", "")), vec![2, 4, 1, 3]);
}

#[test]
fn ruled_keys_treat_zero_as_not_supplied() {
    let conn = common::open();
    common::seed(&conn);
    let entity = EntityDef::new("Article", "articles").rules(
        FieldRules::new()
            .rule(SearchMode::Equals, &["status"])
            .rule(SearchMode::Like, &["title"]),
    );
    let repo = SqliteModelRepository::try_new(&conn, entity, common::config()).unwrap();
    let service = ModelService::new(repo);
    let relations = RelationDirectives::new();

    for params in [
        SearchParams::new().filter("status", 0),
        SearchParams::new().filter("status", "0"),
        SearchParams::new().filter("title", "0"),
    ] {
        assert_eq!(ids(&service.all(&params, &relations).unwrap()), vec![2, 4, 1, 3]);
    }
    assert_eq!(
        ids(&service.all(&SearchParams::new().filter("status", 1), &relations).unwrap()),
        vec![4, 1, 3]
    );
}

#[test]
fn unknown_filter_keys_are_ignored() {
    assert_eq!(
        search_ids(SearchParams::new().filter("nickname", "x")),
        vec![2, 4, 1, 3]
    );
}

#[test]
fn custom_conditions_and_raw_fragments_compose() {
    assert_eq!(
        search_ids(SearchParams::new().where_custom(Condition::new("sort", CompareOp::Ge, 3))),
        vec![2, 4]
    );
    assert_eq!(search_ids(SearchParams::new().where_raw("sort < 3")), vec![1, 3]);
    assert_eq!(
        search_ids(
            SearchParams::new()
                .where_in("id", vec![Value::from(1), Value::from(2)])
                .filter("status", 1)
        ),
        vec![1]
    );
}

#[test]
fn explicit_order_replaces_default_order() {
    assert_eq!(
        search_ids(SearchParams::new().order_by("title", Direction::Asc)),
        vec![4, 3, 1, 2]
    );
}

#[test]
fn paginates_with_carried_parameters() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));
    let params = SearchParams::new().limit(2).page(2);

    let page = service.paginate(&params, &RelationDirectives::new()).unwrap();

    assert_eq!(ids(&page.data), vec![1, 3]);
    assert_eq!(page.total, 4);
    assert_eq!(page.per_page, 2);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.last_page, 2);
    assert!(!page.has_more());
    assert_eq!(page.params, params);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["total"], 4);
    assert_eq!(json["data"][0]["title"], "Rust basics");
}

#[test]
fn page_size_defaults_to_config() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let page = service
        .paginate(&SearchParams::new(), &RelationDirectives::new())
        .unwrap();

    assert_eq!(page.per_page, 10);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.data.len(), 4);
}

#[test]
fn search_shape_selects_output_kind() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));
    let params = SearchParams::new().limit(1);
    let relations = RelationDirectives::new();

    match service.search(&params, &relations, ResultShape::Paginated).unwrap() {
        SearchOutput::Page(page) => assert_eq!(page.data.len(), 1),
        other => panic!("expected page, got {other:?}"),
    }
    match service.search(&params, &relations, ResultShape::All).unwrap() {
        SearchOutput::Collection(records) => assert_eq!(records.len(), 4),
        other => panic!("expected collection, got {other:?}"),
    }
}

#[test]
fn projection_limits_returned_columns() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let records = service
        .all(
            &SearchParams::new().select(&["id", "title"]),
            &RelationDirectives::new(),
        )
        .unwrap();

    assert_eq!(records[0].fields.keys().collect::<Vec<_>>(), vec!["id", "title"]);
}

#[test]
fn raw_projection_keeps_count_columns_after_it() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let records = service
        .all(
            &SearchParams::new()
                .select_raw("id, title AS heading")
                .order_by("id", Direction::Asc),
            &RelationDirectives::new().with_count("comments"),
        )
        .unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0].fields.keys().collect::<Vec<_>>(),
        vec!["id", "heading", "comments_count"]
    );
    assert_eq!(records[0].get("heading"), Some(&Value::from("Rust basics")));
    assert_eq!(records[0].get("comments_count"), Some(&Value::Integer(2)));
    assert_eq!(records[0].get("title"), None);
}

#[test]
fn find_by_field_returns_first_match() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let found = service
        .find_by_field(
            &SearchParams::new().filter("title", "Garden"),
            &RelationDirectives::new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(found.get("id"), Some(&Value::Integer(3)));

    let missing = service
        .find_by_field(
            &SearchParams::new().filter("title", "nothing like this"),
            &RelationDirectives::new(),
        )
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn eager_loads_has_many_rows() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let records = service
        .all(
            &SearchParams::new().order_by("id", Direction::Asc),
            &RelationDirectives::new().with("comments"),
        )
        .unwrap();

    assert_eq!(records[0].relation("comments").len(), 2);
    assert!(records[1].relation("comments").is_empty());
    assert_eq!(
        records[2].relation("comments")[0].get("body"),
        Some(&Value::from("tomatoes?"))
    );

    let json = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(json["comments"].as_array().unwrap().len(), 2);
}

#[test]
fn eager_loads_belongs_to_row() {
    let conn = common::open();
    common::seed(&conn);
    let repo =
        SqliteModelRepository::try_new(&conn, common::comment_entity(), common::config()).unwrap();
    let service = ModelService::new(repo);

    let records = service
        .all(&SearchParams::new(), &RelationDirectives::new().with("article"))
        .unwrap();

    assert_eq!(records.len(), 3);
    for record in &records {
        let article = record.relation("article");
        assert_eq!(article.len(), 1);
        assert_eq!(article[0].get("id"), record.get("article_id"));
    }
}

#[test]
fn eager_loads_rows_whose_key_is_stored_as_text() {
    let conn = common::open();
    common::seed(&conn);
    conn.execute_batch(
        "CREATE TABLE mk_notes (id INTEGER PRIMARY KEY, article_ref TEXT, body TEXT);
         INSERT INTO mk_notes (article_ref, body) VALUES ('1', 'first'), ('3', 'third');",
    )
    .unwrap();
    let entity = common::article_entity()
        .relation(Relation::has_many("notes", "notes", "article_ref", "id"));
    let repo = SqliteModelRepository::try_new(&conn, entity, common::config()).unwrap();
    let service = ModelService::new(repo);

    let records = service
        .all(
            &SearchParams::new().order_by("id", Direction::Asc),
            &RelationDirectives::new().with("notes"),
        )
        .unwrap();

    let bodies = records
        .iter()
        .map(|record| {
            record
                .relation("notes")
                .iter()
                .filter_map(|row| row.get("body").cloned())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    assert_eq!(
        bodies,
        vec![
            vec![Value::from("first")],
            Vec::new(),
            vec![Value::from("third")],
            Vec::new(),
        ]
    );
}

#[test]
fn with_count_adds_count_column() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let records = service
        .all(
            &SearchParams::new().order_by("id", Direction::Asc),
            &RelationDirectives::new().with_count("comments"),
        )
        .unwrap();

    let counts = records
        .iter()
        .map(|record| record.get("comments_count").cloned())
        .collect::<Vec<_>>();
    assert_eq!(
        counts,
        vec![
            Some(Value::Integer(2)),
            Some(Value::Integer(0)),
            Some(Value::Integer(1)),
            Some(Value::Integer(0)),
        ]
    );
}

#[test]
fn existence_directives_filter_parent_rows() {
    assert_eq!(relation_ids(RelationDirectives::new().has("comments")), vec![1, 3]);
    assert_eq!(
        relation_ids(RelationDirectives::new().has_count("comments", CompareOp::Ge, 2)),
        vec![1]
    );
    assert_eq!(
        relation_ids(RelationDirectives::new().doesnt_have("comments")),
        vec![2, 4]
    );
    assert_eq!(
        relation_ids(
            RelationDirectives::new().where_has("comments", vec![Condition::eq("approved", 0)])
        ),
        vec![1]
    );
    assert_eq!(
        relation_ids(
            RelationDirectives::new()
                .where_doesnt_have("comments", vec![Condition::eq("approved", 1)])
        ),
        vec![2, 4]
    );
}

#[test]
fn relation_filters_compose_with_field_filters() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let records = service
        .all(
            &SearchParams::new().filter("category", "home"),
            &RelationDirectives::new().has("comments"),
        )
        .unwrap();

    assert_eq!(ids(&records), vec![3]);
}

#[test]
fn unknown_relation_fails_in_relation_stage() {
    let conn = common::open();
    common::seed(&conn);
    let service = ModelService::new(common::articles(&conn));

    let err = service
        .all(&SearchParams::new(), &RelationDirectives::new().with("tags"))
        .unwrap_err();

    match err {
        KitError::QueryBuild { stage, message } => {
            assert_eq!(stage, QueryStage::Relations);
            assert!(message.contains("tags"));
        }
        other => panic!("expected query build error, got {other:?}"),
    }
}

#[test]
fn rule_on_missing_column_fails_in_filter_stage() {
    let conn = common::open();
    common::seed(&conn);
    let entity = EntityDef::new("Article", "articles")
        .rules(FieldRules::new().rule(SearchMode::Like, &["summary"]));
    let repo = SqliteModelRepository::try_new(&conn, entity, common::config()).unwrap();
    let service = ModelService::new(repo);

    let err = service
        .all(
            &SearchParams::new().filter("summary", "x"),
            &RelationDirectives::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        KitError::QueryBuild {
            stage: QueryStage::Filters,
            ..
        }
    ));
    assert!(err.to_string().starts_with("failed to build query filters:"));
}

#[test]
fn active_only_scope_hides_inactive_rows() {
    let conn = common::open();
    common::seed(&conn);
    let repo = SqliteModelRepository::try_new(
        &conn,
        common::article_entity().active_only(true),
        common::config(),
    )
    .unwrap();
    let service = ModelService::new(repo);

    let records = service
        .all(&SearchParams::new(), &RelationDirectives::new())
        .unwrap();
    assert_eq!(ids(&records), vec![4, 1, 3]);

    // Primary key lookups still see inactive rows.
    assert!(service.find_one(&Value::Integer(2)).unwrap().is_some());
}

#[test]
fn active_only_requires_status_sentinels() {
    let conn = common::open();
    let entity = EntityDef::new("Article", "articles").active_only(true);

    let result = SqliteModelRepository::try_new(&conn, entity, common::config());

    assert!(matches!(result, Err(KitError::MissingConstant { .. })));
}

#[test]
fn missing_table_is_rejected_at_construction() {
    let conn = common::open();
    let entity = EntityDef::new("Ghost", "ghosts");

    let result = SqliteModelRepository::try_new(&conn, entity, common::config());

    assert!(matches!(result, Err(KitError::MissingTable(table)) if table == "mk_ghosts"));
}

#[test]
fn date_preset_conditions_filter_created_at() {
    let conn = common::open();
    common::seed(&conn);
    let service =
        ModelService::new(common::articles(&conn)).with_clock(Arc::new(common::fixed_clock()));

    let conditions = service.date_conditions("date_month", "", None).unwrap();
    assert_eq!(
        conditions,
        vec![
            Condition::new("created_at", CompareOp::Ge, "2024-05-01 00:00:00"),
            Condition::new("created_at", CompareOp::Le, "2024-05-31 23:59:59"),
        ]
    );

    let mut params = SearchParams::new();
    for condition in conditions {
        params = params.where_custom(condition);
    }
    let records = service.all(&params, &RelationDirectives::new()).unwrap();
    assert_eq!(ids(&records), vec![1, 3]);

    let custom = service
        .date_conditions("custom", "2023-12-01 - 2023-12-31", None)
        .unwrap();
    assert_eq!(custom[1].value, Value::from("2023-12-31 23:59:59"));

    assert!(service.date_conditions("bogus", "", None).unwrap().is_empty());
    assert!(matches!(
        service.date_conditions("today", "", Some("published_at")),
        Err(KitError::MissingColumn { .. })
    ));
}
