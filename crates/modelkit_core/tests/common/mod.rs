#![allow(dead_code)]

use chrono::NaiveDate;
use modelkit_core::{
    open_db_in_memory, EntityDef, FieldRules, FixedClock, KitConfig, Migration, Relation,
    SearchMode, SqliteModelRepository,
};
use rusqlite::Connection;

pub const PREFIX: &str = "mk_";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE mk_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL DEFAULT '',
                category TEXT,
                status INTEGER NOT NULL DEFAULT 1,
                sort INTEGER NOT NULL DEFAULT 0,
                created_user INTEGER,
                created_at TEXT,
                updated_at TEXT,
                deleted_at TEXT
              );
              CREATE TABLE mk_comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                body TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0
              );",
    },
    Migration {
        version: 2,
        sql: "CREATE TABLE items (id INTEGER PRIMARY KEY, status TEXT, label TEXT);
              CREATE TABLE mk_tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    },
];

pub fn open() -> Connection {
    open_db_in_memory(MIGRATIONS).unwrap()
}

pub fn config() -> KitConfig {
    KitConfig {
        table_prefix: PREFIX.to_string(),
        ..KitConfig::default()
    }
}

pub fn article_entity() -> EntityDef {
    EntityDef::new("Article", "articles")
        .rules(
            FieldRules::new()
                .rule(SearchMode::Like, &["title"])
                .rule(SearchMode::In, &["category"]),
        )
        .status(1, 0)
        .relation(Relation::has_many("comments", "comments", "article_id", "id"))
}

pub fn comment_entity() -> EntityDef {
    EntityDef::new("Comment", "comments")
        .relation(Relation::belongs_to("article", "articles", "article_id", "id"))
}

pub fn articles(conn: &Connection) -> SqliteModelRepository<'_> {
    SqliteModelRepository::try_new(conn, article_entity(), config()).unwrap()
}

/// Seeds four articles (ids 1..=4) and three comments.
///
/// | id | title         | category | status | sort |
/// |----|---------------|----------|--------|------|
/// | 1  | Rust basics   | tech     | 1      | 2    |
/// | 2  | Rusty hinges  | home     | 0      | 4    |
/// | 3  | Gardening 101 | home     | 1      | 1    |
/// | 4  | 100% cotton   | NULL     | 1      | 3    |
pub fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO mk_articles (id, title, category, status, sort, created_at) VALUES
            (1, 'Rust basics', 'tech', 1, 2, '2024-05-02 09:00:00'),
            (2, 'Rusty hinges', 'home', 0, 4, '2024-04-20 09:00:00'),
            (3, 'Gardening 101', 'home', 1, 1, '2024-05-14 09:00:00'),
            (4, '100% cotton', NULL, 1, 3, '2023-12-31 23:00:00');
         INSERT INTO mk_comments (article_id, body, approved) VALUES
            (1, 'great intro', 1),
            (1, 'typo in part 2', 0),
            (3, 'tomatoes?', 1);",
    )
    .unwrap();
}

pub fn fixed_clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap(),
    )
}

pub fn ids(records: &[modelkit_core::Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| record.get("id").and_then(|id| id.as_i64()).unwrap())
        .collect()
}

pub fn text(conn: &Connection, sql: &str) -> Option<String> {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}
