//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `modelkit_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use modelkit_core::{open_db_in_memory, BatchUpdater, Migration, Row};
use std::process::ExitCode;

const DEMO_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE items (id INTEGER PRIMARY KEY, status TEXT NOT NULL);
          INSERT INTO items (id, status) VALUES (1, 'new'), (2, 'new');",
}];

fn main() -> ExitCode {
    println!("modelkit_core version={}", modelkit_core::core_version());

    let conn = match open_db_in_memory(DEMO_MIGRATIONS) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("modelkit_core db_open=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    let rows = [
        Row::new().with("id", 1).with("status", "A"),
        Row::new().with("id", 2).with("status", "B"),
    ];
    let updated = BatchUpdater::new(&conn).update_all_batch_by_table("items", &rows);
    println!("modelkit_core batch_update={updated}");

    if updated {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
