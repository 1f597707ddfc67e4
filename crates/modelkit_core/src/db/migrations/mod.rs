//! Host-supplied migration executor.
//!
//! # Responsibility
//! - Apply an application's ordered schema migrations atomically.
//!
//! # Invariants
//! - `version` values must be strictly increasing within one list.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step owned by the host application.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

/// Returns the latest version in `migrations`, `0` for an empty list.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    ensure_monotonic(migrations)?;

    let current_version = current_user_version(conn)?;
    let latest = latest_version(migrations);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::MigrationFailed {
                version: migration.version,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reads the applied schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn ensure_monotonic(migrations: &[Migration]) -> DbResult<()> {
    for pair in migrations.windows(2) {
        if pair[1].version <= pair[0].version {
            return Err(DbError::MigrationOrder {
                previous: pair[0].version,
                next: pair[1].version,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, latest_version, Migration};
    use crate::db::DbError;
    use rusqlite::Connection;

    const STEPS: &[Migration] = &[
        Migration {
            version: 1,
            sql: "CREATE TABLE a (id INTEGER PRIMARY KEY);",
        },
        Migration {
            version: 2,
            sql: "ALTER TABLE a ADD COLUMN name TEXT;",
        },
    ];

    #[test]
    fn latest_version_of_empty_list_is_zero() {
        assert_eq!(latest_version(&[]), 0);
        assert_eq!(latest_version(STEPS), 2);
    }

    #[test]
    fn applies_pending_steps_only_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn, &STEPS[..1]).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), 1);

        apply_migrations(&mut conn, STEPS).unwrap();
        apply_migrations(&mut conn, STEPS).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), 2);
    }

    #[test]
    fn failing_step_reports_its_version_and_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        let broken = [
            STEPS[0],
            Migration {
                version: 2,
                sql: "ALTER TABLE missing ADD COLUMN name TEXT;",
            },
        ];

        let err = apply_migrations(&mut conn, &broken).unwrap_err();

        assert!(matches!(err, DbError::MigrationFailed { version: 2, .. }));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
    }

    #[test]
    fn rejects_out_of_order_versions() {
        let mut conn = Connection::open_in_memory().unwrap();
        let reversed = [STEPS[1], STEPS[0]];
        let err = apply_migrations(&mut conn, &reversed).unwrap_err();
        assert!(matches!(
            err,
            DbError::MigrationOrder {
                previous: 2,
                next: 1
            }
        ));
    }
}
