//! SQLite connection handle and migration runner.
//!
//! `rusqlite` is blocking, so every statement runs on the tokio blocking
//! pool behind a mutex-guarded connection. Callers never hold the lock
//! across an `.await`.

use std::sync::{Arc, Mutex};

use bookstore_kernel::settings::DatabaseSettings;
use bookstore_kernel::Migration;
use rusqlite::{params, Connection, ErrorCode};
use thiserror::Error;

const MIGRATIONS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (module, id)
)";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to open database at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DbError {
    /// True when the statement violated a UNIQUE, PRIMARY KEY, NOT NULL or CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
        )
    }
}

/// Shared handle to a single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database described by `settings`.
    pub fn open(settings: &DatabaseSettings) -> DbResult<Self> {
        let conn = if settings.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&settings.path)
        }
        .map_err(|source| DbError::Open {
            path: settings.path.clone(),
            source,
        })?;

        conn.pragma_update(None, "foreign_keys", "ON")?;

        tracing::info!(target: "bookstore-db", path = %settings.path, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DatabaseSettings {
            path: ":memory:".to_string(),
            ..DatabaseSettings::default()
        })
    }

    /// Run `operation` against the connection on the blocking pool.
    pub async fn call<F, T>(&self, operation: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| DbError::Poisoned)?;
            operation(&mut guard).map_err(DbError::from)
        })
        .await?
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Each migration runs in its own transaction together with its ledger
    /// row. Returns the number of migrations applied by this call.
    pub async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> DbResult<usize> {
        let migrations = migrations.to_vec();

        self.call(move |conn| {
            conn.execute_batch(MIGRATIONS_TABLE_SQL)?;

            let mut applied = 0;
            for (module, migration) in &migrations {
                let already_applied: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE module = ?1 AND id = ?2)",
                    params![module, migration.id],
                    |row| row.get(0),
                )?;
                if already_applied {
                    continue;
                }

                let tx = conn.transaction()?;
                tx.execute_batch(migration.up)?;
                tx.execute(
                    "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2)",
                    params![module, migration.id],
                )?;
                tx.commit()?;

                tracing::info!(
                    target: "bookstore-db",
                    module = %module,
                    migration = migration.id,
                    "applied migration"
                );
                applied += 1;
            }

            Ok(applied)
        })
        .await
    }
}
