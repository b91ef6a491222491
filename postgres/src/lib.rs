//! `PostgreSQL` journal for the club ticket ledger.
//!
//! [`PostgresJournal`] implements the [`Journal`] trait from `clubticket-core` on a
//! `sqlx` connection pool. Every fact is one row keyed by `(stream_id, version)`:
//!
//! - Appends run in a transaction that checks the expected version first
//! - The primary key turns a racing writer into a concurrency conflict
//! - Loads return a stream's rows in version order
//!
//! # Example
//!
//! ```ignore
//! use clubticket_postgres::PostgresJournal;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let journal = PostgresJournal::connect("postgres://localhost/clubticket", 10).await?;
//!     journal.migrate().await?;
//!     Ok(())
//! }
//! ```

use clubticket_core::event::SerializedEvent;
use clubticket_core::journal::{Journal, JournalError, JournalFuture};
use clubticket_core::stream::{StreamId, Version};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Journal stored in a `PostgreSQL` table.
#[derive(Clone, Debug)]
pub struct PostgresJournal {
    pool: PgPool,
}

impl PostgresJournal {
    /// Connect to `database_url` with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Unavailable`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, JournalError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| JournalError::Unavailable(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to journal database");
        Ok(Self::from_pool(pool))
    }

    /// Use an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `journal` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Unavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), JournalError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| JournalError::Unavailable(format!("Migration failed: {e}")))
    }

    async fn current_version<'e, E>(executor: E, stream_id: &StreamId) -> Result<Version, JournalError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let raw: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM journal WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(executor)
                .await
                .map_err(unavailable)?;
        from_db(raw)
    }
}

impl Journal for PostgresJournal {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> JournalFuture<'_, Version> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable)?;
            let actual = Self::current_version(&mut *tx, &stream_id).await?;

            if let Some(expected) = expected_version {
                if expected != actual {
                    return Err(JournalError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual,
                    });
                }
            }

            let mut version = actual;
            for event in events {
                version = version.next();
                let inserted = sqlx::query(
                    "INSERT INTO journal (stream_id, version, event_type, event_data, metadata) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(stream_id.as_str())
                .bind(to_db(version)?)
                .bind(event.event_type)
                .bind(event.data)
                .bind(event.metadata)
                .execute(&mut *tx)
                .await;

                if let Err(e) = inserted {
                    // Another writer committed this position after our version check.
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.is_unique_violation() {
                            return Err(JournalError::ConcurrencyConflict {
                                stream_id,
                                expected: actual,
                                actual: version,
                            });
                        }
                    }
                    return Err(unavailable(e));
                }
            }

            tx.commit().await.map_err(unavailable)?;
            tracing::trace!(stream = %stream_id, %version, "Appended to journal");
            Ok(version)
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> JournalFuture<'_, Vec<SerializedEvent>> {
        Box::pin(async move {
            let from = to_db(from_version.unwrap_or(Version::INITIAL))?;
            let rows: Vec<(String, Vec<u8>, Option<serde_json::Value>)> = sqlx::query_as(
                "SELECT event_type, event_data, metadata FROM journal \
                 WHERE stream_id = $1 AND version > $2 ORDER BY version",
            )
            .bind(stream_id.as_str())
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

            Ok(rows
                .into_iter()
                .map(|(event_type, data, metadata)| SerializedEvent::new(event_type, data, metadata))
                .collect())
        })
    }

    fn stream_version(&self, stream_id: StreamId) -> JournalFuture<'_, Version> {
        Box::pin(async move { Self::current_version(&self.pool, &stream_id).await })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn unavailable(e: sqlx::Error) -> JournalError {
    JournalError::Unavailable(e.to_string())
}

fn to_db(version: Version) -> Result<i64, JournalError> {
    i64::try_from(version.value())
        .map_err(|_| JournalError::Unavailable(format!("version {version} does not fit BIGINT")))
}

fn from_db(raw: i64) -> Result<Version, JournalError> {
    u64::try_from(raw)
        .map(Version::new)
        .map_err(|_| JournalError::Unavailable(format!("negative stream version {raw}")))
}
