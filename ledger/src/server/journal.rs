//! Journal selection for the server.

use clubticket_core::journal::{Journal, JournalError};
use clubticket_postgres::PostgresJournal;
use clubticket_runtime::FileJournal;
use std::sync::Arc;

use crate::config::{JournalBackend, JournalConfig};

/// Open the journal `config` selects, ready for [`Ledger::restore`](crate::Ledger::restore).
///
/// A `PostgreSQL` journal is migrated before it is returned.
///
/// # Errors
///
/// Returns [`JournalError`] if the database cannot be reached or migrated, or
/// the journal file cannot be opened or replayed.
pub async fn open_journal(config: &JournalConfig) -> Result<Arc<dyn Journal>, JournalError> {
    match config.backend() {
        JournalBackend::Postgres {
            url,
            max_connections,
        } => {
            let journal = PostgresJournal::connect(&url, max_connections).await?;
            journal.migrate().await?;
            tracing::info!("Journaling to PostgreSQL");
            Ok(Arc::new(journal))
        },
        JournalBackend::File(path) => {
            let journal = FileJournal::open(&path).await?;
            tracing::info!(path = %path.display(), "Journaling to file");
            Ok(Arc::new(journal))
        },
    }
}
