//! Append-only file [`Journal`].
//!
//! Every fact is one frame: a little-endian `u32` length followed by a bincode
//! [`Record`]. Opening the file replays all frames into an in-memory index, so
//! loads never touch the disk. Appends write every frame of a call in one
//! buffer and `fsync` it before reporting success.
//!
//! A frame cut short by a crash is dropped on open; a complete frame that does
//! not decode, or that is out of sequence for its stream, refuses the open.

use clubticket_core::event::SerializedEvent;
use clubticket_core::journal::{Journal, JournalError, JournalFuture};
use clubticket_core::stream::{StreamId, Version};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const LENGTH_PREFIX: usize = 4;

/// One journaled fact as it sits on disk.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    stream_id: String,
    version: u64,
    event_type: String,
    data: Vec<u8>,
    /// JSON text; bincode cannot carry a `serde_json::Value`.
    metadata: Option<String>,
}

struct LogFile {
    file: File,
    len: u64,
    streams: HashMap<StreamId, Vec<SerializedEvent>>,
}

/// Journal persisted to a single append-only file.
pub struct FileJournal {
    path: PathBuf,
    log: Mutex<LogFile>,
}

impl FileJournal {
    /// Open the journal at `path`, creating the file and its directory if needed.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Unavailable`] if the file cannot be read or opened, or
    ///   holds a complete frame that does not decode
    /// - [`JournalError::Corrupt`] if a frame is out of sequence for its stream or
    ///   carries metadata that is not JSON
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| io_error(&path, &e))?;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(&path, &e)),
        };
        let (streams, valid_len) = replay(&bytes)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, &e))?;

        let total = bytes.len() as u64;
        if valid_len < total {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = total - valid_len,
                "Discarding incomplete frame at end of journal"
            );
            file.set_len(valid_len).await.map_err(|e| io_error(&path, &e))?;
        }

        let facts: usize = streams.values().map(Vec::len).sum();
        tracing::info!(path = %path.display(), streams = streams.len(), facts, "Journal opened");

        Ok(Self {
            path,
            log: Mutex::new(LogFile {
                file,
                len: valid_len,
                streams,
            }),
        })
    }

    /// Location of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append_now(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Result<Version, JournalError> {
        let mut log = self.log.lock().await;
        let actual = Version::new(log.streams.get(&stream_id).map_or(0, Vec::len) as u64);

        if let Some(expected) = expected_version {
            if expected != actual {
                return Err(JournalError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                });
            }
        }

        let mut buffer = Vec::new();
        let mut version = actual;
        for event in &events {
            version = version.next();
            encode_frame(&mut buffer, &stream_id, version, event)?;
        }

        if let Err(e) = write_synced(&mut log.file, &buffer).await {
            // Cut back any partial write so the next append starts on a frame boundary.
            let len = log.len;
            if let Err(truncate) = log.file.set_len(len).await {
                tracing::error!(error = %truncate, "Failed to roll back partial journal write");
            }
            return Err(io_error(&self.path, &e));
        }

        log.len += buffer.len() as u64;
        log.streams.entry(stream_id).or_default().extend(events);
        Ok(version)
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Journal for FileJournal {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> JournalFuture<'_, Version> {
        Box::pin(self.append_now(stream_id, expected_version, events))
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> JournalFuture<'_, Vec<SerializedEvent>> {
        Box::pin(async move {
            let log = self.log.lock().await;
            let skip = from_version.map_or(0, |v| usize::try_from(v.value()).unwrap_or(usize::MAX));
            Ok(log
                .streams
                .get(&stream_id)
                .map(|stream| stream.iter().skip(skip).cloned().collect())
                .unwrap_or_default())
        })
    }

    fn stream_version(&self, stream_id: StreamId) -> JournalFuture<'_, Version> {
        Box::pin(async move {
            let log = self.log.lock().await;
            Ok(Version::new(log.streams.get(&stream_id).map_or(0, Vec::len) as u64))
        })
    }
}

async fn write_synced(file: &mut File, buffer: &[u8]) -> std::io::Result<()> {
    file.write_all(buffer).await?;
    file.flush().await?;
    file.sync_data().await
}

fn encode_frame(
    buffer: &mut Vec<u8>,
    stream_id: &StreamId,
    version: Version,
    event: &SerializedEvent,
) -> Result<(), JournalError> {
    let record = Record {
        stream_id: stream_id.as_str().to_string(),
        version: version.value(),
        event_type: event.event_type.clone(),
        data: event.data.clone(),
        metadata: event.metadata.as_ref().map(ToString::to_string),
    };
    let bytes = bincode::serialize(&record)
        .map_err(|e| JournalError::Unavailable(format!("cannot encode journal frame: {e}")))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| JournalError::Unavailable("journal frame too large".to_string()))?;

    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(&bytes);
    Ok(())
}

/// Rebuild the stream index from raw file contents.
///
/// Returns the index and the length of the prefix made of complete frames.
fn replay(bytes: &[u8]) -> Result<(HashMap<StreamId, Vec<SerializedEvent>>, u64), JournalError> {
    let mut streams: HashMap<StreamId, Vec<SerializedEvent>> = HashMap::new();
    let mut offset = 0;

    while let Some(header) = bytes.get(offset..offset + LENGTH_PREFIX) {
        let mut len = [0; LENGTH_PREFIX];
        len.copy_from_slice(header);
        let start = offset + LENGTH_PREFIX;
        let Some(body) = usize::try_from(u32::from_le_bytes(len))
            .ok()
            .and_then(|len| bytes.get(start..start + len))
        else {
            break;
        };

        let record: Record = bincode::deserialize(body).map_err(|e| {
            JournalError::Unavailable(format!("unreadable journal frame at byte {offset}: {e}"))
        })?;
        let stream_id = StreamId::new(record.stream_id);
        let version = Version::new(record.version);
        let stream = streams.entry(stream_id.clone()).or_default();

        if version.value() != stream.len() as u64 + 1 {
            return Err(JournalError::Corrupt {
                stream_id,
                version,
                reason: format!("expected version {}", stream.len() + 1),
            });
        }
        let metadata = record
            .metadata
            .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
            .transpose()
            .map_err(|e| JournalError::Corrupt {
                stream_id: stream_id.clone(),
                version,
                reason: format!("metadata is not JSON: {e}"),
            })?;

        stream.push(SerializedEvent::new(record.event_type, record.data, metadata));
        offset = start + body.len();
    }

    Ok((streams, offset as u64))
}

fn io_error(path: &Path, error: &std::io::Error) -> JournalError {
    JournalError::Unavailable(format!("{}: {error}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fact(name: &str, data: u8) -> SerializedEvent {
        SerializedEvent::new(
            name.to_string(),
            vec![data],
            Some(serde_json::json!({ "caller": "MLSC" })),
        )
    }

    #[tokio::test]
    async fn facts_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");

        {
            let journal = FileJournal::open(&path).await.unwrap();
            journal
                .append_events(StreamId::new("clubs"), Some(Version::INITIAL), vec![fact("ClubRegistered.v1", 1)])
                .await
                .unwrap();
            journal
                .append_events(
                    StreamId::new("event-1"),
                    Some(Version::INITIAL),
                    vec![fact("HolderOptedIn.v1", 2), fact("TicketIssued.v1", 3)],
                )
                .await
                .unwrap();
        }

        let reopened = FileJournal::open(&path).await.unwrap();
        let tickets = reopened
            .load_events(StreamId::new("event-1"), None)
            .await
            .unwrap();

        assert_eq!(tickets, vec![fact("HolderOptedIn.v1", 2), fact("TicketIssued.v1", 3)]);
        assert_eq!(
            reopened.stream_version(StreamId::new("clubs")).await.unwrap(),
            Version::new(1)
        );
        assert_eq!(
            reopened
                .load_events(StreamId::new("event-1"), Some(Version::new(1)))
                .await
                .unwrap(),
            vec![fact("TicketIssued.v1", 3)]
        );
    }

    #[tokio::test]
    async fn stale_expected_version_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        let journal = FileJournal::open(&path).await.unwrap();
        let stream = StreamId::new("events");
        journal
            .append_events(stream.clone(), Some(Version::INITIAL), vec![fact("EventCreated.v1", 1)])
            .await
            .unwrap();
        let size = tokio::fs::metadata(&path).await.unwrap().len();

        let err = journal
            .append_events(stream.clone(), Some(Version::INITIAL), vec![fact("EventCreated.v1", 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, JournalError::ConcurrencyConflict { .. }));
        assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), size);
    }

    #[tokio::test]
    async fn torn_tail_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let journal = FileJournal::open(&path).await.unwrap();
            journal
                .append_events(StreamId::new("clubs"), None, vec![fact("ClubRegistered.v1", 1)])
                .await
                .unwrap();
        }
        let intact = tokio::fs::metadata(&path).await.unwrap().len();

        // A crash mid-append leaves a length prefix with only part of its body.
        let mut bytes = tokio::fs::read(&path).await.unwrap();
        bytes.extend_from_slice(&200_u32.to_le_bytes());
        bytes.extend_from_slice(&[7; 10]);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let journal = FileJournal::open(&path).await.unwrap();

        assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), intact);
        let version = journal
            .append_events(StreamId::new("clubs"), Some(Version::new(1)), vec![fact("ClubRegistered.v1", 2)])
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let reopened = FileJournal::open(&path).await.unwrap();
        assert_eq!(
            reopened.load_events(StreamId::new("clubs"), None).await.unwrap().len(),
            2
        );
    }

    #[test]
    fn out_of_sequence_frame_is_corrupt() {
        let mut bytes = Vec::new();
        encode_frame(&mut bytes, &StreamId::new("clubs"), Version::new(2), &fact("ClubRegistered.v1", 1)).unwrap();

        let err = replay(&bytes).unwrap_err();

        assert_eq!(
            err,
            JournalError::Corrupt {
                stream_id: StreamId::new("clubs"),
                version: Version::new(2),
                reason: "expected version 1".to_string(),
            }
        );
    }
}
