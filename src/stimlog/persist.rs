//! Persisted event log format
//!
//! ```text
//! +-------+---------+-----------+----------------------+
//! | FESL  | version | crc32 LE  | JSON payload         |
//! | 4 B   | 1 B     | 4 B       | origin_time + events |
//! +-------+---------+-----------+----------------------+
//! ```
//!
//! Loading is all-or-nothing: any framing, checksum or payload problem
//! fails the whole load.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::constants::persistence::{FORMAT_VERSION, HEADER_LEN, MAGIC};
use crate::stimlog::event::StimulationEvent;
use crate::stimlog::log::EventLog;
use crate::utils::time::{SystemTimeProvider, TimeProvider, Timestamp};

/// Event log load/save failures
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persisted log truncated: {len} bytes is shorter than the header")]
    Truncated { len: usize },

    #[error("not a stimulation log (bad magic)")]
    BadMagic,

    #[error("unsupported log format version {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch: header says {expected:#010x}, payload hashes to {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("malformed log payload: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct PersistedLogRef<'a> {
    origin_time: Timestamp,
    events: &'a [StimulationEvent],
}

#[derive(Deserialize)]
struct PersistedLog {
    origin_time: Timestamp,
    events: Vec<StimulationEvent>,
}

impl EventLog {
    /// Serialize origin and every event, open ones included
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        let payload = serde_json::to_vec(&PersistedLogRef {
            origin_time: self.origin(),
            events: self.events(),
        })
        .map_err(|e| PersistError::Malformed(e.to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Rebuild a log persisted by [`EventLog::to_bytes`], on the system clock
    pub fn from_bytes(bytes: &[u8]) -> Result<EventLog, PersistError> {
        Self::from_bytes_with_time_provider(bytes, Arc::new(SystemTimeProvider))
    }

    pub fn from_bytes_with_time_provider(
        bytes: &[u8],
        clock: Arc<dyn TimeProvider>,
    ) -> Result<EventLog, PersistError> {
        if bytes.len() < HEADER_LEN {
            return Err(PersistError::Truncated { len: bytes.len() });
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if &header[..4] != MAGIC {
            return Err(PersistError::BadMagic);
        }
        if header[4] != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(header[4]));
        }

        let expected = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(PersistError::ChecksumMismatch { expected, actual });
        }

        let persisted: PersistedLog =
            serde_json::from_slice(payload).map_err(|e| PersistError::Malformed(e.to_string()))?;
        Ok(EventLog::from_parts(persisted.origin_time, persisted.events, clock))
    }

    /// Write the log to `path`. Blocking; keep it off the tick path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        info!(path = %path.display(), events = self.len(), bytes = bytes.len(), "event log saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<EventLog, PersistError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
