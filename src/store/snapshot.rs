use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, TokenId};
use crate::store::lock::FileLock;
use crate::store::state::State;
use crate::store::Store;

const MAGIC: [u8; 8] = *b"MSEARCH1";
const FORMAT_VERSION: u32 = 1;

/// On-disk framing: magic, then this record bincode-serialized. The
/// checksum covers the payload, which is the bincode-serialized [`State`].
#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    checksum: u32,
    saved_at: DateTime<Utc>,
    payload: Vec<u8>,
}

/// Durable single-file store.
///
/// The whole logical state lives in memory; `commit` serializes it and
/// atomically replaces the database file, `rollback` re-reads the last
/// committed snapshot. Mutations outside a transaction persist immediately
/// (autocommit). An exclusive advisory lock held for the lifetime of the
/// store keeps out concurrent sessions; a held lock surfaces as `Busy`.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    _lock: FileLock,
    state: State,
    in_tx: bool,
}

impl SnapshotStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock = FileLock::acquire(&path.with_extension("lock"))?;
        let state = Self::load(&path)?;
        Ok(SnapshotStore {
            path,
            _lock: lock,
            state,
            in_tx: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<State> {
        if !path.exists() {
            return Ok(State::default());
        }
        let bytes = fs::read(path)?;
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("{} is not a minisearch database", path.display()),
            ));
        }
        let snapshot: SnapshotFile = bincode::deserialize(&bytes[MAGIC.len()..])?;
        if snapshot.version != FORMAT_VERSION {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("unsupported database format version {}", snapshot.version),
            ));
        }
        if crc32fast::hash(&snapshot.payload) != snapshot.checksum {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("checksum mismatch in {}", path.display()),
            ));
        }
        let mut state: State = bincode::deserialize(&snapshot.payload)?;
        state.rebuild_indexes();
        Ok(state)
    }

    fn persist(&self) -> Result<()> {
        let payload = bincode::serialize(&self.state)?;
        let snapshot = SnapshotFile {
            version: FORMAT_VERSION,
            checksum: crc32fast::hash(&payload),
            saved_at: Utc::now(),
            payload,
        };
        let mut bytes = MAGIC.to_vec();
        bytes.extend(bincode::serialize(&snapshot)?);

        // replace atomically so readers never observe a half-written file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn autocommit(&self) -> Result<()> {
        if self.in_tx {
            Ok(())
        } else {
            self.persist()
        }
    }
}

impl Store for SnapshotStore {
    fn document_id(&self, title: &str) -> Result<Option<DocId>> {
        Ok(self.state.document_id(title))
    }

    fn document_title(&self, id: DocId) -> Result<Option<String>> {
        Ok(self.state.document_title(id))
    }

    fn add_document(&mut self, title: &str, body: &str) -> Result<DocId> {
        let id = self.state.add_document(title, body);
        self.autocommit()?;
        Ok(id)
    }

    fn token_id(&mut self, token: &str, insert: bool) -> Result<Option<(TokenId, u32)>> {
        let before = self.state.tokens.len();
        let found = self.state.token_id(token, insert);
        if self.state.tokens.len() != before {
            self.autocommit()?;
        }
        Ok(found)
    }

    fn token(&self, id: TokenId) -> Result<Option<String>> {
        Ok(self.state.token(id))
    }

    fn postings(&self, id: TokenId) -> Result<Option<(u32, Vec<u8>)>> {
        Ok(self.state.postings(id))
    }

    fn update_postings(&mut self, id: TokenId, docs_count: u32, encoded: &[u8]) -> Result<()> {
        if !self.state.update_postings(id, docs_count, encoded) {
            return Err(Error::new(
                ErrorKind::StoreLogic,
                format!("no token with id {}", id.value()),
            ));
        }
        self.autocommit()
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.setting(key))
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.state.put_setting(key, value);
        self.autocommit()
    }

    fn document_count(&self) -> Result<u32> {
        Ok(self.state.document_count())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_tx {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "transaction already open".to_string(),
            ));
        }
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "no open transaction".to_string(),
            ));
        }
        self.persist()?;
        self.in_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_tx {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "no open transaction".to_string(),
            ));
        }
        self.state = Self::load(&self.path)?;
        self.in_tx = false;
        Ok(())
    }
}
