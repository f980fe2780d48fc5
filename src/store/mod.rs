pub mod lock;
pub mod mem;
pub mod snapshot;
pub mod state;

use std::thread;
use std::time::Duration;

use crate::core::error::{ErrorKind, Result};
use crate::core::types::{DocId, TokenId};

/// Abstract persistence used by the indexing pipeline and the query engine:
/// documents, tokens, posting blobs, settings, and transaction boundaries.
///
/// Identifiers are dense positive integers assigned on first insertion and
/// never reused. Titles and token strings are unique.
pub trait Store {
    /// Id of the document with this title, if present.
    fn document_id(&self, title: &str) -> Result<Option<DocId>>;

    fn document_title(&self, id: DocId) -> Result<Option<String>>;

    /// Insert a document, or update its body when the title already exists.
    /// Returns the (stable) document id.
    fn add_document(&mut self, title: &str, body: &str) -> Result<DocId>;

    /// Resolve a token string to `(token_id, docs_count)`. With `insert`
    /// set, an absent token is created with an empty posting record.
    fn token_id(&mut self, token: &str, insert: bool) -> Result<Option<(TokenId, u32)>>;

    fn token(&self, id: TokenId) -> Result<Option<String>>;

    /// The persisted `(docs_count, encoded_postings)` record of a token.
    fn postings(&self, id: TokenId) -> Result<Option<(u32, Vec<u8>)>>;

    fn update_postings(&mut self, id: TokenId, docs_count: u32, encoded: &[u8]) -> Result<()>;

    fn setting(&self, key: &str) -> Result<Option<String>>;

    fn put_setting(&mut self, key: &str, value: &str) -> Result<()>;

    fn document_count(&self) -> Result<u32>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Retry interval for transient [`ErrorKind::Busy`] failures.
const BUSY_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Run `op` until it returns anything other than a transient busy signal.
pub fn retry_busy<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    loop {
        match op() {
            Err(e) if e.kind == ErrorKind::Busy => thread::sleep(BUSY_RETRY_INTERVAL),
            other => return other,
        }
    }
}
