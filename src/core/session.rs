use std::path::Path;
use std::time::Instant;

use crate::analysis::tokenizer::TokenMode;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::codec::{CompressMethod, COMPRESS_METHOD_KEY};
use crate::index::memory::{index_text, InMemoryIndex};
use crate::index::writer::IndexWriter;
use crate::search::cache::QueryCache;
use crate::search::engine;
use crate::search::results::SearchResults;
use crate::store::snapshot::SnapshotStore;
use crate::store::{retry_busy, Store};
use crate::text::codec::utf8_to_codepoints;

/// An open database plus everything scoped to its lifetime: the resolved
/// codec, the in-memory index buffer, and the query cache. The buffer moves
/// Empty → Accumulating → Flushing → Empty; a failed flush is fatal to the
/// enclosing transaction.
pub struct Session<S: Store> {
    store: S,
    config: Config,
    writer: IndexWriter,
    buffer: InMemoryIndex,
    buffer_count: u32,
    indexed_count: u32,
    cache: QueryCache,
}

impl Session<SnapshotStore> {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let store = SnapshotStore::open(path.as_ref())?;
        Self::with_store(store, config)
    }
}

impl<S: Store> Session<S> {
    /// Wrap an already-open store.
    ///
    /// The stored `compress_method` setting wins over `config.compress`;
    /// a database without the setting gets the configured choice persisted.
    pub fn with_store(mut store: S, config: Config) -> Result<Self> {
        let method = match store.setting(COMPRESS_METHOD_KEY)? {
            Some(stored) => parse_method(&stored),
            None => {
                let method = config.compress;
                retry_busy(|| store.put_setting(COMPRESS_METHOD_KEY, method.as_str()))?;
                method
            }
        };
        Ok(Session {
            store,
            config,
            writer: IndexWriter::new(method),
            buffer: InMemoryIndex::new(),
            buffer_count: 0,
            indexed_count: 0,
            cache: QueryCache::default(),
        })
    }

    pub fn method(&self) -> CompressMethod {
        self.writer.method()
    }

    /// Open the single transaction an ingestion session runs in.
    pub fn begin(&mut self) -> Result<()> {
        self.store.begin()
    }

    /// Store one document and fold its N-grams into the buffer. Flushes
    /// when the buffer holds more documents than the configured threshold.
    pub fn add_document(&mut self, title: &str, body: &str) -> Result<()> {
        if self.store.document_id(title)?.is_some() {
            // re-ingesting a title would inflate its tokens' position counts
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("document {title:?} is already indexed"),
            ));
        }
        let document_id = retry_busy(|| self.store.add_document(title, body))?;
        let body32 = utf8_to_codepoints(body);
        let additions = index_text(
            &mut self.store,
            document_id,
            &body32,
            self.config.token_len,
            TokenMode::Index,
        )?;
        self.buffer.merge(additions);
        self.buffer_count += 1;
        self.indexed_count += 1;
        self.cache.clear();
        if self.buffer_count > self.config.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Merge the buffer into the persisted index and empty it.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let started = Instant::now();
            let buffer = std::mem::take(&mut self.buffer);
            let flushed = self.writer.flush(&mut self.store, buffer)?;
            eprintln!(
                "index flushed: {} tokens in {:.3}s",
                flushed,
                started.elapsed().as_secs_f64()
            );
        }
        self.buffer_count = 0;
        Ok(())
    }

    /// Final flush plus commit; ends the ingestion transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.flush()?;
        self.store.commit()
    }

    /// Discard buffered work and roll the store back.
    pub fn rollback(&mut self) -> Result<()> {
        self.buffer = InMemoryIndex::new();
        self.buffer_count = 0;
        self.cache.clear();
        self.store.rollback()
    }

    /// Run a query, ranked by TF-IDF. The codec is re-read from the store
    /// settings so a session always decodes with what the writer used.
    pub fn search(&mut self, query: &str) -> Result<SearchResults> {
        if let Some(hits) = self.cache.get(query) {
            return Ok(SearchResults { hits });
        }
        let method = match self.store.setting(COMPRESS_METHOD_KEY)? {
            Some(stored) => parse_method(&stored),
            None => self.writer.method(),
        };
        let results = engine::execute(
            &mut self.store,
            method,
            self.config.token_len,
            self.config.phrase_search,
            query,
        )?;
        self.cache.put(query, results.hits.clone());
        Ok(results)
    }

    pub fn document_title(&self, id: DocId) -> Result<Option<String>> {
        self.store.document_title(id)
    }

    pub fn document_count(&self) -> Result<u32> {
        self.store.document_count()
    }

    /// Documents ingested by this session.
    pub fn indexed_count(&self) -> u32 {
        self.indexed_count
    }

    /// Documents accumulated since the last flush.
    pub fn buffered_documents(&self) -> u32 {
        self.buffer_count
    }
}

fn parse_method(stored: &str) -> CompressMethod {
    CompressMethod::parse(stored).unwrap_or_else(|| {
        eprintln!("unknown compress method {stored:?} in settings, using golomb");
        CompressMethod::Golomb
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;
    use tempfile::tempdir;

    fn mem_session(flush_threshold: u32) -> Session<MemStore> {
        let config = Config {
            flush_threshold,
            ..Config::default()
        };
        Session::with_store(MemStore::new(), config).unwrap()
    }

    #[test]
    fn duplicate_title_is_rejected() {
        let mut session = mem_session(2048);
        session.begin().unwrap();
        session.add_document("t", "body").unwrap();
        let err = session.add_document("t", "other").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn threshold_triggers_intermediate_flush() {
        let mut session = mem_session(2);
        session.begin().unwrap();
        session.add_document("a", "zza").unwrap();
        session.add_document("b", "zzb").unwrap();
        assert_eq!(session.buffered_documents(), 2);
        // the third document crosses the threshold
        session.add_document("c", "zzc").unwrap();
        assert_eq!(session.buffered_documents(), 0);
        session.add_document("d", "zzd").unwrap();
        session.commit().unwrap();
        assert_eq!(session.buffered_documents(), 0);

        // every body contains "zz" exactly once
        let results = session.search("zz").unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn docs_count_survives_many_flushes() {
        let mut session = mem_session(100);
        session.begin().unwrap();
        for i in 0..300 {
            session.add_document(&format!("doc{i}"), &format!("ax{i:03}")).unwrap();
        }
        session.commit().unwrap();
        // "ax" occurs in all 300 documents across three flushes
        let results = session.search("ax").unwrap();
        assert_eq!(results.len(), 300);
    }

    #[test]
    fn rollback_discards_buffer_and_store_changes() {
        let mut session = mem_session(2048);
        session.begin().unwrap();
        session.add_document("a", "abc").unwrap();
        session.rollback().unwrap();
        assert_eq!(session.document_count().unwrap(), 0);
        assert_eq!(session.buffered_documents(), 0);
    }

    #[test]
    fn search_results_come_from_cache_on_repeat() {
        let mut session = mem_session(2048);
        session.begin().unwrap();
        session.add_document("a", "hello").unwrap();
        session.commit().unwrap();
        let first = session.search("he").unwrap();
        let second = session.search("he").unwrap();
        assert_eq!(first.hits, second.hits);
        assert_eq!(session.cache.hit_count(), 1);
    }

    #[test]
    fn configured_method_is_persisted_and_then_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.db");
        {
            let config = Config {
                compress: CompressMethod::None,
                ..Config::default()
            };
            let mut session = Session::open(&path, config).unwrap();
            session.begin().unwrap();
            session.add_document("a", "abcabc").unwrap();
            session.commit().unwrap();
        }
        // reopening with a different configured codec follows the stored one
        let mut session = Session::open(&path, Config::default()).unwrap();
        assert_eq!(session.method(), CompressMethod::None);
        let results = session.search("bc").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].document_id, DocId(1));
    }

    #[test]
    fn full_roundtrip_through_the_snapshot_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.db");
        {
            let mut session = Session::open(&path, Config::default()).unwrap();
            session.begin().unwrap();
            session.add_document("intro", "full text search").unwrap();
            session.add_document("other", "nothing to see").unwrap();
            session.commit().unwrap();
        }
        let mut session = Session::open(&path, Config::default()).unwrap();
        let results = session.search("text search").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            session.document_title(results.hits[0].document_id).unwrap().unwrap(),
            "intro"
        );
    }
}
