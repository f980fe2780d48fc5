use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TokenId;
use crate::index::codec::{decode_postings, encode_postings, CompressMethod};
use crate::index::memory::InMemoryIndex;
use crate::index::posting::{merge_postings, PostingList};
use crate::store::{retry_busy, Store};

/// Fetch and decode the persisted posting list of a token.
///
/// Returns the stored docs_count together with the decoded list; an absent
/// or empty record decodes to `(0, [])`. A decoded length that disagrees
/// with the stored docs_count is a [`ErrorKind::Decode`] failure.
pub fn fetch_postings<S: Store>(
    store: &S,
    method: CompressMethod,
    token_id: TokenId,
) -> Result<(u32, PostingList)> {
    match store.postings(token_id)? {
        Some((docs_count, bytes)) if !bytes.is_empty() => {
            let postings = decode_postings(method, &bytes)?;
            if postings.len() as u32 != docs_count {
                return Err(Error::new(
                    ErrorKind::Decode,
                    format!(
                        "postings decode mismatch for token {}: stored {} decoded {}",
                        token_id.value(),
                        docs_count,
                        postings.len()
                    ),
                ));
            }
            Ok((docs_count, postings))
        }
        _ => Ok((0, Vec::new())),
    }
}

/// Flushes the in-memory buffer into the store: for every buffered token the
/// persisted list is fetched, merged with the newer buffered postings,
/// re-encoded and written back.
pub struct IndexWriter {
    method: CompressMethod,
}

impl IndexWriter {
    pub fn new(method: CompressMethod) -> Self {
        IndexWriter { method }
    }

    pub fn method(&self) -> CompressMethod {
        self.method
    }

    /// Write every buffered entry through the store, consuming the buffer.
    /// Entries are processed in ascending token-id order so repeated runs
    /// touch the store identically.
    pub fn flush<S: Store>(&self, store: &mut S, buffer: InMemoryIndex) -> Result<usize> {
        let indexed_count = store.document_count()?;
        let entries = buffer.into_sorted_entries();
        let flushed = entries.len();
        for mut entry in entries {
            debug_assert!(!entry.token_id.is_none());
            let (stored_count, stored) = fetch_postings(store, self.method, entry.token_id)?;
            if !stored.is_empty() {
                // persisted postings are older, buffered ones newer; the
                // document-id sets are disjoint
                entry.postings = merge_postings(stored, entry.postings);
                entry.docs_count += stored_count;
            }
            let encoded = encode_postings(self.method, indexed_count, &entry.postings);
            retry_busy(|| store.update_postings(entry.token_id, entry.docs_count, &encoded))?;
        }
        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::store::mem::MemStore;

    fn buffer_with(entries: &[(TokenId, DocId, &[u32])]) -> InMemoryIndex {
        let mut buffer = InMemoryIndex::new();
        for &(token_id, document_id, positions) in entries {
            for &position in positions {
                buffer.add(token_id, 0, document_id, position);
            }
        }
        buffer
    }

    fn token_for(store: &mut MemStore, text: &str) -> TokenId {
        store.token_id(text, true).unwrap().unwrap().0
    }

    #[test]
    fn flush_persists_counts_and_lists() {
        let mut store = MemStore::new();
        store.add_document("a", "body").unwrap();
        store.add_document("b", "body").unwrap();
        let ab = token_for(&mut store, "ab");

        let writer = IndexWriter::new(CompressMethod::Golomb);
        let buffer = buffer_with(&[(ab, DocId(1), &[0, 2]), (ab, DocId(2), &[1])]);
        assert_eq!(writer.flush(&mut store, buffer).unwrap(), 1);

        let (docs_count, postings) = fetch_postings(&store, CompressMethod::Golomb, ab).unwrap();
        assert_eq!(docs_count, 2);
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].positions, vec![0, 2]);
        assert_eq!(postings[1].positions, vec![1]);
    }

    #[test]
    fn second_flush_merges_with_persisted_list() {
        let mut store = MemStore::new();
        for title in ["a", "b", "c"] {
            store.add_document(title, "body").unwrap();
        }
        let tok = token_for(&mut store, "xy");
        let writer = IndexWriter::new(CompressMethod::None);

        writer
            .flush(&mut store, buffer_with(&[(tok, DocId(1), &[4])]))
            .unwrap();
        writer
            .flush(
                &mut store,
                buffer_with(&[(tok, DocId(2), &[0]), (tok, DocId(3), &[7, 9])]),
            )
            .unwrap();

        let (docs_count, postings) = fetch_postings(&store, CompressMethod::None, tok).unwrap();
        assert_eq!(docs_count, 3);
        let ids: Vec<u32> = postings.iter().map(|p| p.document_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(crate::index::posting::is_well_formed(&postings));
    }

    #[test]
    fn corrupt_docs_count_is_a_decode_error() {
        let mut store = MemStore::new();
        store.add_document("a", "body").unwrap();
        let tok = token_for(&mut store, "zz");
        let encoded = encode_postings(
            CompressMethod::None,
            1,
            &vec![crate::index::posting::Posting::new(DocId(1), 0)],
        );
        // stored count disagrees with the encoded list
        store.update_postings(tok, 5, &encoded).unwrap();

        let err = fetch_postings(&store, CompressMethod::None, tok).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
