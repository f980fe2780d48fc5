use std::collections::HashMap;

use crate::analysis::tokenizer::{NgramTokenizer, TokenMode};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, TokenId};
use crate::index::posting::{merge_postings, Posting, PostingList};
use crate::store::Store;
use crate::text::codec::codepoints_to_utf8;

/// Buffered postings for one token.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub token_id: TokenId,
    /// Number of documents carrying the token. For a query token this is
    /// the document frequency read from the store.
    pub docs_count: u32,
    /// Total occurrences across all buffered postings.
    pub positions_count: u32,
    pub postings: PostingList,
}

/// The in-memory inverted index: the flush buffer during ingestion, and the
/// per-query token table during search.
///
/// Buffered posting lists are kept ascending by document id. Document ids
/// grow monotonically within a session, so a new document always appends —
/// which keeps the flush-time merge a plain two-cursor walk.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: HashMap<TokenId, IndexEntry>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        InMemoryIndex {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, token_id: TokenId) -> Option<&IndexEntry> {
        self.entries.get(&token_id)
    }

    /// Record one token occurrence.
    ///
    /// If the entry's newest posting is for `document_id` the position is
    /// pushed onto it; otherwise a fresh posting is appended. A first
    /// sighting initializes docs_count to 1 for a real document, or to the
    /// store's prior count (`prior_docs_count`) for a query token.
    pub fn add(
        &mut self,
        token_id: TokenId,
        prior_docs_count: u32,
        document_id: DocId,
        position: u32,
    ) {
        let indexing = !document_id.is_none();
        let entry = self.entries.entry(token_id).or_insert_with(|| IndexEntry {
            token_id,
            docs_count: if indexing { 0 } else { prior_docs_count },
            positions_count: 0,
            postings: Vec::new(),
        });
        match entry.postings.last_mut() {
            Some(last) if last.document_id == document_id => last.positions.push(position),
            _ => {
                entry.postings.push(Posting::new(document_id, position));
                if indexing {
                    entry.docs_count += 1;
                }
            }
        }
        entry.positions_count += 1;
    }

    /// Fold `addition` into `self`, merging posting lists token by token and
    /// moving unknown entries wholesale. `addition` is consumed.
    pub fn merge(&mut self, addition: InMemoryIndex) {
        for (token_id, entry) in addition.entries {
            match self.entries.entry(token_id) {
                std::collections::hash_map::Entry::Occupied(mut base) => {
                    let base = base.get_mut();
                    let postings = std::mem::take(&mut base.postings);
                    base.postings = merge_postings(postings, entry.postings);
                    base.docs_count += entry.docs_count;
                    base.positions_count += entry.positions_count;
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }
    }

    /// Drain the buffer into entries sorted ascending by token id, giving
    /// the flush a deterministic order.
    pub fn into_sorted_entries(self) -> Vec<IndexEntry> {
        let mut entries: Vec<IndexEntry> = self.entries.into_values().collect();
        entries.sort_by_key(|e| e.token_id);
        entries
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }
}

/// Build a one-document (or one-query) inverted index from `text`.
///
/// With `TokenMode::Index` each distinct N-gram is resolved (inserting on
/// first encounter) and `document_id` names the real document. With
/// `TokenMode::Query` the pseudo document id 0 is used, tokens are looked
/// up without inserting, and absent ones land under the sentinel token
/// id 0 — the search layer treats any such entry as "no possible match".
pub fn index_text<S: Store>(
    store: &mut S,
    document_id: DocId,
    text: &[u32],
    token_len: usize,
    mode: TokenMode,
) -> Result<InMemoryIndex> {
    debug_assert_eq!(mode == TokenMode::Index, !document_id.is_none());
    let tokenizer = NgramTokenizer::new(token_len);
    let mut index = InMemoryIndex::new();
    for token in tokenizer.tokens(text, mode) {
        let token_text = codepoints_to_utf8(token.codepoints)?;
        let insert = mode == TokenMode::Index;
        let (token_id, prior_docs_count) = match store.token_id(&token_text, insert)? {
            Some(found) => found,
            None if insert => {
                return Err(Error::new(
                    ErrorKind::StoreLogic,
                    format!("store did not create token {token_text:?}"),
                ));
            }
            None => (TokenId::NONE, 0),
        };
        index.add(token_id, prior_docs_count, document_id, token.position);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;
    use crate::text::codec::utf8_to_codepoints;

    #[test]
    fn repeated_token_extends_newest_posting() {
        let mut index = InMemoryIndex::new();
        index.add(TokenId(1), 0, DocId(1), 0);
        index.add(TokenId(1), 0, DocId(1), 3);
        let entry = index.get(TokenId(1)).unwrap();
        assert_eq!(entry.docs_count, 1);
        assert_eq!(entry.positions_count, 2);
        assert_eq!(entry.postings.len(), 1);
        assert_eq!(entry.postings[0].positions, vec![0, 3]);
    }

    #[test]
    fn new_document_appends_posting() {
        let mut index = InMemoryIndex::new();
        index.add(TokenId(1), 0, DocId(1), 0);
        index.add(TokenId(1), 0, DocId(2), 5);
        let entry = index.get(TokenId(1)).unwrap();
        assert_eq!(entry.docs_count, 2);
        assert_eq!(entry.postings.len(), 2);
        assert_eq!(entry.postings[1].document_id, DocId(2));
    }

    #[test]
    fn query_entry_keeps_prior_docs_count() {
        let mut index = InMemoryIndex::new();
        index.add(TokenId(7), 12, DocId::NONE, 0);
        index.add(TokenId(7), 12, DocId::NONE, 4);
        let entry = index.get(TokenId(7)).unwrap();
        assert_eq!(entry.docs_count, 12);
        assert_eq!(entry.postings[0].positions, vec![0, 4]);
    }

    #[test]
    fn merge_combines_lists_and_counts() {
        let mut base = InMemoryIndex::new();
        base.add(TokenId(1), 0, DocId(1), 0);
        base.add(TokenId(2), 0, DocId(1), 1);

        let mut addition = InMemoryIndex::new();
        addition.add(TokenId(1), 0, DocId(2), 4);
        addition.add(TokenId(3), 0, DocId(2), 5);

        base.merge(addition);
        assert_eq!(base.len(), 3);
        let entry = base.get(TokenId(1)).unwrap();
        assert_eq!(entry.docs_count, 2);
        assert_eq!(entry.postings.len(), 2);
        assert!(crate::index::posting::is_well_formed(&entry.postings));
    }

    #[test]
    fn index_text_resolves_and_positions_tokens() {
        let mut store = MemStore::new();
        let body = utf8_to_codepoints("abab");
        let index = index_text(&mut store, DocId(1), &body, 2, TokenMode::Index).unwrap();

        // "ab" at 0 and 2, "ba" at 1, trailing "b" at 3
        assert_eq!(index.len(), 3);
        let (ab, _) = store.token_id("ab", false).unwrap().unwrap();
        let entry = index.get(ab).unwrap();
        assert_eq!(entry.postings[0].positions, vec![0, 2]);
        assert_eq!(entry.docs_count, 1);
    }

    #[test]
    fn query_text_collapses_absent_tokens_under_sentinel() {
        let mut store = MemStore::new();
        let query = utf8_to_codepoints("xy");
        let index = index_text(&mut store, DocId::NONE, &query, 2, TokenMode::Query).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get(TokenId::NONE).is_some());
        // lookup without insert must not have created anything
        assert!(store.token_id("xy", false).unwrap().is_none());
    }

    #[test]
    fn sorted_entries_are_deterministic() {
        let mut index = InMemoryIndex::new();
        index.add(TokenId(9), 0, DocId(1), 0);
        index.add(TokenId(2), 0, DocId(1), 1);
        index.add(TokenId(5), 0, DocId(1), 2);
        let ids: Vec<u32> = index
            .into_sorted_entries()
            .iter()
            .map(|e| e.token_id.value())
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
