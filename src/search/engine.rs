use std::collections::HashMap;

use crate::analysis::tokenizer::TokenMode;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::codec::CompressMethod;
use crate::index::memory::{index_text, InMemoryIndex};
use crate::index::posting::{Posting, PostingList};
use crate::index::writer::fetch_postings;
use crate::search::results::{SearchHit, SearchResults};
use crate::store::Store;
use crate::text::codec::utf8_to_codepoints;

/// Run a query end to end: tokenize, fetch posting lists, intersect,
/// optionally verify phrase adjacency, score with TF-IDF, rank.
pub fn execute<S: Store>(
    store: &mut S,
    method: CompressMethod,
    token_len: usize,
    phrase_search: bool,
    query: &str,
) -> Result<SearchResults> {
    let query32 = utf8_to_codepoints(query);
    if query32.len() < token_len {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "too short query".to_string(),
        ));
    }
    let tokens = index_text(store, DocId::NONE, &query32, token_len, TokenMode::Query)?;
    let indexed_count = store.document_count()?;
    let hits = search_docs(store, method, tokens, indexed_count, phrase_search)?;
    Ok(SearchResults::new(hits))
}

/// Cursor over one query token's fetched posting list.
struct DocCursor {
    postings: PostingList,
    index: usize,
    /// Document frequency from the store, for IDF.
    docs_count: u32,
    /// Offsets of the token within the query string.
    offsets: Vec<u32>,
}

impl DocCursor {
    fn current(&self) -> Option<&Posting> {
        self.postings.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

fn search_docs<S: Store>(
    store: &S,
    method: CompressMethod,
    tokens: InMemoryIndex,
    indexed_count: u32,
    phrase_search: bool,
) -> Result<Vec<SearchHit>> {
    // ascending document frequency, so the rarest token drives the walk;
    // ties fall back to token-id order for determinism
    let mut entries = tokens.into_sorted_entries();
    entries.sort_by_key(|e| e.docs_count);
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let mut cursors = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.token_id.is_none() {
            // some query token never appeared in any indexed document
            return Ok(Vec::new());
        }
        let (_, postings) = fetch_postings(store, method, entry.token_id)?;
        if postings.is_empty() {
            return Ok(Vec::new());
        }
        let offsets = entry
            .postings
            .first()
            .map(|p| p.positions.clone())
            .unwrap_or_default();
        cursors.push(DocCursor {
            postings,
            index: 0,
            docs_count: entry.docs_count,
            offsets,
        });
    }

    let mut scores: HashMap<DocId, f64> = HashMap::new();
    'walk: while let Some(doc_id) = cursors[0].current().map(|p| p.document_id) {
        let mut next_doc_id = None;
        for cursor in cursors.iter_mut().skip(1) {
            while cursor.current().is_some_and(|p| p.document_id < doc_id) {
                cursor.advance();
            }
            let Some(posting) = cursor.current() else {
                break 'walk;
            };
            if posting.document_id > doc_id {
                next_doc_id = Some(posting.document_id);
                break;
            }
        }
        if let Some(next) = next_doc_id {
            // resume the driver at the smallest document id >= next
            while cursors[0].current().is_some_and(|p| p.document_id < next) {
                cursors[0].advance();
            }
        } else {
            let phrase_count = if phrase_search { count_phrases(&cursors) } else { 1 };
            if phrase_count > 0 {
                *scores.entry(doc_id).or_default() += tf_idf(&cursors, doc_id, indexed_count);
            }
            cursors[0].advance();
        }
    }

    Ok(scores
        .into_iter()
        .map(|(document_id, score)| SearchHit { document_id, score })
        .collect())
}

/// `score(d) = Σ positions_count_in_d × log2(indexed_count / docs_count)`.
/// Every cursor must sit on `doc_id` when this runs; a misaligned cursor
/// contributes nothing and trips the debug assertion.
fn tf_idf(cursors: &[DocCursor], doc_id: DocId, indexed_count: u32) -> f64 {
    let mut score = 0.0;
    for cursor in cursors {
        let posting = cursor.current().filter(|p| p.document_id == doc_id);
        debug_assert!(posting.is_some(), "cursor misaligned at scoring time");
        if let Some(posting) = posting {
            let idf = (f64::from(indexed_count) / f64::from(cursor.docs_count)).log2();
            score += f64::from(posting.positions_count()) * idf;
        }
    }
    score
}

/// Position cursor for one (token, query-offset) pair within the candidate
/// document. `rel` is the document-relative offset: a phrase occurs when
/// every cursor reaches the same `rel`.
struct PhraseCursor<'a> {
    positions: &'a [u32],
    base: i64,
    index: usize,
}

impl PhraseCursor<'_> {
    fn rel(&self) -> Option<i64> {
        self.positions.get(self.index).map(|&p| i64::from(p) - self.base)
    }

    fn advance_past(&mut self, rel: i64) {
        while self.rel().is_some_and(|r| r < rel) {
            self.index += 1;
        }
    }
}

/// Count occurrences of the whole query as a contiguous token run in the
/// document every cursor currently points at.
fn count_phrases(cursors: &[DocCursor]) -> u32 {
    let mut phrase_cursors = Vec::new();
    for cursor in cursors {
        let Some(posting) = cursor.current() else {
            return 0;
        };
        for &offset in &cursor.offsets {
            phrase_cursors.push(PhraseCursor {
                positions: &posting.positions,
                base: i64::from(offset),
                index: 0,
            });
        }
    }
    let Some((first, rest)) = phrase_cursors.split_first_mut() else {
        return 0;
    };

    let mut count = 0;
    while let Some(rel) = first.rel() {
        let mut next_rel = rel;
        let mut matched = true;
        for cursor in rest.iter_mut() {
            cursor.advance_past(rel);
            let Some(r) = cursor.rel() else {
                return count;
            };
            if r != rel {
                next_rel = r;
                matched = false;
                break;
            }
        }
        if matched {
            count += 1;
            first.index += 1;
        } else {
            first.advance_past(next_rel);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::IndexWriter;
    use crate::store::mem::MemStore;

    const METHOD: CompressMethod = CompressMethod::Golomb;

    fn ingest(store: &mut MemStore, title: &str, body: &str) {
        let id = store.add_document(title, body).unwrap();
        let body32 = utf8_to_codepoints(body);
        let buffer = index_text(store, id, &body32, 2, TokenMode::Index).unwrap();
        IndexWriter::new(METHOD).flush(store, buffer).unwrap();
    }

    fn search(store: &mut MemStore, query: &str, phrase: bool) -> SearchResults {
        execute(store, METHOD, 2, phrase, query).unwrap()
    }

    #[test]
    fn single_document_match_with_zero_idf() {
        let mut store = MemStore::new();
        ingest(&mut store, "a", "abcabc");
        let results = search(&mut store, "bc", true);
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].document_id, DocId(1));
        // one document, df 1: idf is log2(1) = 0, but the hit still returns
        assert_eq!(results.hits[0].score, 0.0);
    }

    #[test]
    fn equal_scores_rank_by_document_id() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "hello");
        ingest(&mut store, "d2", "help");
        let results = search(&mut store, "he", true);
        assert_eq!(results.len(), 2);
        assert_eq!(results.hits[0].document_id, DocId(1));
        assert_eq!(results.hits[1].document_id, DocId(2));
        assert_eq!(results.hits[0].score, results.hits[1].score);
    }

    #[test]
    fn phrase_spanning_overlapping_ngrams() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "ababab");
        assert_eq!(search(&mut store, "bab", true).len(), 1);
        assert_eq!(search(&mut store, "bab", false).len(), 1);
    }

    #[test]
    fn absent_token_empties_the_result() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "foo");
        ingest(&mut store, "d2", "bar");
        // "ba" exists, "az" was never indexed
        assert!(search(&mut store, "baz", true).is_empty());
    }

    #[test]
    fn phrase_check_rejects_scattered_tokens() {
        let mut store = MemStore::new();
        // contains "ab" and "ba" but never the contiguous "bab"
        ingest(&mut store, "d1", "abba");
        assert!(search(&mut store, "bab", true).is_empty());
        assert_eq!(search(&mut store, "bab", false).len(), 1);
    }

    #[test]
    fn conjunctive_intersection_requires_every_token() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "wiki");
        ingest(&mut store, "d2", "wine");
        ingest(&mut store, "d3", "wikiwine");
        let results = search(&mut store, "wiki", false);
        let ids: Vec<u32> = results.hits.iter().map(|h| h.document_id.value()).collect();
        assert!(ids.contains(&1) && ids.contains(&3) && !ids.contains(&2));
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let mut store = MemStore::new();
        ingest(&mut store, "rich", "zqzqzq");
        ingest(&mut store, "poor", "zq");
        // a third document without the term keeps the idf positive
        ingest(&mut store, "other", "xy");
        let results = search(&mut store, "zq", true);
        assert_eq!(results.len(), 2);
        assert_eq!(results.hits[0].document_id, DocId(1));
        assert!(results.hits[0].score > results.hits[1].score);
    }

    #[test]
    fn rarer_tokens_outweigh_common_ones() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "qx");
        ingest(&mut store, "d2", "qx ab");
        ingest(&mut store, "d3", "ab");
        ingest(&mut store, "d4", "ab");
        let common = search(&mut store, "ab", false);
        let rare = search(&mut store, "qx", false);
        // df("qx") = 2 < df("ab") = 3, so its idf is larger
        assert!(rare.hits[0].score > common.hits[0].score);
    }

    #[test]
    fn too_short_query_is_invalid_input() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "abc");
        let err = execute(&mut store, METHOD, 2, true, "a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn query_of_separators_matches_nothing() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "abc");
        assert!(search(&mut store, "..", true).is_empty());
    }

    #[test]
    fn repeated_query_token_still_matches_phrase() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "aaaa");
        ingest(&mut store, "d2", "aab");
        // "aaa" needs "aa" at two adjacent offsets; only d1 has that
        let results = search(&mut store, "aaa", true);
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].document_id, DocId(1));
    }

    #[test]
    fn multibyte_phrase_search() {
        let mut store = MemStore::new();
        ingest(&mut store, "d1", "全文検索エンジン");
        ingest(&mut store, "d2", "検索だけ");
        let results = search(&mut store, "検索エンジン", true);
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].document_id, DocId(1));
    }
}
