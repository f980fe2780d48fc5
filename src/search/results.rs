use crate::core::types::DocId;

/// One matched document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub document_id: DocId,
    pub score: f64,
}

/// Ranked query output, best hit first.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(mut hits: Vec<SearchHit>) -> Self {
        sort_hits(&mut hits);
        SearchResults { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Descending score; equal scores break ties by ascending document id so
/// the order is deterministic.
fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.document_id.cmp(&b.document_id))
    });
}
