use crate::core::types::DocId;

/// Occurrences of one token within one document. Positions are 0-based
/// code-point offsets of the token's first character in the body, strictly
/// increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub document_id: DocId,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(document_id: DocId, position: u32) -> Self {
        Posting {
            document_id,
            positions: vec![position],
        }
    }

    pub fn positions_count(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Postings for one token across all documents, strictly ascending by
/// document id. No two entries share a document id.
pub type PostingList = Vec<Posting>;

/// Merge two posting lists into one ordered list.
///
/// Preconditions: both inputs are ascending by document id and their
/// document-id sets are disjoint. Both are consumed; the postings
/// themselves are spliced, not copied.
pub fn merge_postings(a: PostingList, b: PostingList) -> PostingList {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.document_id <= y.document_id,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_a {
            merged.extend(a.next());
        } else {
            merged.extend(b.next());
        }
    }
    merged
}

/// True when the list satisfies the ordering invariants: document ids
/// strictly ascending across postings, positions strictly ascending within
/// each posting.
pub fn is_well_formed(list: &PostingList) -> bool {
    list.windows(2).all(|w| w[0].document_id < w[1].document_id)
        && list
            .iter()
            .all(|p| p.positions.windows(2).all(|w| w[0] < w[1]))
}
