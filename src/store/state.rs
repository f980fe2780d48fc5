use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::types::{DocId, TokenId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub docs_count: u32,
    pub postings: Vec<u8>,
}

/// The complete logical content of a database: the three relations of the
/// schema (documents, tokens, settings). Record position encodes identity —
/// id N lives at index N-1 — so ids stay dense and are never reused.
///
/// The title and token lookup maps are derived and rebuilt after
/// deserialization rather than persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub documents: Vec<DocumentRecord>,
    pub tokens: Vec<TokenRecord>,
    pub settings: BTreeMap<String, String>,
    #[serde(skip)]
    title_index: HashMap<String, DocId>,
    #[serde(skip)]
    token_index: HashMap<String, TokenId>,
}

impl State {
    pub fn rebuild_indexes(&mut self) {
        self.title_index = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.title.clone(), DocId::new(i as u32 + 1)))
            .collect();
        self.token_index = self
            .tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.token.clone(), TokenId::new(i as u32 + 1)))
            .collect();
    }

    pub fn document_id(&self, title: &str) -> Option<DocId> {
        self.title_index.get(title).copied()
    }

    pub fn document_title(&self, id: DocId) -> Option<String> {
        self.document(id).map(|d| d.title.clone())
    }

    pub fn add_document(&mut self, title: &str, body: &str) -> DocId {
        if let Some(id) = self.document_id(title) {
            self.documents[id.value() as usize - 1].body = body.to_string();
            id
        } else {
            self.documents.push(DocumentRecord {
                title: title.to_string(),
                body: body.to_string(),
            });
            let id = DocId::new(self.documents.len() as u32);
            self.title_index.insert(title.to_string(), id);
            id
        }
    }

    pub fn token_id(&mut self, token: &str, insert: bool) -> Option<(TokenId, u32)> {
        if let Some(&id) = self.token_index.get(token) {
            let docs_count = self.tokens[id.value() as usize - 1].docs_count;
            Some((id, docs_count))
        } else if insert {
            self.tokens.push(TokenRecord {
                token: token.to_string(),
                docs_count: 0,
                postings: Vec::new(),
            });
            let id = TokenId::new(self.tokens.len() as u32);
            self.token_index.insert(token.to_string(), id);
            Some((id, 0))
        } else {
            None
        }
    }

    pub fn token(&self, id: TokenId) -> Option<String> {
        self.token_record(id).map(|t| t.token.clone())
    }

    pub fn postings(&self, id: TokenId) -> Option<(u32, Vec<u8>)> {
        self.token_record(id)
            .map(|t| (t.docs_count, t.postings.clone()))
    }

    pub fn update_postings(&mut self, id: TokenId, docs_count: u32, encoded: &[u8]) -> bool {
        let Some(index) = Self::slot(id.value(), self.tokens.len()) else {
            return false;
        };
        let record = &mut self.tokens[index];
        record.docs_count = docs_count;
        record.postings = encoded.to_vec();
        true
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }

    pub fn put_setting(&mut self, key: &str, value: &str) {
        self.settings.insert(key.to_string(), value.to_string());
    }

    pub fn document_count(&self) -> u32 {
        self.documents.len() as u32
    }

    fn document(&self, id: DocId) -> Option<&DocumentRecord> {
        Self::slot(id.value(), self.documents.len()).map(|i| &self.documents[i])
    }

    fn token_record(&self, id: TokenId) -> Option<&TokenRecord> {
        Self::slot(id.value(), self.tokens.len()).map(|i| &self.tokens[i])
    }

    fn slot(id: u32, len: usize) -> Option<usize> {
        if id == 0 || id as usize > len {
            None
        } else {
            Some(id as usize - 1)
        }
    }
}
