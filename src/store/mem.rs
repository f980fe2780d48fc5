use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, TokenId};
use crate::store::state::State;
use crate::store::Store;

/// Volatile store backed by plain maps. The transaction undo image is a
/// clone of the state taken at `begin`.
#[derive(Debug, Default)]
pub struct MemStore {
    state: State,
    undo: Option<State>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            state: State::default(),
            undo: None,
        }
    }
}

impl Store for MemStore {
    fn document_id(&self, title: &str) -> Result<Option<DocId>> {
        Ok(self.state.document_id(title))
    }

    fn document_title(&self, id: DocId) -> Result<Option<String>> {
        Ok(self.state.document_title(id))
    }

    fn add_document(&mut self, title: &str, body: &str) -> Result<DocId> {
        Ok(self.state.add_document(title, body))
    }

    fn token_id(&mut self, token: &str, insert: bool) -> Result<Option<(TokenId, u32)>> {
        Ok(self.state.token_id(token, insert))
    }

    fn token(&self, id: TokenId) -> Result<Option<String>> {
        Ok(self.state.token(id))
    }

    fn postings(&self, id: TokenId) -> Result<Option<(u32, Vec<u8>)>> {
        Ok(self.state.postings(id))
    }

    fn update_postings(&mut self, id: TokenId, docs_count: u32, encoded: &[u8]) -> Result<()> {
        if self.state.update_postings(id, docs_count, encoded) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::StoreLogic,
                format!("no token with id {}", id.value()),
            ))
        }
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.setting(key))
    }

    fn put_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.state.put_setting(key, value);
        Ok(())
    }

    fn document_count(&self) -> Result<u32> {
        Ok(self.state.document_count())
    }

    fn begin(&mut self) -> Result<()> {
        if self.undo.is_some() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "transaction already open".to_string(),
            ));
        }
        self.undo = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.undo.take().is_none() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "no open transaction".to_string(),
            ));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        match self.undo.take() {
            Some(undo) => {
                self.state = undo;
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::InvalidState,
                "no open transaction".to_string(),
            )),
        }
    }
}
