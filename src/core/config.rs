use crate::index::codec::CompressMethod;

/// Tunables for an indexing or query session.
#[derive(Debug, Clone)]
pub struct Config {
    /// N in N-gram; tokens are windows of this many code points.
    pub token_len: usize,
    /// Posting-list encoding. On an existing database the stored
    /// `compress_method` setting wins over this value.
    pub compress: CompressMethod,
    /// Flush the in-memory buffer once it holds more documents than this.
    pub flush_threshold: u32,
    /// Verify positional adjacency of query tokens before scoring.
    pub phrase_search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token_len: 2,          // bi-gram
            compress: CompressMethod::Golomb,
            flush_threshold: 2048,
            phrase_search: true,
        }
    }
}
