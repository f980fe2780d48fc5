//! A miniature full-text search engine: documents are split into
//! overlapping N-grams of Unicode code points, indexed with positions into
//! a single database file, and served back through conjunctive and phrase
//! queries ranked by TF-IDF.
//!
//! ```no_run
//! use minisearch::{Config, Session};
//!
//! # fn main() -> minisearch::Result<()> {
//! let mut session = Session::open("corpus.db", Config::default())?;
//! session.begin()?;
//! session.add_document("greeting", "hello world")?;
//! session.commit()?;
//!
//! for hit in &session.search("hello")?.hits {
//!     println!("{} {:.3}", hit.document_id.value(), hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod core;
pub mod corpus;
pub mod index;
pub mod search;
pub mod store;
pub mod text;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::session::Session;
pub use crate::core::types::{DocId, TokenId};
pub use crate::index::codec::CompressMethod;
pub use crate::search::results::{SearchHit, SearchResults};
