use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Deserialize)]
struct CorpusRecord {
    title: String,
    body: String,
}

/// Stream a line-delimited JSON corpus of `{"title": ..., "body": ...}`
/// records, invoking `f(title, body)` for each, up to `max_docs` records.
/// Blank lines are skipped. Returns the number of records delivered.
pub fn load_corpus<F>(path: &Path, max_docs: Option<u32>, mut f: F) -> Result<u32>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut delivered = 0u32;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if max_docs.is_some_and(|max| delivered >= max) {
            break;
        }
        let record: CorpusRecord = serde_json::from_str(&line).map_err(|e| {
            Error::new(
                ErrorKind::Parse,
                format!("{}:{}: {e}", path.display(), line_number + 1),
            )
        })?;
        f(&record.title, &record.body)?;
        delivered += 1;
    }
    Ok(delivered)
}
