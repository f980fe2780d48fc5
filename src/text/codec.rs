use crate::core::error::{Error, ErrorKind, Result};

/// Decompose a string into Unicode code points.
///
/// Documents and query strings go through the same conversion so that
/// tokenization sees identical windows for both.
pub fn utf8_to_codepoints(text: &str) -> Vec<u32> {
    text.chars().map(|c| c as u32).collect()
}

/// Reassemble code points into a string. Values outside the Unicode scalar
/// range (above U+10FFFF, or in the surrogate gap) are rejected.
pub fn codepoints_to_utf8(codepoints: &[u32]) -> Result<String> {
    let mut out = String::with_capacity(codepoints.len());
    for &cp in codepoints {
        let ch = char::from_u32(cp).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("code point {cp:#x} is not a Unicode scalar value"),
            )
        })?;
        out.push(ch);
    }
    Ok(out)
}
