use crate::analysis::token::Token;

/// Code points that never become part of a token: ASCII whitespace, ASCII
/// punctuation, and the common full-width CJK punctuation. Sorted for
/// binary search.
const SEPARATORS: &[u32] = &[
    0x09, 0x0A, 0x0B, 0x0C, 0x0D, // \t \n \v \f \r
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, // space ! " # $ % & '
    0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, // ( ) * + , - . /
    0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F, 0x40, // : ; < = > ? @
    0x5B, 0x5C, 0x5D, 0x5E, 0x5F, 0x60, // [ \ ] ^ _ `
    0x7B, 0x7C, 0x7D, 0x7E, // { | } ~
    0x3000, // ideographic space
    0x3001, // 、
    0x3002, // 。
    0xFF01, // ！
    0xFF08, // （
    0xFF09, // ）
    0xFF0C, // ，
    0xFF1A, // ：
    0xFF1B, // ；
    0xFF1F, // ？
];

pub fn is_separator(cp: u32) -> bool {
    SEPARATORS.binary_search(&cp).is_ok()
}

/// Whether tokens shorter than N survive extraction.
///
/// Indexing keeps them so that trailing suffixes of a document (and runs
/// shorter than N between separators) are findable. Query extraction drops
/// them: any occurrence of a short trailing token is already implied by the
/// full-width N-gram preceding it, so a cursor for it would be redundant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    Index,
    Query,
}

/// Sliding-window N-gram extractor.
#[derive(Debug, Clone, Copy)]
pub struct NgramTokenizer {
    pub n: usize,
}

impl NgramTokenizer {
    pub fn new(n: usize) -> Self {
        NgramTokenizer { n }
    }

    /// Extract overlapping N-grams with stride one. Each token carries the
    /// code-point offset of its first character in `text`.
    pub fn tokens<'a>(&self, text: &'a [u32], mode: TokenMode) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut cursor = 0;
        while cursor < text.len() {
            while cursor < text.len() && is_separator(text[cursor]) {
                cursor += 1;
            }
            if cursor == text.len() {
                break;
            }
            let mut end = cursor;
            while end < text.len() && end - cursor < self.n && !is_separator(text[end]) {
                end += 1;
            }
            if end - cursor == self.n || mode == TokenMode::Index {
                tokens.push(Token::new(&text[cursor..end], cursor as u32));
            }
            cursor += 1;
        }
        tokens
    }
}
