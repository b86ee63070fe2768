// pattern.rs — Masked byte patterns used to locate widget singleton slots.
//
// Syntax: space-separated hex bytes, `??` (or `?`) for a wildcard byte.
//   "A1 ?? ?? ?? ?? 8B 00 E8"
// The scan over live module memory lives in memory.rs; this module only parses
// patterns and matches them against byte slices.

use crate::error::PatternError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    /// `None` is a wildcard.
    bytes: Vec<Option<u8>>,
}

impl BytePattern {
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let bytes = text
            .split_whitespace()
            .map(|tok| match tok {
                "?" | "??" => Ok(None),
                _ if tok.len() == 2 => u8::from_str_radix(tok, 16)
                    .map(Some)
                    .map_err(|_| PatternError::InvalidByte(tok.to_string())),
                _ => Err(PatternError::InvalidByte(tok.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if bytes.is_empty() { return Err(PatternError::Empty); }
        if bytes.iter().all(Option::is_none) { return Err(PatternError::OnlyWildcards); }
        Ok(Self { bytes })
    }

    /// Whether `window` starts with this pattern.
    pub fn matches_at(&self, window: &[u8]) -> bool {
        window.len() >= self.bytes.len()
            && self.bytes.iter().zip(window).all(|(p, b)| p.map_or(true, |p| p == *b))
    }

    /// Offset of the first match inside `haystack`.
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        if haystack.len() < self.bytes.len() { return None; }
        (0..=haystack.len() - self.bytes.len()).find(|&i| self.matches_at(&haystack[i..]))
    }
}
