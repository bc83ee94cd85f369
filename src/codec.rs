//! Compact text codec for encoded ACLs.
//!
//! The encoded form is a single line of characters scanned left to right by
//! [`EncodedAcl`]. Strings are either the null marker `N` or a length prefix
//! `0<digits><space>` followed by exactly that many characters. Output is
//! produced with an [`AclEncoder`], whose buffer is handed to the caller by
//! [`AclEncoder::finish`].

use crate::error::{AccessError, Result};

/// Marker for an absent (null) string.
pub(crate) const NULL_MARKER: char = 'N';

/// Forward-only, rewindable cursor over the characters of an encoded ACL.
///
/// Reading past the end yields `None` (the end-of-buffer sentinel) but still
/// advances the position, so a following [`EncodedAcl::back`] is always
/// symmetrical with the read it undoes.
#[derive(Debug, Clone)]
pub struct EncodedAcl {
    chars: Vec<char>,
    pos: usize,
}

impl EncodedAcl {
    pub fn new(text: &str) -> Self {
        EncodedAcl {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    /// Current position of the cursor.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of unread characters.
    pub fn remaining(&self) -> usize {
        self.chars.len().saturating_sub(self.pos)
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.chars.len()
    }

    /// Return the next character and advance, or `None` at end of buffer.
    pub fn get_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        self.pos += 1;
        c
    }

    /// Rewind the cursor by `count` positions.
    pub fn back(&mut self, count: usize) -> Result<()> {
        if count > self.pos {
            return Err(AccessError::Rewind {
                pos: self.pos,
                count,
            });
        }
        self.pos -= count;
        Ok(())
    }

    /// Read a run of digits terminated by a space.
    pub fn get_length(&mut self) -> Result<usize> {
        let start = self.pos;
        let mut len: usize = 0;
        let mut digits = 0;

        loop {
            match self.get_char() {
                Some(' ') => break,
                Some(c) => {
                    let digit = c.to_digit(10).ok_or_else(|| {
                        AccessError::Length(format!(
                            "expected digit, found '{c}' at position {}",
                            self.pos - 1
                        ))
                    })?;
                    len = len
                        .checked_mul(10)
                        .and_then(|l| l.checked_add(digit as usize))
                        .ok_or_else(|| {
                            AccessError::Length(format!("length overflow at position {start}"))
                        })?;
                    digits += 1;
                }
                None => {
                    return Err(AccessError::Length(format!(
                        "unterminated length starting at position {start}"
                    )));
                }
            }
        }

        if digits == 0 {
            return Err(AccessError::Length(format!(
                "empty length at position {start}"
            )));
        }

        Ok(len)
    }

    /// Read an encoded string; `None` for the null marker.
    pub fn get_string(&mut self) -> Result<Option<String>> {
        match self.string_len()? {
            None => Ok(None),
            Some(len) => {
                let s: String = self.chars[self.pos..self.pos + len].iter().collect();
                self.pos += len;
                Ok(Some(s))
            }
        }
    }

    /// Consume an encoded string without materializing it.
    pub fn skip_string(&mut self) -> Result<()> {
        if let Some(len) = self.string_len()? {
            self.pos += len;
        }
        Ok(())
    }

    /// Read the header of an encoded string and check the declared length
    /// against what is left in the buffer.
    fn string_len(&mut self) -> Result<Option<usize>> {
        match self.get_char() {
            Some(NULL_MARKER) => Ok(None),
            Some(_) => {
                self.back(1)?;
                let len = self.get_length()?;
                if len > self.remaining() {
                    return Err(AccessError::Length(format!(
                        "declared {len} characters but only {} remain",
                        self.remaining()
                    )));
                }
                Ok(Some(len))
            }
            None => Err(AccessError::Length(
                "expected string, found end of acl".to_string(),
            )),
        }
    }
}

/// Output buffer for an encoding pass.
///
/// Creating the encoder starts a fresh buffer; [`AclEncoder::finish`]
/// transfers it to the caller.
#[derive(Debug, Default)]
pub struct AclEncoder {
    buf: String,
}

impl AclEncoder {
    pub fn new() -> Self {
        AclEncoder::default()
    }

    pub fn add_char(&mut self, c: char) {
        self.buf.push(c);
    }

    pub fn add_chars(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Write `0<len><space>`.
    pub fn encode_length(&mut self, len: usize) {
        self.buf.push('0');
        self.buf.push_str(&len.to_string());
        self.buf.push(' ');
    }

    /// Write the null marker for `None`, otherwise a length-prefixed string.
    pub fn encode_string(&mut self, s: Option<&str>) {
        match s {
            None => self.add_char(NULL_MARKER),
            Some(s) => {
                self.encode_length(s.chars().count());
                self.add_chars(s);
            }
        }
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_get_char_and_back() {
        let mut acl = EncodedAcl::new("ab");
        assert_eq!(acl.get_char(), Some('a'));
        assert_eq!(acl.get_char(), Some('b'));
        assert_eq!(acl.get_char(), None);
        acl.back(1).unwrap();
        assert!(!acl.has_more());
        acl.back(2).unwrap();
        assert_eq!(acl.pos(), 0);
        assert_eq!(acl.get_char(), Some('a'));
    }

    #[test]
    fn test_back_past_start_fails() {
        let mut acl = EncodedAcl::new("abc");
        acl.get_char();
        assert_eq!(
            acl.back(2).unwrap_err(),
            AccessError::Rewind { pos: 1, count: 2 }
        );
    }

    #[parameterized(
        single_digit = { "5 ", 5 },
        leading_zero = { "012 ", 12 },
        zero = { "00 ", 0 },
    )]
    fn test_get_length(input: &str, expected: usize) {
        let mut acl = EncodedAcl::new(input);
        assert_eq!(acl.get_length().unwrap(), expected);
        assert!(!acl.has_more());
    }

    #[parameterized(
        non_digit = { "1x " },
        unterminated = { "12" },
        empty = { " " },
    )]
    fn test_get_length_rejects(input: &str) {
        let mut acl = EncodedAcl::new(input);
        assert!(matches!(acl.get_length(), Err(AccessError::Length(_))));
    }

    #[test]
    fn test_get_string() {
        let mut acl = EncodedAcl::new("05 aliceN03 bob");
        assert_eq!(acl.get_string().unwrap().as_deref(), Some("alice"));
        assert_eq!(acl.get_string().unwrap(), None);
        assert_eq!(acl.get_string().unwrap().as_deref(), Some("bob"));
        assert!(!acl.has_more());
    }

    #[test]
    fn test_get_string_too_short() {
        let mut acl = EncodedAcl::new("09 abc");
        assert!(matches!(acl.get_string(), Err(AccessError::Length(_))));
    }

    #[test]
    fn test_get_string_at_end() {
        let mut acl = EncodedAcl::new("");
        assert!(matches!(acl.get_string(), Err(AccessError::Length(_))));
    }

    #[test]
    fn test_skip_string() {
        let mut acl = EncodedAcl::new("04 /calX");
        acl.skip_string().unwrap();
        assert_eq!(acl.get_char(), Some('X'));

        let mut null = EncodedAcl::new("NX");
        null.skip_string().unwrap();
        assert_eq!(null.get_char(), Some('X'));
    }

    #[test]
    fn test_encode_string() {
        let mut enc = AclEncoder::new();
        enc.encode_string(Some("alice"));
        enc.encode_string(None);
        enc.encode_string(Some(""));
        assert_eq!(enc.finish(), "05 aliceN00 ");
    }

    #[test]
    fn test_encode_counts_characters_not_bytes() {
        let mut enc = AclEncoder::new();
        enc.encode_string(Some("jöran"));
        let encoded = enc.finish();
        assert_eq!(encoded, "05 jöran");

        let mut acl = EncodedAcl::new(&encoded);
        assert_eq!(acl.get_string().unwrap().as_deref(), Some("jöran"));
    }
}
