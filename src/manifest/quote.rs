//! Reversible path quoting for manifest lines
//!
//! Paths are written as double-quoted strings with Go-style escapes so that
//! spaces, pipes, newlines and bytes that are not valid UTF-8 all survive a
//! round trip through the line-oriented manifest. Only letters, marks,
//! numbers, punctuation, symbols and the ASCII space are written raw;
//! every other code point is escaped.

use crate::error::QuoteError;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

/// Quote a path for a manifest entry
pub fn quote_path(path: &OsStr) -> String {
    quote_bytes(path.as_bytes())
}

/// Reverse [`quote_path`]
pub fn unquote_path(quoted: &str) -> Result<OsString, QuoteError> {
    unquote_bytes(quoted).map(OsString::from_vec)
}

/// Quote arbitrary bytes
pub fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');

    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_char(&mut out, c);
        }
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }

    out.push('"');
    out
}

fn push_char(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        c if is_printable(c) => out.push(c),
        c if (c as u32) < 0x20 || c == '\u{7f}' => {
            out.push_str(&format!("\\x{:02x}", c as u32))
        }
        c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push_str(&format!("\\U{:08x}", c as u32)),
    }
}

fn is_printable(c: char) -> bool {
    c == ' '
        || matches!(
            c.general_category_group(),
            GeneralCategoryGroup::Letter
                | GeneralCategoryGroup::Mark
                | GeneralCategoryGroup::Number
                | GeneralCategoryGroup::Punctuation
                | GeneralCategoryGroup::Symbol
        )
}

/// Unquote into raw bytes
pub fn unquote_bytes(quoted: &str) -> Result<Vec<u8>, QuoteError> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(QuoteError::MissingQuotes)?;

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Err(QuoteError::UnescapedQuote(i + 1)),
            b'\n' => return Err(QuoteError::RawNewline(i + 1)),
            b'\\' => {
                let esc = *bytes.get(i + 1).ok_or(QuoteError::TruncatedEscape)?;
                i += 2;
                match esc {
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'v' => out.push(0x0b),
                    b'\\' => out.push(b'\\'),
                    b'"' => out.push(b'"'),
                    b'x' => {
                        let value = parse_hex(bytes, i, 2)?;
                        out.push(value as u8);
                        i += 2;
                    }
                    b'u' | b'U' => {
                        let width = if esc == b'u' { 4 } else { 8 };
                        let value = parse_hex(bytes, i, width)?;
                        let c = char::from_u32(value).ok_or(QuoteError::InvalidCodePoint(value))?;
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        i += width;
                    }
                    b'0'..=b'7' => {
                        let digits = bytes.get(i - 1..i + 2).ok_or(QuoteError::TruncatedEscape)?;
                        let mut value = 0u32;
                        for &d in digits {
                            if !(b'0'..=b'7').contains(&d) {
                                return Err(QuoteError::InvalidEscape(d as char));
                            }
                            value = value * 8 + (d - b'0') as u32;
                        }
                        if value > 0xff {
                            return Err(QuoteError::InvalidCodePoint(value));
                        }
                        out.push(value as u8);
                        i += 2;
                    }
                    other => return Err(QuoteError::InvalidEscape(other as char)),
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn parse_hex(bytes: &[u8], start: usize, width: usize) -> Result<u32, QuoteError> {
    let digits = bytes
        .get(start..start + width)
        .ok_or(QuoteError::TruncatedEscape)?;

    digits.iter().try_fold(0u32, |acc, &d| {
        let v = (d as char)
            .to_digit(16)
            .ok_or(QuoteError::InvalidEscape(d as char))?;
        Ok(acc * 16 + v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_path() {
        assert_eq!(quote_bytes(b"/data/file.txt"), "\"/data/file.txt\"");
    }

    #[test]
    fn test_special_characters() {
        let quoted = quote_bytes(b"a b|c\n\"d\"\\e\tf");
        assert_eq!(quoted, r#""a b|c\n\"d\"\\e\tf""#);
        assert!(!quoted.contains('\n'));
        assert_eq!(unquote_bytes(&quoted).unwrap(), b"a b|c\n\"d\"\\e\tf");
    }

    #[test]
    fn test_invalid_utf8_bytes() {
        let raw = b"caf\xe9/\xff\x00";
        let quoted = quote_bytes(raw);
        assert_eq!(quoted, r#""caf\xe9/\xff\x00""#);
        assert_eq!(unquote_bytes(&quoted).unwrap(), raw);
    }

    #[test]
    fn test_unicode_kept_readable() {
        let quoted = quote_bytes("résumé 日本".as_bytes());
        assert_eq!(quoted, "\"résumé 日本\"");

        let quoted = quote_bytes("a\u{2028}b".as_bytes());
        assert_eq!(quoted, r#""a\u2028b""#);
        assert_eq!(unquote_bytes(&quoted).unwrap(), "a\u{2028}b".as_bytes());
    }

    #[test]
    fn test_format_and_unassigned_escaped() {
        assert_eq!(quote_bytes("a\u{200b}b".as_bytes()), r#""a\u200bb""#);
        assert_eq!(quote_bytes("\u{ad}".as_bytes()), r#""\u00ad""#);
        assert_eq!(quote_bytes("\u{a0}".as_bytes()), r#""\u00a0""#);
        assert_eq!(quote_bytes("\u{e000}".as_bytes()), r#""\ue000""#);
        assert_eq!(quote_bytes("\u{378}".as_bytes()), r#""\u0378""#);
        assert_eq!(quote_bytes("\u{10ffff}".as_bytes()), r#""\U0010ffff""#);
        assert_eq!(
            unquote_bytes(r#""a\u200bb""#).unwrap(),
            "a\u{200b}b".as_bytes()
        );
    }

    #[test]
    fn test_octal_escape() {
        assert_eq!(unquote_bytes(r#""\101\060""#).unwrap(), b"A0");
        assert!(unquote_bytes(r#""\400""#).is_err());
    }

    #[test]
    fn test_unquote_errors() {
        assert_eq!(unquote_bytes("plain"), Err(QuoteError::MissingQuotes));
        assert_eq!(unquote_bytes("\""), Err(QuoteError::MissingQuotes));
        assert_eq!(unquote_bytes(r#""a"b""#), Err(QuoteError::UnescapedQuote(2)));
        assert_eq!(unquote_bytes("\"a\\\""), Err(QuoteError::TruncatedEscape));
        assert_eq!(unquote_bytes(r#""\q""#), Err(QuoteError::InvalidEscape('q')));
        assert_eq!(unquote_bytes(r#""\x4""#), Err(QuoteError::TruncatedEscape));
        assert_eq!(
            unquote_bytes(r#""\ud800""#),
            Err(QuoteError::InvalidCodePoint(0xd800))
        );
        assert_eq!(unquote_bytes("\"a\nb\""), Err(QuoteError::RawNewline(2)));
    }

    #[test]
    fn test_os_str_round_trip() {
        let path = OsStr::from_bytes(b"/tmp/odd \xfe name|x");
        let quoted = quote_path(path);
        assert_eq!(unquote_path(&quoted).unwrap(), path);
    }

    proptest! {
        #[test]
        fn prop_quoting_is_reversible(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let quoted = quote_bytes(&raw);
            prop_assert!(!quoted.contains('\n'));
            prop_assert_eq!(unquote_bytes(&quoted).unwrap(), raw);
        }
    }
}
