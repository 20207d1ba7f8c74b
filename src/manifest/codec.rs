//! Manifest header and entry encoding
//!
//! ```text
//! #!ghash <algorithm> <version>
//! <hex-digest>|<decimal-size>|<quoted-path>
//! ```

use super::quote::{quote_path, unquote_path};
use crate::error::LineError;
use std::path::{Path, PathBuf};

/// Literal token every manifest starts with
pub const MAGIC: &str = "#!ghash";

/// Field separator for entry lines
pub const FIELD_SEPARATOR: char = '|';

/// First line of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestHeader {
    /// Registry name of the digest algorithm
    pub algorithm: String,

    /// Version of the tool that wrote the manifest
    pub version: String,
}

/// Structural problems with a header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer than three space-separated fields
    TooShort,
    /// First field is not [`MAGIC`]
    BadMagic,
}

impl ManifestHeader {
    pub fn new(algorithm: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            version: version.into(),
        }
    }

    /// Header line without the trailing newline
    pub fn encode(&self) -> String {
        format!("{} {} {}", MAGIC, self.algorithm, self.version)
    }

    /// Parse a header line
    ///
    /// Only structure is checked here; whether the algorithm is known is up
    /// to the caller's registry.
    pub fn parse(line: &str) -> Result<Self, HeaderError> {
        let fields: Vec<&str> = line.split(' ').collect();
        if fields.len() < 3 {
            return Err(HeaderError::TooShort);
        }
        if fields[0] != MAGIC {
            return Err(HeaderError::BadMagic);
        }

        Ok(Self::new(fields[1], fields[2]))
    }
}

/// One verification obligation decoded from a manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Expected digest, lower-case hex
    pub expected_digest: String,

    /// Expected size in bytes
    pub expected_size: u64,

    /// Unquoted path
    pub path: PathBuf,
}

/// Encode one result line (without the trailing newline)
pub fn encode_entry(digest_hex: &str, size: u64, path: &Path) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        digest_hex,
        size,
        quote_path(path.as_os_str()),
        sep = FIELD_SEPARATOR
    )
}

/// Decode one entry line
///
/// The quoted path is everything after the second separator, so paths
/// containing `|` decode intact.
pub fn decode_entry(line: &str) -> Result<ManifestEntry, LineError> {
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let (digest, size, quoted) = match (fields.next(), fields.next(), fields.next()) {
        (Some(d), Some(s), Some(q)) => (d, s, q),
        _ => return Err(LineError::NotEnoughFields),
    };

    let expected_size = size.parse::<u64>()?;
    let path = PathBuf::from(unquote_path(quoted)?);

    Ok(ManifestEntry {
        expected_digest: digest.to_ascii_lowercase(),
        expected_size,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuoteError;
    use std::collections::HashSet;

    #[test]
    fn test_header_encode_parse() {
        let header = ManifestHeader::new("sha256", "0.1.0");
        let line = header.encode();
        assert_eq!(line, "#!ghash sha256 0.1.0");
        assert_eq!(ManifestHeader::parse(&line), Ok(header));
    }

    #[test]
    fn test_header_extra_fields_ignored() {
        let header = ManifestHeader::parse("#!ghash blake3 1.2 trailing").unwrap();
        assert_eq!(header.algorithm, "blake3");
        assert_eq!(header.version, "1.2");
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        assert_eq!(
            ManifestHeader::parse("#!gash sha256 0.1.0"),
            Err(HeaderError::BadMagic)
        );
        assert_eq!(
            ManifestHeader::parse("#!ghashx sha256 0.1.0"),
            Err(HeaderError::BadMagic)
        );
    }

    #[test]
    fn test_header_too_short() {
        assert_eq!(ManifestHeader::parse("#!ghash sha256"), Err(HeaderError::TooShort));
        assert_eq!(ManifestHeader::parse(""), Err(HeaderError::TooShort));
    }

    #[test]
    fn test_entry_line_format() {
        let line = encode_entry("abcd", 42, Path::new("/data/a file.txt"));
        assert_eq!(line, "abcd|42|\"/data/a file.txt\"");
    }

    #[test]
    fn test_entry_path_with_pipe() {
        let line = encode_entry("00ff", 7, Path::new("dir|x/na|me"));
        let entry = decode_entry(&line).unwrap();
        assert_eq!(entry.path, PathBuf::from("dir|x/na|me"));
        assert_eq!(entry.expected_size, 7);
        assert_eq!(entry.expected_digest, "00ff");
    }

    #[test]
    fn test_entry_digest_lowercased() {
        let entry = decode_entry("ABCDEF|1|\"f\"").unwrap();
        assert_eq!(entry.expected_digest, "abcdef");
    }

    #[test]
    fn test_entry_errors() {
        assert_eq!(decode_entry("abcd|12"), Err(LineError::NotEnoughFields));
        assert_eq!(decode_entry(""), Err(LineError::NotEnoughFields));
        assert!(matches!(decode_entry("abcd|-1|\"f\""), Err(LineError::BadSize(_))));
        assert!(matches!(decode_entry("abcd|x|\"f\""), Err(LineError::BadSize(_))));
        assert_eq!(
            decode_entry("abcd|1|f"),
            Err(LineError::BadFileName(QuoteError::MissingQuotes))
        );
    }

    #[test]
    fn test_entries_round_trip_as_set() {
        let triples = vec![
            ("aa".to_string(), 1u64, PathBuf::from("/x/one")),
            ("bb".to_string(), 0u64, PathBuf::from("two words")),
            ("cc".to_string(), 99u64, PathBuf::from("new\nline")),
        ];

        let lines: Vec<String> = triples
            .iter()
            .rev()
            .map(|(d, s, p)| encode_entry(d, *s, p))
            .collect();

        let decoded: HashSet<(String, u64, PathBuf)> = lines
            .iter()
            .map(|l| decode_entry(l).unwrap())
            .map(|e| (e.expected_digest, e.expected_size, e.path))
            .collect();

        let expected: HashSet<_> = triples.into_iter().collect();
        assert_eq!(decoded, expected);
    }
}
