//! Line-oriented manifest format
//!
//! A manifest is a header line naming the digest algorithm followed by one
//! `digest|size|"path"` line per hashed file. See [`codec`] for the line
//! formats and [`quote`] for path quoting.

pub mod codec;
pub mod quote;

pub use codec::{
    decode_entry, encode_entry, HeaderError, ManifestEntry, ManifestHeader, FIELD_SEPARATOR, MAGIC,
};
pub use quote::{quote_path, unquote_path};
