//! Registry of supported digest algorithms
//!
//! BLAKE2 and BLAKE3 are run in keyed mode with an all-zero 32-byte key so
//! digests match manifests written by earlier ghash releases.

use super::{DigestHasher, HasherFactory};
use blake2::digest::consts::U32;
use blake2::digest::Mac;
use blake2::{Blake2bMac, Blake2bMac512, Blake2sMac256};
use std::fmt;
use std::str::FromStr;

/// Key used for the keyed BLAKE variants
const ZERO_KEY: [u8; 32] = [0u8; 32];

type Blake2bMac256 = Blake2bMac<U32>;

/// A registered digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
    Sha512,
    /// SHA3-512 under its short name
    Sha3,
    Sha3_256,
    Sha3_512,
    Blake2s,
    /// BLAKE2b-512 under its short name
    Blake2b,
    Blake2b256,
    Blake2b512,
    Blake3,
}

impl Algorithm {
    /// Every registered algorithm
    pub const ALL: [Algorithm; 10] = [
        Algorithm::Sha256,
        Algorithm::Sha512,
        Algorithm::Sha3,
        Algorithm::Sha3_256,
        Algorithm::Sha3_512,
        Algorithm::Blake2s,
        Algorithm::Blake2b,
        Algorithm::Blake2b256,
        Algorithm::Blake2b512,
        Algorithm::Blake3,
    ];

    /// Algorithm used when none is requested
    pub const DEFAULT: Algorithm = Algorithm::Sha256;

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
            Algorithm::Sha3 => "sha3",
            Algorithm::Sha3_256 => "sha3-256",
            Algorithm::Sha3_512 => "sha3-512",
            Algorithm::Blake2s => "blake2s",
            Algorithm::Blake2b => "blake2b",
            Algorithm::Blake2b256 => "blake2b-256",
            Algorithm::Blake2b512 => "blake2b-512",
            Algorithm::Blake3 => "blake3",
        }
    }

    /// Look up an algorithm by registry name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Sha256
            | Algorithm::Sha3_256
            | Algorithm::Blake2s
            | Algorithm::Blake2b256
            | Algorithm::Blake3 => 32,
            Algorithm::Sha512
            | Algorithm::Sha3
            | Algorithm::Sha3_512
            | Algorithm::Blake2b
            | Algorithm::Blake2b512 => 64,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown hash algorithm '{}'", s))
    }
}

impl HasherFactory for Algorithm {
    fn name(&self) -> &str {
        Algorithm::name(self)
    }

    fn new_hasher(&self) -> Option<Box<dyn DigestHasher>> {
        let hasher: Box<dyn DigestHasher> = match self {
            Algorithm::Sha256 => Box::new(Plain(sha2::Sha256::default())),
            Algorithm::Sha512 => Box::new(Plain(sha2::Sha512::default())),
            Algorithm::Sha3 | Algorithm::Sha3_512 => Box::new(Plain(sha3::Sha3_512::default())),
            Algorithm::Sha3_256 => Box::new(Plain(sha3::Sha3_256::default())),
            Algorithm::Blake2s => Box::new(Keyed(
                Blake2sMac256::new_with_salt_and_personal(&ZERO_KEY, &[], &[]).ok()?,
            )),
            Algorithm::Blake2b | Algorithm::Blake2b512 => Box::new(Keyed(
                Blake2bMac512::new_with_salt_and_personal(&ZERO_KEY, &[], &[]).ok()?,
            )),
            Algorithm::Blake2b256 => Box::new(Keyed(
                Blake2bMac256::new_with_salt_and_personal(&ZERO_KEY, &[], &[]).ok()?,
            )),
            Algorithm::Blake3 => Box::new(Blake3(blake3::Hasher::new_keyed(&ZERO_KEY))),
        };
        Some(hasher)
    }
}

/// Unkeyed RustCrypto digest
struct Plain<D>(D);

impl<D> DigestHasher for Plain<D>
where
    D: sha2::Digest + Send,
{
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        sha2::Digest::finalize(self.0).to_vec()
    }
}

/// Keyed BLAKE2 MAC
struct Keyed<M>(M);

impl<M> DigestHasher for Keyed<M>
where
    M: Mac + Send,
{
    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        Mac::finalize(self.0).into_bytes().to_vec()
    }
}

struct Blake3(blake3::Hasher);

impl DigestHasher for Blake3 {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().as_bytes().to_vec()
    }
}
