use bytes::Bytes;
use data_encoding::BASE64;
use thiserror::Error;

/// An opaque identifier for an object in the store.
///
/// Two trees or blobs with equal digest are defined equal; this is the only
/// identity the diff engine ever compares.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Digest(Bytes);

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

pub const DIGEST_LEN: usize = 32;

impl Digest {
    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<Digest> for bytes::Bytes {
    fn from(val: Digest) -> Self {
        val.0
    }
}

impl From<&[u8; DIGEST_LEN]> for Digest {
    fn from(value: &[u8; DIGEST_LEN]) -> Self {
        Self(value.to_vec().into())
    }
}

impl From<blake3::Hash> for Digest {
    fn from(value: blake3::Hash) -> Self {
        value.as_bytes().into()
    }
}

impl TryFrom<Vec<u8>> for Digest {
    type Error = Error;

    // constructs a [Digest] from a [Vec<u8>].
    // Returns an error if the digest has the wrong length.
    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() != DIGEST_LEN {
            Err(Error::InvalidDigestLen(value.len()))
        } else {
            Ok(Self(value.into()))
        }
    }
}

impl TryFrom<bytes::Bytes> for Digest {
    type Error = Error;

    // constructs a [Digest] from a [bytes::Bytes].
    // Returns an error if the digest has the wrong length.
    fn try_from(value: bytes::Bytes) -> Result<Self, Self::Error> {
        if value.len() != DIGEST_LEN {
            Err(Error::InvalidDigestLen(value.len()))
        } else {
            Ok(Self(value))
        }
    }
}

impl Clone for Digest {
    fn clone(&self) -> Self {
        Self(self.0.to_owned())
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b3:{}", BASE64.encode(&self.0))
    }
}
