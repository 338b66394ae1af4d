//! Digest adapter: reduces a key to the 64-bit identity stored in a slot.
//!
//! The table is generic over any `BuildHasher`; the default is SipHash-2-4
//! keyed with a fixed 16-byte secret, so digests are stable for the life of
//! the process (and across processes sharing the secret).

use core::hash::{BuildHasher, Hasher};
use siphasher::sip::SipHasher24;

/// Secret used by `SipDigest::default()`.
pub const DEFAULT_SECRET: [u8; 16] = *b"abcdef9876543210";

/// `BuildHasher` producing SipHash-2-4 hashers keyed with a fixed secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SipDigest {
    secret: [u8; 16],
}

impl SipDigest {
    pub const fn with_secret(secret: [u8; 16]) -> Self {
        Self { secret }
    }

    pub fn secret(&self) -> &[u8; 16] {
        &self.secret
    }
}

impl Default for SipDigest {
    fn default() -> Self {
        Self::with_secret(DEFAULT_SECRET)
    }
}

impl BuildHasher for SipDigest {
    type Hasher = SipHasher24;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher24::new_with_key(&self.secret)
    }
}

/// Digest of raw key bytes. Bytes are fed as-is, without a length prefix.
#[inline]
pub(crate) fn digest_of<S: BuildHasher>(hasher: &S, key: &[u8]) -> u64 {
    let mut h = hasher.build_hasher();
    h.write(key);
    h.finish()
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: the digest is a pure function of (key, secret).
    #[test]
    fn deterministic_for_same_secret() {
        let a = SipDigest::default();
        let b = SipDigest::with_secret(DEFAULT_SECRET);
        assert_eq!(digest_of(&a, b"key"), digest_of(&b, b"key"));
        assert_ne!(digest_of(&a, b"key"), digest_of(&a, b"kez"));
    }

    /// Invariant: changing the secret changes the digest.
    #[test]
    fn secret_is_keyed() {
        let a = SipDigest::default();
        let b = SipDigest::with_secret([7u8; 16]);
        assert_eq!(a.secret(), &DEFAULT_SECRET);
        assert_eq!(b.secret(), &[7u8; 16]);
        assert_ne!(digest_of(&a, b"key"), digest_of(&b, b"key"));
    }

    /// Invariant: digests match a direct SipHash-2-4 over the raw bytes.
    #[test]
    fn matches_raw_siphash() {
        let d = SipDigest::default();
        let mut h = SipHasher24::new_with_key(&DEFAULT_SECRET);
        h.write(b"According to all known laws of aviation");
        assert_eq!(
            digest_of(&d, b"According to all known laws of aviation"),
            h.finish()
        );
    }
}
