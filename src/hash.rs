//! Content-addressed fingerprints used to short-circuit unchanged scene locations.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// A 128-bit content fingerprint.
///
/// Two independently-seeded [`FxHasher`] lanes stand in for a proper 128-bit
/// hash (e.g. a Murmur or xxh3 variant) — adequate here because the hash is
/// used only to detect *change* between two calls of the same upstream
/// accessor, never as a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash128(u64, u64);

impl Hash128 {
    /// The hash of "nothing has been fetched yet" — distinct from the hash of
    /// any real value with overwhelming probability, so a freshly cleared
    /// [`crate::node::SceneNode`] always looks dirty on the next pass.
    pub const NONE: Hash128 = Hash128(0, 0);

    /// Hashes a single value with two differently-seeded lanes.
    pub fn of<T: Hash>(value: &T) -> Self {
        let mut lo = FxHasher::default();
        0xA5A5_A5A5_u64.hash(&mut lo);
        value.hash(&mut lo);

        let mut hi = FxHasher::default();
        0x5A5A_5A5A_u64.hash(&mut hi);
        value.hash(&mut hi);

        Hash128(lo.finish(), hi.finish())
    }
}
