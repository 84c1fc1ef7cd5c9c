//! Key hashing for element identity.

use std::hash::{Hash, Hasher};

#[cfg(feature = "std-hash")]
type DefaultHasher = std::collections::hash_map::DefaultHasher;

#[cfg(not(feature = "std-hash"))]
type DefaultHasher = ahash::AHasher;

/// Hash one value with the active default hasher. Folds user-supplied
/// child keys into a stable 64-bit [`crate::Key`].
#[inline]
pub(crate) fn hash_one<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}
