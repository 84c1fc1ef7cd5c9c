//! Hash collection aliases used throughout the crate: hashbrown by
//! default, or the standard library versions under the `std-hash`
//! feature.

#[cfg(feature = "std-hash")]
pub(crate) mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub(crate) mod map {
    pub use hashbrown::{HashMap, HashSet};
}
