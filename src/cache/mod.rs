//! Local image cache
//!
//! Mirrored images live as plain files under the site's public asset tree,
//! named `<key><extension>`. The directory itself is the cache index.

pub mod key;
pub mod storage;

pub use key::{KeyScheme, cache_key};
pub use storage::{CachedEntry, ImageStore};
