use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Identifier of a chunked object.
///
/// Keys are opaque: stores and the updater only compare, hash, order and
/// print them. Any type meeting the bounds is accepted through the blanket
/// impl, so callers keep their own id representation (strings, integers,
/// UUIDs, driver-specific ids).
pub trait ObjectKey: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync {}

impl<T> ObjectKey for T where T: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync {}
