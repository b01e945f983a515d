//! Token matching and conflict resolution
//!
//! The [`Matcher`] scans a token sequence against an
//! [`EntityDictionary`](crate::EntityDictionary) and reports every occurrence,
//! overlapping or not. The [`ConflictResolver`] then reduces those candidates
//! to a non-overlapping selection.

pub mod casing;
pub mod fuzzy;
pub mod matcher;
pub mod resolver;

pub use casing::*;
pub use matcher::*;
pub use resolver::*;
