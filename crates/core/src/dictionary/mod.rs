//! Entity name dictionaries
//!
//! Rule sets own the entity names extracted from a knowledge base (or entered
//! manually). For a matching run, the names of all active rule sets are
//! prepared and collected into an [`EntityDictionary`], which indexes them by
//! the first character of their first token.

pub mod entity;
pub mod index;
pub mod ruleset;

pub use entity::*;
pub use index::*;
pub use ruleset::*;
