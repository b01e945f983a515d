//! distner Core Library
//!
//! Dictionary-based distant supervision for named entity recognition: entity
//! name dictionaries built from rule sets, token matching, greedy conflict
//! resolution, BIO-2/IO label encoding and span-level evaluation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod settings;
pub mod traits;

pub mod dictionary;
pub mod evaluation;
pub mod labeling;
pub mod matching;
pub mod pipeline;
pub mod session;

pub use error::{Error, Result};
pub use dictionary::*;
pub use evaluation::*;
pub use labeling::*;
pub use matching::*;
pub use pipeline::*;
pub use session::*;
pub use settings::*;
pub use traits::*;
