//! Token tags: encoding, scheme conversion and CoNLL interchange

pub mod conll;
pub mod converter;
pub mod encoder;

pub use conll::*;
pub use converter::*;
pub use encoder::*;
