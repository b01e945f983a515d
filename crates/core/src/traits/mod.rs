//! Core trait definitions for distner

pub mod tokenizer;

pub use tokenizer::*;
