//! Evaluation of predicted tags against gold tags

pub mod analysis;
pub mod metrics;

pub use analysis::*;
pub use metrics::*;
