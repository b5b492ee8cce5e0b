//! Infrastructure shared across the toolkit's analyzers.

pub mod dns;
pub mod domain;
