//! SPF record diagnostics: chunk assembly, mechanism parsing, recursive
//! resolution with RFC 7208 lookup budgeting, and address flattening.
//!
//! This crate is the SPF core of a larger domain-health toolkit. It never
//! fails on malformed records: syntax problems, exceeded limits, and
//! include cycles all surface as boolean flags on [`SpfAnalysisResult`],
//! so callers can always render a best-effort report.
//!
//! DNS caching is the caller's responsibility. Lookups go through the
//! [`DnsResolver`] trait: implement it with caching at the resolver layer,
//! or use the bundled [`HickoryResolver`].

pub mod common;
pub mod spf;

pub use common::dns::{DnsError, DnsResolver, HickoryResolver, MockResolver};
pub use spf::{SpfAnalysisResult, SpfAnalyzer, SpfError};
