//! SPF record diagnostics (RFC 7208).
//!
//! Pipeline: TXT chunks are assembled into one record string
//! ([`assemble`]), tokenized into terms ([`tokenize`]), resolved
//! recursively through DNS with a shared lookup budget and cycle guard
//! ([`resolve`]), and summarized into an [`SpfAnalysisResult`]. The
//! [`SpfAnalyzer`] entry points tie the stages together.

mod analyze;
mod assemble;
mod mechanism;
mod resolve;
mod result;
mod tokenize;

pub use analyze::SpfAnalyzer;
pub use assemble::{assemble, AssembledRecord};
pub use mechanism::{Mechanism, MechanismKind, Modifier, ModifierName, Qualifier, Term};
pub use resolve::ResolutionContext;
pub use result::SpfAnalysisResult;
pub use tokenize::{tokenize, TokenizedRecord};

use thiserror::Error;

/// Caller-input validation errors. Malformed records, DNS failures, and
/// exceeded limits never produce an `Err`; they surface as diagnostic flags
/// on [`SpfAnalysisResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpfError {
    #[error("domain must not be empty")]
    EmptyDomain,
    #[error("record must not be empty")]
    EmptyRecord,
}
