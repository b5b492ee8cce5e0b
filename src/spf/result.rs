//! Per-check result aggregate.

use std::net::IpAddr;

use serde::Serialize;

use super::mechanism::Term;

/// Everything one SPF check produced: the record text, its terms, the
/// collections gathered across the whole include/redirect tree, and the
/// diagnostic flags. Malformed input never aborts a check; it shows up
/// here as flags so callers can always render a report.
///
/// A fresh instance is built for every check and fully replaces the
/// previous one held by the analyzer; results are never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpfAnalysisResult {
    /// Assembled top-level record text.
    pub record: String,
    /// Top-level terms in textual order.
    pub terms: Vec<Term>,

    /// Every `include:` target encountered across the tree, in walk order.
    pub includes: Vec<String>,
    pub has_redirect: bool,
    pub redirect_value: Option<String>,
    pub has_exp: bool,
    pub exp_value: Option<String>,
    /// Literal text of the top-level `all` mechanism, qualifier included.
    pub all_mechanism: Option<String>,

    /// Addresses resolved behind `a` and `mx` mechanisms across the tree.
    pub resolved_a_records: Vec<IpAddr>,
    /// MX exchange hosts resolved across the tree.
    pub resolved_mx_records: Vec<String>,
    /// `ip4:` literals verbatim (CIDR suffix preserved), in walk order.
    pub ipv4_addresses: Vec<String>,
    /// `ip6:` literals verbatim, in walk order.
    pub ipv6_addresses: Vec<String>,
    /// Flattened address list in walk order: every `ip4`/`ip6` literal and
    /// every address resolved behind `a`/`mx`, across the whole tree. Not
    /// deduplicated; suitable for publishing as a static record.
    pub flattened_addresses: Vec<String>,

    /// DNS lookups spent by the walk (`include`/`a`/`mx`/`ptr`/`exists`).
    pub dns_lookup_count: usize,

    pub starts_correctly: bool,
    pub exceeds_dns_lookups: bool,
    pub exceeds_character_limit: bool,
    pub exceeds_total_character_limit: bool,
    pub multiple_spf_records: bool,
    pub multiple_all_mechanisms: bool,
    pub contains_characters_after_all: bool,
    pub has_null_lookups: bool,
    pub has_ptr_type: bool,
    pub cycle_detected: bool,
}
