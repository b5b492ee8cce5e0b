//! Recursive resolution of `include`/`redirect` graphs.
//!
//! One [`ResolutionContext`] is owned per top-level check and borrowed
//! mutably by every recursive step; the visited set is the termination
//! guarantee on cyclic graphs, independent of recursion depth. A cycle is
//! reported, not fatal: the rest of the graph still resolves, because
//! operators need the diagnostic rather than an aborted report.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use tracing::{debug, trace};

use crate::common::dns::DnsResolver;
use crate::common::domain::normalize;

use super::assemble::assemble;
use super::mechanism::{MechanismKind, Modifier, ModifierName, Term};
use super::result::SpfAnalysisResult;
use super::tokenize::tokenize;

/// RFC 7208 Section 4.6.4 ceiling on lookup-incurring mechanisms.
pub(crate) const MAX_DNS_LOOKUPS: usize = 10;

/// Shared mutable state threaded through one resolution walk. Exclusive
/// to a single check; never reused across checks.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    visited: HashSet<String>,
    dns_lookups: usize,
    cycle_detected: bool,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dns_lookups(&self) -> usize {
        self.dns_lookups
    }

    pub fn cycle_detected(&self) -> bool {
        self.cycle_detected
    }

    fn count_lookup(&mut self) {
        self.dns_lookups += 1;
    }

    /// Insert a domain into the visited set. Returns false (and marks the
    /// cycle) when the domain was already walked.
    fn enter(&mut self, domain: &str) -> bool {
        if self.visited.insert(normalize(domain)) {
            true
        } else {
            debug!(domain, "include cycle detected, truncating descent");
            self.cycle_detected = true;
            false
        }
    }
}

/// The recursive walk over one record and everything it includes.
/// Borrows the caller's resolver and test-record override map; all output
/// lands in the `SpfAnalysisResult` it is handed.
pub(crate) struct ResolutionEngine<'a, R: DnsResolver> {
    resolver: &'a R,
    overrides: &'a HashMap<String, String>,
}

impl<'a, R: DnsResolver> ResolutionEngine<'a, R> {
    pub(crate) fn new(resolver: &'a R, overrides: &'a HashMap<String, String>) -> Self {
        Self {
            resolver,
            overrides,
        }
    }

    pub(crate) async fn resolve(
        &self,
        domain: &str,
        record: &str,
        ctx: &mut ResolutionContext,
        out: &mut SpfAnalysisResult,
    ) {
        self.resolve_level(domain, record, true, ctx, out).await;
    }

    async fn resolve_level(
        &self,
        domain: &str,
        record: &str,
        top: bool,
        ctx: &mut ResolutionContext,
        out: &mut SpfAnalysisResult,
    ) {
        // Cycle guard first: a repeated domain is reported once and never
        // re-descended or re-counted.
        if !ctx.enter(domain) {
            return;
        }
        trace!(domain, "resolving record level");

        let tokenized = tokenize(record);
        if top {
            out.contains_characters_after_all = tokenized.contains_characters_after_all;
            out.terms = tokenized.terms.clone();
        }

        // `all` terminates its own record level; track it here both for the
        // multiple-all diagnostic and for the redirect-skip rule below.
        let mut all_seen_here = false;
        let mut redirect_here: Option<String> = None;

        for term in &tokenized.terms {
            match term {
                Term::Mechanism(m) => {
                    // The deprecated mechanism is worth flagging even when
                    // its value is broken and nothing gets looked up.
                    if m.kind == MechanismKind::Ptr {
                        out.has_ptr_type = true;
                    }
                    if m.is_null_lookup() {
                        // Syntactically present, semantically useless: no
                        // query, no budget cost, but worth flagging.
                        out.has_null_lookups = true;
                        continue;
                    }
                    match m.kind {
                        MechanismKind::Ip4 => {
                            out.ipv4_addresses.push(m.value.clone());
                            out.flattened_addresses.push(m.value.clone());
                        }
                        MechanismKind::Ip6 => {
                            out.ipv6_addresses.push(m.value.clone());
                            out.flattened_addresses.push(m.value.clone());
                        }
                        MechanismKind::A => {
                            ctx.count_lookup();
                            let target = if m.value.is_empty() { domain } else { m.value.as_str() };
                            self.resolve_host_addresses(target, out).await;
                        }
                        MechanismKind::Mx => {
                            ctx.count_lookup();
                            let target = if m.value.is_empty() { domain } else { m.value.as_str() };
                            if let Ok(hosts) = self.resolver.query_mx(target).await {
                                // RFC 7208 caps the exchanges considered per
                                // mx mechanism at 10.
                                for host in hosts.into_iter().take(10) {
                                    out.resolved_mx_records.push(host.clone());
                                    self.resolve_host_addresses(&host, out).await;
                                }
                            }
                        }
                        MechanismKind::Ptr => {
                            ctx.count_lookup();
                            let target = if m.value.is_empty() { domain } else { m.value.as_str() };
                            // Deprecated mechanism: the lookup still spends
                            // budget, but the names prove nothing here.
                            let _ = self.resolver.query_ptr(target).await;
                        }
                        MechanismKind::Exists => {
                            ctx.count_lookup();
                            let _ = self.resolver.query_a(&m.value).await;
                        }
                        MechanismKind::Include => {
                            out.includes.push(m.value.clone());
                            ctx.count_lookup();
                            if let Some(text) = self.fetch_record(&m.value).await {
                                Box::pin(self.resolve_level(&m.value, &text, false, ctx, out))
                                    .await;
                            }
                        }
                        MechanismKind::All => {
                            if all_seen_here {
                                if top {
                                    out.multiple_all_mechanisms = true;
                                }
                            } else if top {
                                out.all_mechanism = Some(m.raw.clone());
                            }
                            all_seen_here = true;
                        }
                    }
                }
                Term::Modifier(Modifier {
                    name: ModifierName::Redirect,
                    value,
                }) => {
                    if top {
                        out.has_redirect = true;
                        out.redirect_value = Some(value.clone());
                    }
                    redirect_here = Some(value.clone());
                }
                Term::Modifier(Modifier {
                    name: ModifierName::Exp,
                    value,
                }) => {
                    if top {
                        out.has_exp = true;
                        out.exp_value = Some(value.clone());
                    }
                }
                Term::Unknown(_) => {}
            }
        }

        // A redirect is only followed when this level had no explicit `all`;
        // with `all` present the redirect is dead policy text.
        if let Some(target) = redirect_here {
            if !all_seen_here && !target.is_empty() {
                ctx.count_lookup();
                if let Some(text) = self.fetch_record(&target).await {
                    Box::pin(self.resolve_level(&target, &text, false, ctx, out)).await;
                }
            }
        }
    }

    /// A and AAAA addresses behind one `a` target or mx exchange. Both
    /// families ride on the mechanism's single budget increment; an
    /// IPv6-only host still contributes to the flattened list.
    async fn resolve_host_addresses(&self, host: &str, out: &mut SpfAnalysisResult) {
        if let Ok(addrs) = self.resolver.query_a(host).await {
            for addr in addrs {
                out.resolved_a_records.push(IpAddr::V4(addr));
                out.flattened_addresses.push(addr.to_string());
            }
        }
        if let Ok(addrs) = self.resolver.query_aaaa(host).await {
            for addr in addrs {
                out.resolved_a_records.push(IpAddr::V6(addr));
                out.flattened_addresses.push(addr.to_string());
            }
        }
    }

    /// Record text for an included/redirected domain: the test-record
    /// override map wins over live DNS. A failed query, an empty answer, or
    /// an ambiguous multi-record answer all resolve to "nothing to descend
    /// into"; the lookup has already been counted.
    async fn fetch_record(&self, domain: &str) -> Option<String> {
        if let Some(text) = self.overrides.get(&normalize(domain)) {
            trace!(domain, "using test-record override");
            return Some(text.clone());
        }
        match self.resolver.query_txt(domain).await {
            Ok(chunks) => {
                let assembled = assemble(&chunks);
                assembled.resolvable_text().map(str::to_string)
            }
            Err(_) => None,
        }
    }
}

/// Limit & validity checks derived after the walk. Character-limit facts
/// come from the top-level assembly only; nested records were judged by
/// their own assembly and never touch the caller's flags.
/// `starts_correctly` is derived from the assembled text itself,
/// independent of everything else, so it holds even when an ambiguous
/// multi-record answer kept the walk from running at all.
pub(crate) fn finalize(
    out: &mut SpfAnalysisResult,
    ctx: &ResolutionContext,
    assembled: &super::assemble::AssembledRecord,
) {
    let lower = assembled.text.trim().to_ascii_lowercase();
    out.starts_correctly = lower == "v=spf1" || lower.starts_with("v=spf1 ");
    out.dns_lookup_count = ctx.dns_lookups();
    out.exceeds_dns_lookups = ctx.dns_lookups() > MAX_DNS_LOOKUPS;
    out.cycle_detected = ctx.cycle_detected();
    out.exceeds_character_limit = assembled.exceeds_chunk_limit;
    out.exceeds_total_character_limit = assembled.exceeds_total_limit;
    out.multiple_spf_records = assembled.multiple_spf_records;
}
