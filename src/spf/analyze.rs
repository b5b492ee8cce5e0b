//! Public SPF check entry points.

use std::collections::HashMap;

use tracing::debug;

use crate::common::dns::DnsResolver;
use crate::common::domain::normalize;

use super::assemble::{assemble, AssembledRecord};
use super::resolve::{finalize, ResolutionContext, ResolutionEngine};
use super::result::SpfAnalysisResult;
use super::SpfError;

/// Long-lived SPF analyzer. Each check allocates a fresh result/context
/// pair and replaces the stored aggregate, so a second check on the same
/// analyzer never inherits collections or counters from the first.
///
/// Checks are plain futures: dropping one cancels it at the next pending
/// DNS query, and the stored result is only replaced once a check ran to
/// completion.
pub struct SpfAnalyzer<R: DnsResolver> {
    resolver: R,
    test_records: HashMap<String, String>,
    result: SpfAnalysisResult,
}

impl<R: DnsResolver> SpfAnalyzer<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            test_records: HashMap::new(),
            result: SpfAnalysisResult::default(),
        }
    }

    /// Register a raw record override for a domain. Overrides are consulted
    /// before any live TXT query, which makes whole include trees testable
    /// without network access.
    pub fn add_test_record(&mut self, domain: &str, record: &str) {
        self.test_records
            .insert(normalize(domain), record.to_string());
    }

    /// Builder-style variant of [`add_test_record`](Self::add_test_record).
    pub fn with_test_records(mut self, records: HashMap<String, String>) -> Self {
        for (domain, record) in records {
            self.test_records.insert(normalize(&domain), record);
        }
        self
    }

    /// Result of the most recent completed check.
    pub fn last_result(&self) -> &SpfAnalysisResult {
        &self.result
    }

    /// Analyze a literal record string. Includes and redirects inside the
    /// record are still resolved through DNS (or the override map).
    pub async fn check_record(&mut self, record: &str) -> Result<&SpfAnalysisResult, SpfError> {
        let record = record.trim();
        if record.is_empty() {
            return Err(SpfError::EmptyRecord);
        }
        // A literal record is one chunk; the character-limit diagnostics
        // apply to it the same way they would to a fetched answer.
        let assembled = assemble(&[record.to_string()]);
        self.result = self.analyze(&assembled, "").await;
        Ok(&self.result)
    }

    /// Fetch a domain's TXT answer, assemble it, and analyze the result.
    pub async fn verify(&mut self, domain: &str) -> Result<&SpfAnalysisResult, SpfError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(SpfError::EmptyDomain);
        }
        debug!(domain, "verifying SPF");

        let assembled = match self.test_records.get(&normalize(domain)) {
            Some(record) => assemble(&[record.clone()]),
            None => {
                // A failed TXT query is "no record published", not an error.
                let chunks = self.resolver.query_txt(domain).await.unwrap_or_default();
                assemble(&chunks)
            }
        };
        self.result = self.analyze(&assembled, domain).await;
        Ok(&self.result)
    }

    /// Flatten a domain's entire include/redirect tree into one ordered
    /// address list suitable for publishing as a static record: `ip4`/`ip6`
    /// literals verbatim plus every address resolved behind `a`/`mx`, in
    /// walk order, duplicates preserved.
    pub async fn flattened_ip_addresses(&mut self, domain: &str) -> Result<Vec<String>, SpfError> {
        self.verify(domain)
            .await
            .map(|result| result.flattened_addresses.clone())
    }

    async fn analyze(&self, assembled: &AssembledRecord, domain: &str) -> SpfAnalysisResult {
        let mut out = SpfAnalysisResult {
            record: assembled.text.clone(),
            ..SpfAnalysisResult::default()
        };
        let mut ctx = ResolutionContext::new();

        if let Some(text) = assembled.resolvable_text() {
            let engine = ResolutionEngine::new(&self.resolver, &self.test_records);
            engine.resolve(domain, text, &mut ctx, &mut out).await;
        }
        finalize(&mut out, &ctx, assembled);
        out
    }
}
