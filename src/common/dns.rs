use std::collections::HashMap;
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioResolver;
use thiserror::Error;

use super::domain::normalize;

#[derive(Debug, Clone, Error)]
pub enum DnsError {
    #[error("NXDOMAIN: domain does not exist")]
    NxDomain,
    #[error("SERVFAIL: server failure")]
    ServFail,
    #[error("timeout")]
    Timeout,
    #[error("DNS error: {0}")]
    Other(String),
}

/// DNS query interface used by the analyzers. A failed or empty query is
/// never an analyzer-level error; callers treat `Err` as "no data".
///
/// `query_txt` returns the individual TXT character-strings (chunks) in
/// answer order so record assembly can enforce per-chunk length limits.
/// `query_ptr` takes a domain, not an IP: SPF `ptr:` targets are names.
pub trait DnsResolver: Clone + Send + Sync + 'static {
    fn query_txt(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
    fn query_a(&self, domain: &str) -> impl Future<Output = Result<Vec<Ipv4Addr>, DnsError>> + Send;
    fn query_aaaa(&self, domain: &str) -> impl Future<Output = Result<Vec<Ipv6Addr>, DnsError>> + Send;
    fn query_mx(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
    fn query_ptr(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// Hickory DNS resolver implementation
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let resolver = TokioResolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .build();
        Ok(Self { resolver })
    }

    pub fn with_config(
        config: ResolverConfig,
        opts: ResolverOpts,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Ok(Self { resolver })
    }

    fn classify_error(e: &hickory_resolver::ResolveError) -> DnsError {
        let msg = e.to_string().to_lowercase();
        if msg.contains("nxdomain") || msg.contains("no records") {
            DnsError::NxDomain
        } else if msg.contains("timeout") {
            DnsError::Timeout
        } else if msg.contains("servfail") {
            DnsError::ServFail
        } else {
            DnsError::Other(e.to_string())
        }
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        match self.resolver.txt_lookup(domain).await {
            Ok(lookup) => {
                // One entry per character-string, not per TXT record, so the
                // 255-byte chunk limit stays observable downstream.
                let chunks: Vec<String> = lookup
                    .iter()
                    .flat_map(|txt| txt.txt_data().iter())
                    .map(|data| String::from_utf8_lossy(data).into_owned())
                    .collect();
                Ok(chunks)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_a(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        match self.resolver.ipv4_lookup(domain).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_aaaa(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        match self.resolver.ipv6_lookup(domain).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let hosts: Vec<String> = lookup
                    .iter()
                    .map(|mx| mx.exchange().to_string().trim_end_matches('.').to_string())
                    .collect();
                Ok(hosts)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_ptr(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        match self.resolver.lookup(domain, RecordType::PTR).await {
            Ok(lookup) => {
                let names: Vec<String> = lookup
                    .iter()
                    .filter_map(|rdata| match rdata {
                        RData::PTR(name) => {
                            Some(name.0.to_string().trim_end_matches('.').to_string())
                        }
                        _ => None,
                    })
                    .collect();
                Ok(names)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }
}

/// Mock DNS resolver for testing. Domains are normalized on insert and
/// lookup; unknown domains answer with empty record sets.
#[derive(Clone, Default)]
pub struct MockResolver {
    txt_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    a_records: Arc<Mutex<HashMap<String, Vec<Ipv4Addr>>>>,
    aaaa_records: Arc<Mutex<HashMap<String, Vec<Ipv6Addr>>>>,
    mx_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    ptr_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    errors: Arc<Mutex<HashMap<String, DnsError>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt<I, S>(&self, domain: &str, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.txt_records
            .lock()
            .unwrap()
            .insert(normalize(domain), chunks.into_iter().map(Into::into).collect());
    }

    pub fn add_a(&self, domain: &str, addrs: Vec<Ipv4Addr>) {
        self.a_records.lock().unwrap().insert(normalize(domain), addrs);
    }

    pub fn add_aaaa(&self, domain: &str, addrs: Vec<Ipv6Addr>) {
        self.aaaa_records.lock().unwrap().insert(normalize(domain), addrs);
    }

    pub fn add_mx(&self, domain: &str, hosts: Vec<String>) {
        self.mx_records.lock().unwrap().insert(normalize(domain), hosts);
    }

    pub fn add_ptr(&self, domain: &str, names: Vec<String>) {
        self.ptr_records.lock().unwrap().insert(normalize(domain), names);
    }

    /// Make every query against `domain` fail with the given error.
    pub fn set_error(&self, domain: &str, error: DnsError) {
        self.errors.lock().unwrap().insert(normalize(domain), error);
    }

    fn check_error(&self, domain: &str) -> Result<(), DnsError> {
        match self.errors.lock().unwrap().get(&normalize(domain)) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl DnsResolver for MockResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.check_error(domain)?;
        Ok(self
            .txt_records
            .lock()
            .unwrap()
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_a(&self, domain: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        self.check_error(domain)?;
        Ok(self
            .a_records
            .lock()
            .unwrap()
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_aaaa(&self, domain: &str) -> Result<Vec<Ipv6Addr>, DnsError> {
        self.check_error(domain)?;
        Ok(self
            .aaaa_records
            .lock()
            .unwrap()
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.check_error(domain)?;
        Ok(self
            .mx_records
            .lock()
            .unwrap()
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_ptr(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.check_error(domain)?;
        Ok(self
            .ptr_records
            .lock()
            .unwrap()
            .get(&normalize(domain))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_resolver_txt_chunks() {
        let resolver = MockResolver::new();
        resolver.add_txt("example.com", vec!["v=spf1 ", "-all"]);

        let chunks = resolver.query_txt("example.com").await.unwrap();
        assert_eq!(chunks, vec!["v=spf1 ", "-all"]);
    }

    #[tokio::test]
    async fn mock_resolver_unknown_domain_is_empty() {
        let resolver = MockResolver::new();
        let chunks = resolver.query_txt("unknown.example.com").await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn mock_resolver_error_injection() {
        let resolver = MockResolver::new();
        resolver.set_error("broken.example.com", DnsError::Timeout);

        let result = resolver.query_a("broken.example.com").await;
        assert!(matches!(result, Err(DnsError::Timeout)));
    }

    #[tokio::test]
    async fn mock_resolver_normalizes_domains() {
        let resolver = MockResolver::new();
        resolver.add_mx("Example.COM.", vec!["mx1.example.com".into()]);

        let hosts = resolver.query_mx("example.com").await.unwrap();
        assert_eq!(hosts, vec!["mx1.example.com"]);
    }
}
