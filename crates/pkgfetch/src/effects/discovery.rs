use std::collections::HashMap;

use async_trait::async_trait;

use crate::data::SrvRecord;

/// Resolves a service name such as `_http._tcp.pkg.example.org` to mirrors.
///
/// Records come back in the order they should be tried. An empty list means
/// the service is not advertised; resolution failures are reported the same
/// way.
#[async_trait]
pub trait MirrorResolver: Send + Sync {
    async fn resolve_mirrors(&self, service: &str) -> Vec<SrvRecord>;
}

/// Resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

#[async_trait]
impl MirrorResolver for NoResolver {
    async fn resolve_mirrors(&self, _service: &str) -> Vec<SrvRecord> { Vec::new() }
}

/// Resolver backed by a fixed table, for static deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    records: HashMap<String, Vec<SrvRecord>>,
}

impl StaticResolver {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>, records: Vec<SrvRecord>) -> Self {
        self.records.insert(service.into(), records);
        self
    }
}

#[async_trait]
impl MirrorResolver for StaticResolver {
    async fn resolve_mirrors(&self, service: &str) -> Vec<SrvRecord> {
        self.records.get(service).cloned().unwrap_or_default()
    }
}
