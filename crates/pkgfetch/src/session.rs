//! Repository sessions.
//!
//! A session owns the long-lived transport for one repository and the
//! mirror state that outlives single fetch calls: the configured strategy
//! and, for service discovery, the resolved mirror list.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::core::{MirrorSelector, service_name};
use crate::data::{FetchItem, FetchStatus, MirrorStrategy, SrvRecord};
use crate::effects::{Connector, Destination, EventSink, FetchPlan, MirrorResolver, NoResolver, TracingSink};
use crate::error::{FetchError, Result, TransportError};

/// A repository with its transport and mirror state.
///
/// Fetches take `&mut self`, so one session never runs two transfers at
/// once. Use one session per concurrent fetcher.
pub struct RepositorySession<C: Connector> {
    name:      String,
    url:       String,
    strategy:  MirrorStrategy,
    mirrors:   Option<Vec<SrvRecord>>,
    connector: C,
    resolver:  Arc<dyn MirrorResolver>,
    events:    Arc<dyn EventSink>,
    config:    FetchConfig,
    transport: Option<C::Transport>,
}

impl<C: Connector> RepositorySession<C> {
    /// A closed session fetching directly, with default configuration.
    pub fn new(name: impl Into<String>, url: impl Into<String>, connector: C) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            strategy: MirrorStrategy::Direct,
            mirrors: None,
            connector,
            resolver: Arc::new(NoResolver),
            events: Arc::new(TracingSink),
            config: FetchConfig::default(),
            transport: None,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: MirrorStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn MirrorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn url(&self) -> &str { &self.url }

    /// The active strategy. Service discovery that found nothing reads as
    /// [`MirrorStrategy::Direct`] from then on.
    pub fn strategy(&self) -> &MirrorStrategy { &self.strategy }

    /// Mirrors resolved by service discovery, once resolved.
    pub fn mirrors(&self) -> Option<&[SrvRecord]> { self.mirrors.as_deref() }

    pub fn config(&self) -> &FetchConfig { &self.config }

    pub fn is_open(&self) -> bool { self.transport.is_some() }

    /// Create the transport. Opening an open session does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        if matches!(self.strategy, MirrorStrategy::ServiceDiscovery)
            && let Err(e) = service_name(&self.url)
        {
            self.events.error(&e.to_string());
            return Err(e);
        }
        let transport = match self.connector.connect(&self.config.transport_config()) {
            Ok(transport) => transport,
            Err(e) => {
                let e = FetchError::from(e);
                warn!(repo = %self.name, "cannot open session: {e}");
                self.events.error(&e.to_string());
                return Err(e);
            },
        };
        self.transport = Some(transport);
        debug!(repo = %self.name, url = %self.url, "session opened");
        Ok(())
    }

    /// Release the transport. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!(repo = %self.name, "session closed");
        }
    }

    /// Forget resolved mirrors so the next fetch resolves again.
    ///
    /// A session that already fell back to direct fetching stays direct.
    pub fn reset_mirrors(&mut self) { self.mirrors = None }

    /// Fetch `item` into `dest`, opening the session first if needed.
    pub async fn fetch<D: Destination>(&mut self, item: &mut FetchItem, dest: &mut D) -> FetchStatus {
        self.fetch_with_cancel(item, dest, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), ending with [`FetchStatus::Cancelled`]
    /// once `cancel` fires.
    pub async fn fetch_with_cancel<D: Destination>(
        &mut self,
        item: &mut FetchItem,
        dest: &mut D,
        cancel: &CancellationToken,
    ) -> FetchStatus {
        if let Err(e) = self.open() {
            return FetchStatus::Fatal(e);
        }
        let selector = match self.selector(&item.url).await {
            Ok(selector) => selector,
            Err(e) => {
                self.events.error(&e.to_string());
                return FetchStatus::Fatal(e);
            },
        };
        let Some(transport) = self.transport.as_ref() else {
            return FetchStatus::Fatal(TransportError::Other("session is not open".to_string()).into());
        };

        let plan = FetchPlan {
            transport,
            config: &self.config,
            events: self.events.as_ref(),
            cancel,
        };
        plan.run(selector, item, dest).await
    }

    async fn selector(&mut self, item_url: &str) -> Result<MirrorSelector> {
        let item = Url::parse(item_url).map_err(|e| FetchError::invalid_url(item_url, e))?;
        if matches!(self.strategy, MirrorStrategy::ServiceDiscovery) {
            self.discover().await?;
        }
        match &self.strategy {
            MirrorStrategy::Direct => Ok(MirrorSelector::direct(item)),
            MirrorStrategy::StaticList(mirrors) => MirrorSelector::static_list(&self.url, &item, mirrors),
            MirrorStrategy::ServiceDiscovery => {
                let records = self.mirrors.clone().unwrap_or_default();
                MirrorSelector::endpoints(&self.url, &item, records)
            },
        }
    }

    /// Resolve the mirror list once per session. Nothing found switches
    /// the session to direct fetching for good.
    async fn discover(&mut self) -> Result<()> {
        if self.mirrors.is_some() {
            return Ok(());
        }
        let service = service_name(&self.url)?;
        let records = self.resolver.resolve_mirrors(&service).await;
        if records.is_empty() {
            let message = format!("No SRV record found for the repo '{}'", self.name);
            warn!(%service, "{message}");
            self.events.error(&message);
            self.strategy = MirrorStrategy::Direct;
        } else {
            info!(%service, count = records.len(), "resolved mirrors for {}", self.name);
            self.mirrors = Some(records);
        }
        Ok(())
    }
}

impl<C: Connector> Drop for RepositorySession<C> {
    fn drop(&mut self) { self.close() }
}
