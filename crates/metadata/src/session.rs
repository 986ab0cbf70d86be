// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # XMLA session
//!
//! The session is the connection core every metadata object and statement
//! shares: the request properties derived from configuration, the transport
//! and the worker pool. It owns no metadata objects, so the entity graph can
//! hold it strongly without forming reference cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace};
use xmla_olap_protocol::codec;
use xmla_olap_protocol::{RequestType, Restrictions, Row, XmlaResult};

use crate::context::Context;
use crate::handler::RowHandler;
use crate::pool::{PendingRequest, WorkerPool};
use crate::provider::{detect_batch_strategy, BatchLookupMode, BatchLookupStrategy, StrategySelector};
use crate::transport::{SoapAction, Transport};

/// Default member cache capacity (entries)
pub const DEFAULT_MEMBER_CACHE_CAPACITY: usize = 10_000;

/// Default level-member cache capacity (levels)
pub const DEFAULT_LEVEL_CACHE_CAPACITY: usize = 256;

/// Settings consumed by the session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Data-source descriptor; discovered from the server when absent
    pub data_source_info: Option<String>,
    /// Catalog used when a request has no catalog in its context
    pub catalog: Option<String>,
    pub locale: Option<String>,
    pub role: Option<String>,
    pub batch_lookup: BatchLookupMode,
    pub member_cache_capacity: usize,
    pub level_cache_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            data_source_info: None,
            catalog: None,
            locale: None,
            role: None,
            batch_lookup: BatchLookupMode::Auto,
            member_cache_capacity: DEFAULT_MEMBER_CACHE_CAPACITY,
            level_cache_capacity: DEFAULT_LEVEL_CACHE_CAPACITY,
        }
    }
}

impl SessionSettings {
    /// Builder method: set the data-source descriptor
    pub fn with_data_source_info(mut self, info: impl Into<String>) -> Self {
        self.data_source_info = Some(info.into());
        self
    }

    /// Builder method: set the default catalog
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Builder method: set the batch lookup mode
    pub fn with_batch_lookup(mut self, mode: BatchLookupMode) -> Self {
        self.batch_lookup = mode;
        self
    }

    /// Builder method: set the member cache capacity
    pub fn with_member_cache_capacity(mut self, capacity: usize) -> Self {
        self.member_cache_capacity = capacity;
        self
    }
}

/// Data-source description learned from the server
#[derive(Debug, Clone, Default)]
struct DataSource {
    info: Option<String>,
    provider_name: Option<String>,
}

/// Shared connection core: settings, transport and worker pool
pub struct XmlaSession {
    settings: SessionSettings,
    data_source: RwLock<DataSource>,
    transport: Arc<dyn Transport>,
    pool: WorkerPool,
    selector: StrategySelector,
    requests_sent: AtomicU64,
}

impl XmlaSession {
    /// Create a session without contacting the server
    pub fn new(
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
        pool: WorkerPool,
    ) -> Arc<Self> {
        Self::with_selector(settings, transport, pool, detect_batch_strategy)
    }

    /// Create a session with a custom provider detection function
    pub fn with_selector(
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
        pool: WorkerPool,
        selector: StrategySelector,
    ) -> Arc<Self> {
        let data_source = DataSource {
            info: settings.data_source_info.clone(),
            provider_name: None,
        };
        Arc::new(Self {
            settings,
            data_source: RwLock::new(data_source),
            transport,
            pool,
            selector,
            requests_sent: AtomicU64::new(0),
        })
    }

    /// Create a session, discovering the data source when none is configured
    pub fn open(
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
        pool: WorkerPool,
    ) -> XmlaResult<Arc<Self>> {
        let session = Self::new(settings, transport, pool);
        if session.settings.data_source_info.is_none() {
            session.discover_data_source()?;
        }
        info!(
            data_source = session.data_source_info().as_deref().unwrap_or("<none>"),
            "XMLA session opened"
        );
        Ok(session)
    }

    fn discover_data_source(self: &Arc<Self>) -> XmlaResult<()> {
        let context = Context::for_session(Arc::clone(self));
        let rows = self.discover(&context, RequestType::DiscoverDatasources, &Restrictions::new())?;
        if let Some(row) = rows.first() {
            let mut data_source = self.data_source.write();
            data_source.info = row
                .string("DataSourceInfo")
                .or_else(|| row.string("DataSourceName"));
            data_source.provider_name = row.string("ProviderName");
        }
        Ok(())
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Data-source descriptor sent with every request
    pub fn data_source_info(&self) -> Option<String> {
        self.data_source.read().info.clone()
    }

    /// Provider name reported by `DISCOVER_DATASOURCES`, if discovered
    pub fn provider_name(&self) -> Option<String> {
        self.data_source.read().provider_name.clone()
    }

    /// Catalog used when a context names none
    pub fn default_catalog(&self) -> Option<&str> {
        self.settings.catalog.as_deref()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of requests sent through this session
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Strategy for resolving a batch of member names
    pub fn batch_strategy(&self) -> BatchLookupStrategy {
        let description = {
            let data_source = self.data_source.read();
            format!(
                "{} {}",
                data_source.info.as_deref().unwrap_or_default(),
                data_source.provider_name.as_deref().unwrap_or_default()
            )
        };
        self.settings.batch_lookup.resolve(&description, self.selector)
    }

    /// Submit a request envelope to the worker pool
    pub fn send(&self, request: String, action: SoapAction) -> PendingRequest {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        trace!(request = %request, "XMLA request");
        let transport = Arc::clone(&self.transport);
        self.pool
            .submit(async move { transport.send(request, action).await })
    }

    /// Run a Discover request and return its rows in document order
    pub fn discover(
        &self,
        context: &Context,
        request_type: RequestType,
        restrictions: &Restrictions,
    ) -> XmlaResult<Vec<Row>> {
        let catalog = if request_type.is_catalog_scoped() {
            context
                .catalog_name()
                .map(str::to_string)
                .or_else(|| self.settings.catalog.clone())
        } else {
            None
        };
        let data_source = self.data_source_info();
        let properties = codec::discover_properties(
            data_source.as_deref(),
            catalog.as_deref(),
            self.settings.locale.as_deref(),
        );
        let request = codec::encode_discover(request_type, restrictions, &properties);
        debug!(
            request_type = %request_type,
            restrictions = restrictions.len(),
            "XMLA discover"
        );

        let pending = self.send(request.clone(), SoapAction::Discover);
        let bytes = pending.wait(None)?;
        codec::decode_discover(&bytes, &request)
    }

    /// Run a Discover request and hand each row to a handler, then sort
    pub fn populate_list<T, H>(
        &self,
        context: &Context,
        handler: &H,
        restrictions: &Restrictions,
        list: &mut Vec<T>,
    ) -> XmlaResult<()>
    where
        H: RowHandler<T> + ?Sized,
    {
        let rows = self.discover(context, handler.request_type(), restrictions)?;
        for row in &rows {
            handler.handle(row, context, list)?;
        }
        handler.sort(context, list)
    }

    /// Build an Execute request for an MDX statement and submit it
    ///
    /// Returns the request text alongside the pending handle so the response
    /// can be decoded with the request attached to any fault.
    pub fn execute(&self, mdx: &str, catalog: Option<&str>) -> (String, PendingRequest) {
        let data_source = self.data_source_info();
        let properties = codec::execute_properties(
            data_source.as_deref(),
            catalog.or(self.settings.catalog.as_deref()),
            self.settings.locale.as_deref(),
            self.settings.role.as_deref(),
        );
        let request = codec::encode_execute(mdx, &properties);
        debug!(statement_len = mdx.len(), "XMLA execute");
        let pending = self.send(request.clone(), SoapAction::Execute);
        (request, pending)
    }
}

impl std::fmt::Debug for XmlaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlaSession")
            .field("settings", &self.settings)
            .field("requests_sent", &self.requests_sent())
            .finish()
    }
}
