// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection
//!
//! A connection opens an [`XmlaSession`] and owns the root of the metadata
//! graph: the catalog list. Everything below a catalog holds its parent
//! weakly, so metadata objects stay usable only while their connection is
//! alive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use xmla_olap_metadata::{
    catalog_list, Catalog, Cube, DeferredNamedList, MetadataElement, Transport, WorkerPool,
    XmlaSession,
};
use xmla_olap_protocol::{XmlaError, XmlaResult};

use crate::config::XmlaConfig;
use crate::http::HttpTransport;
use crate::statement::Statement;

/// An open connection to an XMLA provider
pub struct XmlaConnection {
    config: XmlaConfig,
    session: Arc<XmlaSession>,
    catalogs: DeferredNamedList<Arc<Catalog>>,
    closed: AtomicBool,
}

impl XmlaConnection {
    /// Connect over HTTP with a private worker pool
    pub fn open(config: XmlaConfig) -> XmlaResult<Arc<Self>> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::open_with(config, transport, WorkerPool::new()?)
    }

    /// Connect through a given transport and worker pool
    ///
    /// The configured catalog, if any, is resolved eagerly so a misspelled
    /// catalog fails here rather than on first use.
    pub fn open_with(
        config: XmlaConfig,
        transport: Arc<dyn Transport>,
        pool: WorkerPool,
    ) -> XmlaResult<Arc<Self>> {
        let session = XmlaSession::open(config.session_settings(), transport, pool)?;
        let catalogs = catalog_list(&session);
        let connection = Arc::new(Self {
            config,
            session,
            catalogs,
            closed: AtomicBool::new(false),
        });
        if let Some(name) = connection.config.catalog.as_deref() {
            connection.catalog(name)?;
        }
        info!(
            server = %connection.config.server_url,
            catalog = connection.config.catalog.as_deref().unwrap_or("<default>"),
            "XMLA connection opened"
        );
        Ok(connection)
    }

    pub fn config(&self) -> &XmlaConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<XmlaSession> {
        &self.session
    }

    /// Catalogs on the server, fetched on first access
    pub fn catalogs(&self) -> &DeferredNamedList<Arc<Catalog>> {
        &self.catalogs
    }

    pub fn catalog(&self, name: &str) -> XmlaResult<Arc<Catalog>> {
        self.ensure_open()?;
        self.catalogs
            .get_by_name(name)?
            .ok_or_else(|| XmlaError::NotFound(format!("no catalog named '{}'", name)))
    }

    /// The configured catalog, or the first one the server reports
    pub fn current_catalog(&self) -> XmlaResult<Arc<Catalog>> {
        match self.config.catalog.as_deref() {
            Some(name) => self.catalog(name),
            None => {
                self.ensure_open()?;
                self.catalogs
                    .get(0)?
                    .ok_or_else(|| XmlaError::NotFound("server reports no catalogs".to_string()))
            }
        }
    }

    /// Cube by name or unique name, searched across the current catalog's schemas
    pub fn find_cube(&self, name: &str) -> XmlaResult<Option<Arc<Cube>>> {
        let catalog = self.current_catalog()?;
        for schema in catalog.schemas().to_vec()? {
            let found = schema
                .cubes()
                .to_vec()?
                .into_iter()
                .find(|cube| cube.name() == name || cube.unique_name() == name);
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// New statement whose query timeout starts from the configured one
    pub fn create_statement(self: &Arc<Self>) -> XmlaResult<Statement> {
        self.ensure_open()?;
        Ok(Statement::new(Arc::clone(self)))
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(server = %self.config.server_url, "XMLA connection closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> XmlaResult<()> {
        if self.is_closed() {
            Err(XmlaError::Closed("connection is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for XmlaConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlaConnection")
            .field("server_url", &self.config.server_url)
            .field("catalog", &self.config.catalog)
            .field("closed", &self.is_closed())
            .finish()
    }
}
