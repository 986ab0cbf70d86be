// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement executor
//!
//! A statement runs one MDX query at a time and keeps at most one open
//! [`CellSet`]. Executing again closes the previous cell set first.
//!
//! The state lock is only held while swapping the pending request and cell
//! set references, never while waiting on the network, so [`Statement::cancel`]
//! and [`Statement::close`] can interrupt a query blocked in
//! [`Statement::execute`] from another thread.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use xmla_olap_metadata::PendingRequest;
use xmla_olap_protocol::{codec, XmlaError, XmlaResult};

use crate::cellset::CellSet;
use crate::config::timeout_from_secs;
use crate::connection::XmlaConnection;
use crate::mdx::MdxStatement;

#[derive(Default)]
struct StatementState {
    pending: Option<Arc<PendingRequest>>,
    cell_set: Option<Arc<CellSet>>,
}

/// Executes MDX queries on a connection
pub struct Statement {
    connection: Arc<XmlaConnection>,
    state: Mutex<StatementState>,
    timeout_secs: AtomicI64,
    closed: AtomicBool,
}

impl Statement {
    pub(crate) fn new(connection: Arc<XmlaConnection>) -> Self {
        let timeout_secs = connection.config().query_timeout_secs;
        Self {
            connection,
            state: Mutex::new(StatementState::default()),
            timeout_secs: AtomicI64::new(timeout_secs),
            closed: AtomicBool::new(false),
        }
    }

    pub fn connection(&self) -> &Arc<XmlaConnection> {
        &self.connection
    }

    /// Set the query timeout in seconds; zero or negative waits indefinitely
    pub fn set_query_timeout(&self, secs: i64) {
        self.timeout_secs.store(secs, Ordering::Relaxed);
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.timeout_secs.load(Ordering::Relaxed))
    }

    /// Run a query and return its cell set
    ///
    /// Blocks until the response arrives, the query timeout elapses
    /// (`XmlaError::Timeout`, the request keeps running) or the statement is
    /// cancelled (`XmlaError::Cancelled`).
    pub fn execute(&self, mdx: &str) -> XmlaResult<Arc<CellSet>> {
        self.ensure_open()?;
        self.connection.ensure_open()?;

        let previous = self.state.lock().cell_set.take();
        if let Some(previous) = previous {
            previous.close();
        }

        let catalog = self.connection.config().catalog.clone();
        let (request, pending) = self.connection.session().execute(mdx, catalog.as_deref());
        let pending = Arc::new(pending);
        {
            let mut state = self.state.lock();
            if let Some(stale) = state.pending.replace(Arc::clone(&pending)) {
                stale.cancel();
            }
        }
        // close() may have run between the check above and the swap
        if self.is_closed() {
            pending.cancel();
        }

        let timeout = self.query_timeout();
        debug!(?timeout, "waiting for execute response");
        let bytes = match pending.wait(timeout) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.is_timeout() {
                    warn!(?timeout, "query timed out; the request is still running");
                } else {
                    self.release(&pending);
                }
                return Err(err);
            }
        };
        self.release(&pending);

        let root = codec::decode_execute(&bytes, &request)?;
        let cell_set = Arc::new(CellSet::parse(&root, Arc::clone(&self.connection))?);

        let mut state = self.state.lock();
        if self.is_closed() {
            cell_set.close();
            return Err(XmlaError::Closed("statement closed during execution".to_string()));
        }
        state.cell_set = Some(Arc::clone(&cell_set));
        Ok(cell_set)
    }

    /// Run a query given as a parse tree or any other [`MdxStatement`]
    pub fn execute_query(&self, query: &dyn MdxStatement) -> XmlaResult<Arc<CellSet>> {
        self.execute(&query.to_mdx())
    }

    fn release(&self, pending: &Arc<PendingRequest>) {
        let mut state = self.state.lock();
        if state.pending.as_ref().is_some_and(|p| Arc::ptr_eq(p, pending)) {
            state.pending = None;
        }
    }

    /// Interrupt the running query, if any
    ///
    /// Threads blocked in [`Statement::execute`] fail with
    /// `XmlaError::Cancelled`. Cancelling again, or with nothing running,
    /// does nothing.
    pub fn cancel(&self) {
        let pending = self.state.lock().pending.clone();
        if let Some(pending) = pending {
            if pending.cancel() {
                debug!("statement cancelled");
            }
        }
    }

    /// Whether a request has been submitted and not yet answered
    pub fn is_executing(&self) -> bool {
        self.state
            .lock()
            .pending
            .as_ref()
            .is_some_and(|p| !p.is_finished() && !p.is_cancelled())
    }

    /// The open cell set of the last successful query
    pub fn current_cell_set(&self) -> Option<Arc<CellSet>> {
        self.state.lock().cell_set.clone()
    }

    /// Close the statement, cancelling any running query and closing its cell set
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let (pending, cell_set) = {
            let mut state = self.state.lock();
            (state.pending.take(), state.cell_set.take())
        };
        if let Some(pending) = pending {
            pending.cancel();
        }
        if let Some(cell_set) = cell_set {
            cell_set.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> XmlaResult<()> {
        if self.is_closed() {
            Err(XmlaError::Closed("statement is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("closed", &self.is_closed())
            .field("executing", &self.is_executing())
            .field("timeout", &self.query_timeout())
            .finish()
    }
}
