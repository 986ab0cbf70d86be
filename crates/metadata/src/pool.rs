// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Worker pool and pending requests
//!
//! Network requests run as tasks on a tokio runtime shared by every
//! connection that is handed the same [`WorkerPool`]. Callers block on a
//! [`PendingRequest`] until the response arrives, the wait times out, or the
//! request is cancelled.
//!
//! A timeout abandons the wait only; the task keeps running until it
//! finishes or [`PendingRequest::cancel`] aborts it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::AbortHandle;
use tracing::debug;
use xmla_olap_protocol::{XmlaError, XmlaResult};

/// Shared pool that runs network requests
///
/// Cloning is cheap; clones submit to the same runtime. Do not wait on a
/// [`PendingRequest`] from inside one of the pool's own tasks.
#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    // Keeps an owned runtime alive for as long as any clone exists
    _runtime: Option<Arc<Runtime>>,
}

impl WorkerPool {
    /// Create a pool backed by its own multi-threaded runtime
    pub fn new() -> XmlaResult<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("xmla-worker")
            .enable_all()
            .build()
            .map_err(|e| XmlaError::transport("failed to start worker runtime", e))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Create a pool that submits to an existing runtime
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Submit a request future and get a handle to wait on or cancel it
    pub fn submit<F>(&self, request: F) -> PendingRequest
    where
        F: Future<Output = XmlaResult<Vec<u8>>> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let done = Arc::new(AtomicBool::new(false));
        let task_done = Arc::clone(&done);
        let task = self.handle.spawn(async move {
            let result = request.await;
            task_done.store(true, Ordering::Release);
            // The waiter may have given up; nothing to do then.
            let _ = tx.send(result);
        });
        PendingRequest {
            receiver: rx,
            abort: task.abort_handle(),
            done,
            cancelled: AtomicBool::new(false),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("owns_runtime", &self._runtime.is_some())
            .finish()
    }
}

/// Cancellable handle to an in-flight request
pub struct PendingRequest {
    receiver: Receiver<XmlaResult<Vec<u8>>>,
    abort: AbortHandle,
    done: Arc<AtomicBool>,
    cancelled: AtomicBool,
}

impl PendingRequest {
    /// Block until the response arrives
    ///
    /// `None` waits indefinitely. On timeout the request keeps running and
    /// `XmlaError::Timeout` is returned. If the request is cancelled while
    /// waiting, `XmlaError::Cancelled` is returned.
    pub fn wait(&self, timeout: Option<Duration>) -> XmlaResult<Vec<u8>> {
        if self.is_cancelled() {
            return Err(XmlaError::Cancelled);
        }
        let received = match timeout {
            None => self.receiver.recv().map_err(|_| self.ended_without_result()),
            Some(limit) => self.receiver.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => XmlaError::Timeout(limit),
                RecvTimeoutError::Disconnected => self.ended_without_result(),
            }),
        };
        let response = received?;
        // cancel() may have won the race against a task that had already sent
        if self.is_cancelled() {
            return Err(XmlaError::Cancelled);
        }
        response
    }

    fn ended_without_result(&self) -> XmlaError {
        if self.is_cancelled() {
            XmlaError::Cancelled
        } else {
            XmlaError::Transport {
                message: "request task ended without producing a response".to_string(),
                source: None,
            }
        }
    }

    /// Interrupt the request
    ///
    /// Returns `true` if this call cancelled it; cancelling an already
    /// cancelled or finished request does nothing and returns `false`.
    pub fn cancel(&self) -> bool {
        if self.is_finished() || self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        debug!("cancelling in-flight XMLA request");
        self.abort.abort();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the response (or a transport error) has been produced
    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("finished", &self.is_finished())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
