// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for XMLA operations
//!
//! Every failure in the codec, the metadata layer and the statement executor is
//! reported as an [`XmlaError`]. Network and parse failures are wrapped at the
//! boundary; nothing in this workspace retries on its own.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for XMLA operations
pub type XmlaResult<T> = Result<T, XmlaError>;

/// Shared, clonable cause of a wrapped foreign error
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// Errors that can occur while talking to an XMLA provider
#[derive(Debug, Error, Clone)]
pub enum XmlaError {
    /// The server could not be reached or the exchange failed mid-flight
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// The response was not XML, or lacked the expected structure
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The server answered with a SOAP Fault
    #[error("XMLA provider gave exception: {fault}\nRequest was:\n{request}")]
    ServerFault { fault: String, request: String },

    /// Waiting for a result exceeded the configured budget
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The request was cancelled while a caller was waiting on it
    #[error("Request was cancelled")]
    Cancelled,

    /// A lookup by unique name matched more than one entity
    #[error("More than one member returned for unique name '{name}' ({count} found)")]
    AmbiguousLookup { name: String, count: usize },

    /// Programming error, such as re-entrant population of a deferred list
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A named entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The statement, cell set or connection is closed, or a parent entity was dropped
    #[error("Closed: {0}")]
    Closed(String),

    /// A cell ordinal or coordinate falls outside the cell set
    #[error("Invalid cell coordinate: {0}")]
    InvalidCoordinate(String),

    /// Another error, annotated with where it happened
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<XmlaError>,
    },
}

impl XmlaError {
    /// Wrap a foreign error as a transport failure, keeping it as the cause
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        XmlaError::Transport {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Annotate this error with the context it originated from
    pub fn with_context(self, context: impl Into<String>) -> Self {
        XmlaError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any context wrappers removed
    pub fn root(&self) -> &XmlaError {
        match self {
            XmlaError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), XmlaError::Cancelled)
    }

    /// Whether this error (or the error it wraps) is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), XmlaError::Timeout(_))
    }
}

impl From<quick_xml::Error> for XmlaError {
    fn from(err: quick_xml::Error) -> Self {
        XmlaError::MalformedResponse(err.to_string())
    }
}
