// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Transport trait
//!
//! The seam between the protocol client and the network. The production
//! implementation posts SOAP envelopes over HTTP; tests plug in a scripted
//! double through the same trait.

use xmla_olap_protocol::codec::{DISCOVER_ACTION, EXECUTE_ACTION};
use xmla_olap_protocol::XmlaResult;

/// Which XMLA method a request invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapAction {
    Discover,
    Execute,
}

impl SoapAction {
    /// Value of the `SOAPAction` HTTP header
    pub fn header_value(&self) -> &'static str {
        match self {
            SoapAction::Discover => DISCOVER_ACTION,
            SoapAction::Execute => EXECUTE_ACTION,
        }
    }
}

/// Sends one request envelope and returns the raw response body
///
/// Implementations must map I/O failures to `XmlaError::Transport`. A
/// response carrying a SOAP Fault is still a successful send; the codec
/// turns it into an error.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: String, action: SoapAction) -> XmlaResult<Vec<u8>>;
}
