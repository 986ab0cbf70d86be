// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for the XMLA OLAP client
//!
//! This crate provides common testing components including:
//! - A scripted [`MockTransport`] that records every request
//! - SOAP envelope builders and FoodMart sample responses
//! - XMLA-specific assertions on recorded requests and errors

pub mod assertions;
pub mod fixtures;
pub mod mock_transport;

// Re-exports for convenience
pub use assertions::XmlaAssertions;
pub use fixtures::{FoodMart, SoapFixtures};
pub use mock_transport::{MockResponse, MockRoute, MockTransport, RecordedRequest};
