// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! XMLA-specific test helpers and custom assertions

use xmla_olap_metadata::{Member, MetadataElement};
use xmla_olap_protocol::XmlaError;

use crate::mock_transport::{MockTransport, RecordedRequest};

/// Custom assertion helpers for XMLA testing
pub struct XmlaAssertions;

impl XmlaAssertions {
    /// Assert that exactly `count` Discover requests of `request_type` were sent
    pub fn assert_discover_count(transport: &MockTransport, request_type: &str, count: usize) {
        let sent = transport.discover_requests(request_type).len();
        assert_eq!(
            sent, count,
            "Expected {} {} request(s), found {}",
            count, request_type, sent
        );
    }

    /// Assert that a request carries a restriction with the given single value
    pub fn assert_restriction(request: &RecordedRequest, name: &str, value: &str) {
        assert_eq!(
            request.restriction(name),
            Some(value),
            "Restriction '{}' mismatch in request:\n{}",
            name,
            request.body
        );
    }

    /// Assert that a request carries no restriction named `name`
    pub fn assert_no_restriction(request: &RecordedRequest, name: &str) {
        assert!(
            !request.has_restriction(name),
            "Unexpected restriction '{}' in request:\n{}",
            name,
            request.body
        );
    }

    /// Assert a member's unique name and name
    pub fn assert_member(member: &Member, unique_name: &str, name: &str) {
        assert_eq!(member.unique_name(), unique_name, "Member unique name mismatch");
        assert_eq!(member.name(), name, "Member name mismatch");
    }

    /// Assert that an error is a server fault whose message contains `fragment`
    pub fn assert_server_fault(error: &XmlaError, fragment: &str) {
        match error.root() {
            XmlaError::ServerFault { fault, .. } => {
                assert!(
                    fault.contains(fragment),
                    "Expected fault containing '{}', found '{}'",
                    fragment,
                    fault
                );
            }
            other => panic!("Expected ServerFault, found {:?}", other),
        }
    }

    /// Assert that an error (or its root cause) is `Cancelled`
    pub fn assert_cancelled(error: &XmlaError) {
        assert!(error.is_cancelled(), "Expected Cancelled, found {:?}", error);
    }

    /// Assert that an error (or its root cause) is `Timeout`
    pub fn assert_timeout(error: &XmlaError) {
        assert!(error.is_timeout(), "Expected Timeout, found {:?}", error);
    }
}
