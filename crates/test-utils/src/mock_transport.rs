// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Scripted transport for testing
//!
//! Responses are routed by rowset (Discover) or statement fragment (Execute),
//! optionally narrowed by restriction values. Every request is recorded so
//! tests can assert on what was sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use xmla_olap_metadata::{SoapAction, Transport};
use xmla_olap_protocol::{XmlElement, XmlaError, XmlaResult};

use crate::fixtures::SoapFixtures;

/// What a route answers with
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body(Vec<u8>),
    Error(XmlaError),
}

/// One scripted answer
#[derive(Debug, Clone)]
pub struct MockRoute {
    action: SoapAction,
    request_type: Option<String>,
    statement_fragment: Option<String>,
    restrictions: Vec<(String, Vec<String>)>,
    response: MockResponse,
    remaining: Option<usize>,
}

impl MockRoute {
    /// Route for a Discover request of the given rowset
    pub fn discover(request_type: impl Into<String>) -> Self {
        Self {
            action: SoapAction::Discover,
            request_type: Some(request_type.into()),
            statement_fragment: None,
            restrictions: Vec::new(),
            response: MockResponse::Body(SoapFixtures::empty_rowset()),
            remaining: None,
        }
    }

    /// Route for an Execute request whose statement contains `fragment`
    pub fn execute(fragment: impl Into<String>) -> Self {
        Self {
            action: SoapAction::Execute,
            request_type: None,
            statement_fragment: Some(fragment.into()),
            restrictions: Vec::new(),
            response: MockResponse::Body(SoapFixtures::empty_cell_set()),
            remaining: None,
        }
    }

    /// Only match requests whose restriction carries this value
    pub fn restriction(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.restrictions.push((name.into(), vec![value.into()]));
        self
    }

    /// Only match requests whose restriction carries all of these values
    pub fn restriction_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrictions
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Answer with a response body
    pub fn respond(mut self, body: Vec<u8>) -> Self {
        self.response = MockResponse::Body(body);
        self
    }

    /// Answer with a transport-level error
    pub fn fail(mut self, error: XmlaError) -> Self {
        self.response = MockResponse::Error(error);
        self
    }

    /// Stop matching after `n` requests
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    fn matches(&self, request: &RecordedRequest) -> bool {
        if self.action != request.action || self.remaining == Some(0) {
            return false;
        }
        if let Some(request_type) = &self.request_type {
            if request.request_type.as_deref() != Some(request_type.as_str()) {
                return false;
            }
        }
        if let Some(fragment) = &self.statement_fragment {
            match &request.statement {
                Some(statement) if statement.contains(fragment.as_str()) => {}
                _ => return false,
            }
        }
        self.restrictions.iter().all(|(name, expected)| {
            let actual = request.restriction_values(name);
            expected.iter().all(|value| actual.contains(value))
        })
    }
}

/// A request as the transport received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub action: SoapAction,
    pub request_type: Option<String>,
    pub statement: Option<String>,
    pub body: String,
    restrictions: Vec<(String, Vec<String>)>,
    properties: Vec<(String, String)>,
}

impl RecordedRequest {
    fn parse(body: String, action: SoapAction) -> Self {
        let mut recorded = Self {
            action,
            request_type: None,
            statement: None,
            body,
            restrictions: Vec::new(),
            properties: Vec::new(),
        };
        let Ok(envelope) = XmlElement::parse(recorded.body.as_bytes()) else {
            return recorded;
        };
        let Some(method) = envelope.child("Body").and_then(|b| b.children().first()) else {
            return recorded;
        };

        recorded.request_type = method.child_text("RequestType").map(str::to_string);
        recorded.statement = method
            .find(&["Command", "Statement"])
            .map(|s| s.text().to_string());
        if let Some(list) = method.find(&["Restrictions", "RestrictionList"]) {
            for restriction in list.children() {
                let values = if restriction.children().is_empty() {
                    vec![restriction.text().to_string()]
                } else {
                    restriction
                        .children_named("Value")
                        .map(|v| v.text().to_string())
                        .collect()
                };
                recorded
                    .restrictions
                    .push((restriction.name().to_string(), values));
            }
        }
        if let Some(list) = method.find(&["Properties", "PropertyList"]) {
            for property in list.children() {
                recorded
                    .properties
                    .push((property.name().to_string(), property.text().to_string()));
            }
        }
        recorded
    }

    /// Single value of a restriction
    pub fn restriction(&self, name: &str) -> Option<&str> {
        self.restrictions
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// All values of a restriction; empty when absent
    pub fn restriction_values(&self, name: &str) -> Vec<String> {
        self.restrictions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.clone())
            .unwrap_or_default()
    }

    pub fn has_restriction(&self, name: &str) -> bool {
        self.restrictions.iter().any(|(n, _)| n == name)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport that answers from a script instead of the network
///
/// Unmatched Discover requests get an empty rowset; unmatched Execute
/// requests get a SOAP fault.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route; routes are tried in the order they were added
    pub fn route(self, route: MockRoute) -> Self {
        self.routes.lock().push(route);
        self
    }

    /// Add a route that takes precedence over every existing one
    pub fn route_first(self, route: MockRoute) -> Self {
        self.routes.lock().insert(0, route);
        self
    }

    /// Answer Discover requests of `request_type` with `body`
    pub fn on_discover(self, request_type: &str, body: Vec<u8>) -> Self {
        self.route(MockRoute::discover(request_type).respond(body))
    }

    /// Answer Execute requests containing `fragment` with `body`
    pub fn on_execute(self, fragment: &str, body: Vec<u8>) -> Self {
        self.route(MockRoute::execute(fragment).respond(body))
    }

    /// Hold every request this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a route to a transport that is already shared
    pub fn push_route(&self, route: MockRoute) {
        self.routes.lock().push(route);
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests of one rowset
    pub fn discover_requests(&self, request_type: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.request_type.as_deref() == Some(request_type))
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn answer(&self, request: &RecordedRequest) -> MockResponse {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|route| route.matches(request)) {
            Some(route) => {
                if let Some(remaining) = route.remaining.as_mut() {
                    *remaining -= 1;
                }
                route.response.clone()
            }
            None => match request.action {
                SoapAction::Discover => MockResponse::Body(SoapFixtures::empty_rowset()),
                SoapAction::Execute => MockResponse::Body(SoapFixtures::fault(&format!(
                    "no scripted response for statement {:?}",
                    request.statement
                ))),
            },
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: String, action: SoapAction) -> XmlaResult<Vec<u8>> {
        let recorded = RecordedRequest::parse(request, action);
        self.requests.lock().push(recorded.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.answer(&recorded) {
            MockResponse::Body(body) => Ok(body),
            MockResponse::Error(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmla_olap_protocol::codec;
    use xmla_olap_protocol::{RequestType, Restrictions};

    fn discover_body(request_type: RequestType, restrictions: Restrictions) -> String {
        let properties = codec::discover_properties(Some("Provider=Mondrian"), Some("FoodMart"), None);
        codec::encode_discover(request_type, &restrictions, &properties)
    }

    #[test]
    fn test_recorded_request_parses_restrictions() {
        let body = discover_body(
            RequestType::MdschemaMembers,
            Restrictions::new()
                .with("CUBE_NAME", "Sales")
                .with_many("MEMBER_UNIQUE_NAME", ["[a]", "[b]"]),
        );
        let recorded = RecordedRequest::parse(body, SoapAction::Discover);
        assert_eq!(recorded.request_type.as_deref(), Some("MDSCHEMA_MEMBERS"));
        assert_eq!(recorded.restriction("CUBE_NAME"), Some("Sales"));
        assert_eq!(recorded.restriction_values("MEMBER_UNIQUE_NAME"), ["[a]", "[b]"]);
        assert_eq!(recorded.property("Catalog"), Some("FoodMart"));
    }

    #[test]
    fn test_routes_match_in_order_and_expire() {
        let transport = MockTransport::new()
            .route(
                MockRoute::discover("MDSCHEMA_CUBES")
                    .restriction("CUBE_NAME", "Sales")
                    .respond(b"sales".to_vec())
                    .times(1),
            )
            .on_discover("MDSCHEMA_CUBES", b"any".to_vec());

        let sales = RecordedRequest::parse(
            discover_body(RequestType::MdschemaCubes, Restrictions::new().with("CUBE_NAME", "Sales")),
            SoapAction::Discover,
        );
        let answer = |r: &RecordedRequest| match transport.answer(r) {
            MockResponse::Body(body) => body,
            MockResponse::Error(e) => panic!("unexpected error {e}"),
        };
        assert_eq!(answer(&sales), b"sales");
        assert_eq!(answer(&sales), b"any");
    }
}
