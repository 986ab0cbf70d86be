// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Discover / Execute wire codec
//!
//! Builds SOAP 1.1 request envelopes and decodes provider responses.
//!
//! ## Request shape
//!
//! ```text
//! Envelope/Body/Discover
//!     RequestType            MDSCHEMA_CUBES
//!     Restrictions/RestrictionList/<NAME>value</NAME> ...
//!     Properties/PropertyList/<NAME>value</NAME> ...
//!
//! Envelope/Body/Execute
//!     Command/Statement      SELECT ... FROM [Sales]
//!     Properties/PropertyList/...
//! ```
//!
//! Multi-valued restrictions are written as repeated `Value` children of the
//! restriction element.
//!
//! ## Faults
//!
//! A `Fault` element in the body, or an `Exception`/`Messages/Error` pair in
//! the returned root, is reported as [`XmlaError::ServerFault`] carrying the
//! server's message and the original request text.

use quick_xml::escape::escape;
use tracing::trace;

use crate::dom::XmlElement;
use crate::error::{XmlaError, XmlaResult};
use crate::request::{PropertyList, RequestType, RestrictionValue, Restrictions};
use crate::rowset::Row;

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.1 encoding style
pub const SOAP_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// XMLA method namespace
pub const XMLA_NS: &str = "urn:schemas-microsoft-com:xml-analysis";

/// Namespace of multidimensional (Execute) result data
pub const MDDATASET_NS: &str = "urn:schemas-microsoft-com:xml-analysis:mddataset";

/// Namespace of rowset (Discover) result data
pub const ROWSET_NS: &str = "urn:schemas-microsoft-com:xml-analysis:rowset";

/// `SOAPAction` header value for Discover
pub const DISCOVER_ACTION: &str = "\"urn:schemas-microsoft-com:xml-analysis:Discover\"";

/// `SOAPAction` header value for Execute
pub const EXECUTE_ACTION: &str = "\"urn:schemas-microsoft-com:xml-analysis:Execute\"";

/// Escape text for inclusion in element content
pub fn xml_escape(text: &str) -> String {
    escape(text).into_owned()
}

fn envelope_open(buf: &mut String) {
    buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    buf.push_str("<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"");
    buf.push_str(SOAP_ENV_NS);
    buf.push_str("\" SOAP-ENV:encodingStyle=\"");
    buf.push_str(SOAP_ENCODING_NS);
    buf.push_str("\">\n  <SOAP-ENV:Body>\n");
}

fn envelope_close(buf: &mut String) {
    buf.push_str("  </SOAP-ENV:Body>\n</SOAP-ENV:Envelope>");
}

fn write_element(buf: &mut String, indent: &str, name: &str, value: &str) {
    buf.push_str(indent);
    buf.push('<');
    buf.push_str(name);
    buf.push('>');
    buf.push_str(&xml_escape(value));
    buf.push_str("</");
    buf.push_str(name);
    buf.push_str(">\n");
}

fn write_properties(buf: &mut String, properties: &PropertyList) {
    buf.push_str("      <Properties>\n        <PropertyList>\n");
    for (name, value) in properties.iter() {
        write_element(buf, "          ", name, value);
    }
    buf.push_str("        </PropertyList>\n      </Properties>\n");
}

/// Build a Discover request envelope
pub fn encode_discover(
    request_type: RequestType,
    restrictions: &Restrictions,
    properties: &PropertyList,
) -> String {
    let mut buf = String::with_capacity(1024);
    envelope_open(&mut buf);
    buf.push_str("    <Discover xmlns=\"");
    buf.push_str(XMLA_NS);
    buf.push_str("\">\n");
    write_element(&mut buf, "      ", "RequestType", request_type.as_str());

    buf.push_str("      <Restrictions>\n        <RestrictionList>\n");
    for restriction in restrictions.iter() {
        match &restriction.value {
            RestrictionValue::Single(value) => {
                write_element(&mut buf, "          ", &restriction.name, value);
            }
            RestrictionValue::Multiple(values) => {
                buf.push_str("          <");
                buf.push_str(&restriction.name);
                buf.push_str(">\n");
                for value in values {
                    write_element(&mut buf, "            ", "Value", value);
                }
                buf.push_str("          </");
                buf.push_str(&restriction.name);
                buf.push_str(">\n");
            }
        }
    }
    buf.push_str("        </RestrictionList>\n      </Restrictions>\n");

    write_properties(&mut buf, properties);
    buf.push_str("    </Discover>\n");
    envelope_close(&mut buf);
    buf
}

/// Build an Execute request envelope for an MDX statement
///
/// The properties should carry `Format=Multidimensional` and
/// `AxisFormat=TupleFormat`; see [`execute_properties`].
pub fn encode_execute(statement: &str, properties: &PropertyList) -> String {
    let mut buf = String::with_capacity(512 + statement.len());
    envelope_open(&mut buf);
    buf.push_str("    <Execute xmlns=\"");
    buf.push_str(XMLA_NS);
    buf.push_str("\">\n      <Command>\n");
    write_element(&mut buf, "        ", "Statement", statement);
    buf.push_str("      </Command>\n");
    write_properties(&mut buf, properties);
    buf.push_str("    </Execute>\n");
    envelope_close(&mut buf);
    buf
}

/// Standard property list for a Discover request
pub fn discover_properties(
    data_source_info: Option<&str>,
    catalog: Option<&str>,
    locale: Option<&str>,
) -> PropertyList {
    PropertyList::new()
        .with_opt("DataSourceInfo", data_source_info)
        .with_opt("Catalog", catalog)
        .with_opt("LocaleIdentifier", locale)
        .with("Content", "SchemaData")
}

/// Standard property list for an Execute request
pub fn execute_properties(
    data_source_info: Option<&str>,
    catalog: Option<&str>,
    locale: Option<&str>,
    roles: Option<&str>,
) -> PropertyList {
    PropertyList::new()
        .with_opt("Catalog", catalog)
        .with_opt("DataSourceInfo", data_source_info)
        .with("Format", "Multidimensional")
        .with("AxisFormat", "TupleFormat")
        .with_opt("LocaleIdentifier", locale)
        .with_opt("Roles", roles)
}

/// Parse a response envelope and return the element inside its body
///
/// Fails with [`XmlaError::ServerFault`] when the body holds a SOAP Fault.
pub fn decode_response(bytes: &[u8], request: &str) -> XmlaResult<XmlElement> {
    if tracing::enabled!(tracing::Level::TRACE) {
        trace!(response = %String::from_utf8_lossy(bytes), "XMLA response");
    }
    let envelope = XmlElement::parse(bytes)?;
    if envelope.name() != "Envelope" {
        return Err(XmlaError::MalformedResponse(format!(
            "expected SOAP Envelope, found <{}>",
            envelope.name()
        )));
    }
    let body = envelope.child("Body").ok_or_else(|| {
        XmlaError::MalformedResponse("SOAP Envelope has no Body".to_string())
    })?;

    if let Some(fault) = body.child("Fault") {
        let message = fault
            .child_text("faultstring")
            .map(str::to_string)
            .or_else(|| fault.find(&["detail", "error", "desc"]).map(|e| e.text().to_string()))
            .unwrap_or_else(|| "unknown fault".to_string());
        return Err(XmlaError::ServerFault {
            fault: message,
            request: request.to_string(),
        });
    }

    body.children().first().cloned().ok_or_else(|| {
        XmlaError::MalformedResponse("SOAP Body is empty".to_string())
    })
}

fn return_root<'a>(
    response: &'a XmlElement,
    expected: &str,
    request: &str,
) -> XmlaResult<&'a XmlElement> {
    if response.name() != expected {
        return Err(XmlaError::MalformedResponse(format!(
            "expected <{}>, found <{}>",
            expected,
            response.name()
        )));
    }
    let root = response.find(&["return", "root"]).ok_or_else(|| {
        XmlaError::MalformedResponse(format!("<{}> has no return/root element", expected))
    })?;
    check_root_errors(root, request)?;
    Ok(root)
}

/// Providers may report errors inside the returned root instead of as a Fault
fn check_root_errors(root: &XmlElement, request: &str) -> XmlaResult<()> {
    let messages = match root.child("Messages") {
        Some(messages) => messages,
        None => return Ok(()),
    };
    let errors: Vec<&str> = messages
        .children_named("Error")
        .map(|e| e.attribute("Description").unwrap_or("unknown error"))
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err(XmlaError::ServerFault {
        fault: errors.join("; "),
        request: request.to_string(),
    })
}

/// Decode a Discover response into its rows, in document order
pub fn decode_discover(bytes: &[u8], request: &str) -> XmlaResult<Vec<Row>> {
    let response = decode_response(bytes, request)?;
    let root = return_root(&response, "DiscoverResponse", request)?;
    Ok(root.children_named("row").map(Row::from_element).collect())
}

/// Decode an Execute response and return its `root` element
pub fn decode_execute(bytes: &[u8], request: &str) -> XmlaResult<XmlElement> {
    let response = decode_response(bytes, request)?;
    return_root(&response, "ExecuteResponse", request).cloned()
}
