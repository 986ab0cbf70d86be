// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the protocol crate: full request/response exchanges

use xmla_olap_protocol::codec::{self, ROWSET_NS, SOAP_ENV_NS, XMLA_NS};
use xmla_olap_protocol::{RequestType, Restrictions, TreeOps, XmlElement, XmlaError};

fn fault_envelope(message: &str) -> Vec<u8> {
    format!(
        "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\"><SOAP-ENV:Body>\
         <SOAP-ENV:Fault><faultcode>SOAP-ENV:Server.00HSBE02</faultcode>\
         <faultstring>{message}</faultstring></SOAP-ENV:Fault>\
         </SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
    .into_bytes()
}

fn rowset_envelope(rows: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\"?>\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\"><SOAP-ENV:Body>\
         <cxmla:DiscoverResponse xmlns:cxmla=\"{XMLA_NS}\"><cxmla:return>\
         <root xmlns=\"{ROWSET_NS}\">{rows}</root>\
         </cxmla:return></cxmla:DiscoverResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
    .into_bytes()
}

#[test]
fn test_fault_carries_message_and_request() {
    let restrictions = Restrictions::new().with("CATALOG_NAME", "X");
    let properties = codec::discover_properties(None, Some("X"), None);
    let request = codec::encode_discover(RequestType::MdschemaCubes, &restrictions, &properties);

    let err = codec::decode_discover(&fault_envelope("no catalog named 'X'"), &request).unwrap_err();
    match &err {
        XmlaError::ServerFault { fault, request: sent } => {
            assert_eq!(fault, "no catalog named 'X'");
            assert!(sent.contains("<CATALOG_NAME>X</CATALOG_NAME>"));
            assert!(sent.contains("MDSCHEMA_CUBES"));
        }
        other => panic!("expected ServerFault, got {other:?}"),
    }
    assert!(err.to_string().contains("no catalog named 'X'"));
}

#[test]
fn test_prefixed_response_elements_decode() {
    let rows = codec::decode_discover(
        &rowset_envelope(
            "<row><CATALOG_NAME>FoodMart</CATALOG_NAME><CUBE_NAME>Sales</CUBE_NAME></row>\
             <row><CATALOG_NAME>FoodMart</CATALOG_NAME><CUBE_NAME>Warehouse</CUBE_NAME></row>",
        ),
        "request",
    )
    .unwrap();
    let cubes: Vec<&str> = rows.iter().filter_map(|r| r.get("CUBE_NAME")).collect();
    assert_eq!(cubes, ["Sales", "Warehouse"]);
}

#[test]
fn test_member_request_round_trips_through_dom() {
    let restrictions = Restrictions::new()
        .with("CATALOG_NAME", "FoodMart")
        .with("CUBE_NAME", "Sales")
        .with_many(
            "MEMBER_UNIQUE_NAME",
            ["[Gender].[All Gender].[F]", "[Gender].[All Gender].[M]"],
        )
        .with("TREE_OP", TreeOps::SELF.restriction_value());
    let properties = codec::discover_properties(Some("Provider=Mondrian"), Some("FoodMart"), None);
    let request = codec::encode_discover(RequestType::MdschemaMembers, &restrictions, &properties);

    let envelope = XmlElement::parse(request.as_bytes()).unwrap();
    let list = envelope
        .find(&["Body", "Discover", "Restrictions", "RestrictionList"])
        .expect("restriction list");
    let names: Vec<&str> = list
        .child("MEMBER_UNIQUE_NAME")
        .unwrap()
        .children_named("Value")
        .map(|v| v.text())
        .collect();
    assert_eq!(names, ["[Gender].[All Gender].[F]", "[Gender].[All Gender].[M]"]);
    assert_eq!(list.child_text("TREE_OP"), Some("8"));
}

#[test]
fn test_execute_request_escapes_statement() {
    let properties = codec::execute_properties(None, Some("FoodMart"), None, None);
    let request = codec::encode_execute(
        "SELECT {[Measures].[Unit Sales]} ON COLUMNS FROM [Sales] WHERE [Store].[A&B]",
        &properties,
    );
    let envelope = XmlElement::parse(request.as_bytes()).unwrap();
    let statement = envelope
        .find(&["Body", "Execute", "Command", "Statement"])
        .unwrap();
    assert!(statement.text().ends_with("[Store].[A&B]"));
    assert!(request.contains("<Format>Multidimensional</Format>"));
}

#[test]
fn test_truncated_response_is_malformed() {
    let mut bytes = rowset_envelope("<row><CUBE_NAME>Sales</CUBE_NAME></row>");
    bytes.truncate(bytes.len() / 2);
    let err = codec::decode_discover(&bytes, "request").unwrap_err();
    assert!(matches!(err, XmlaError::MalformedResponse(_)));
}
