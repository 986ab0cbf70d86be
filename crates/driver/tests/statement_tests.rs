// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Statement execution against a scripted transport: cell set lifecycle,
//! cancellation, timeouts and faults

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use xmla_olap_driver::{MdxStatement, XmlaConfig, XmlaConnection};
use xmla_olap_metadata::WorkerPool;
use xmla_olap_protocol::XmlaError;
use xmla_olap_test_utils::{FoodMart, MockTransport, SoapFixtures, XmlaAssertions};

const GENDER_QUERY: &str =
    "SELECT {[Measures].[Unit Sales]} ON COLUMNS, [Gender].[Gender].Members ON ROWS FROM [Sales]";

/// A configuration that opens without any request: the data source is
/// known and no catalog has to be resolved
fn quiet_config() -> XmlaConfig {
    XmlaConfig::new("http://localhost:8080/mondrian/xmla")
        .with_data_source_info(FoodMart::DATA_SOURCE_INFO)
}

fn connect(config: XmlaConfig, transport: &Arc<MockTransport>) -> Arc<XmlaConnection> {
    let pool = WorkerPool::new().expect("worker pool");
    XmlaConnection::open_with(config, Arc::clone(transport) as _, pool).expect("connection")
}

#[test]
fn test_execute_returns_cell_set() {
    let transport = FoodMart::transport()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .into_shared();
    let connection = connect(quiet_config().with_catalog("FoodMart"), &transport);
    let statement = connection.create_statement().unwrap();

    let cell_set = statement.execute(GENDER_QUERY).unwrap();
    assert_eq!(cell_set.cell_count().unwrap(), 2);
    assert!(!statement.is_executing());

    let execute = transport
        .requests()
        .into_iter()
        .find(|r| r.statement.is_some())
        .expect("execute request");
    assert_eq!(execute.property("Catalog"), Some("FoodMart"));
    assert_eq!(execute.property("DataSourceInfo"), Some(FoodMart::DATA_SOURCE_INFO));
}

#[test]
fn test_at_most_one_open_cell_set() {
    let transport = MockTransport::new()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = connection.create_statement().unwrap();

    let first = statement.execute(GENDER_QUERY).unwrap();
    let second = statement.execute(GENDER_QUERY).unwrap();

    assert!(first.is_closed());
    assert!(matches!(first.cell(0), Err(XmlaError::Closed(_))));
    assert!(!second.is_closed());
    assert!(Arc::ptr_eq(&statement.current_cell_set().unwrap(), &second));
}

#[test]
fn test_execute_query_serializes_the_tree() {
    struct GenderQuery;

    impl MdxStatement for GenderQuery {
        fn to_mdx(&self) -> String {
            GENDER_QUERY.to_string()
        }
    }

    let transport = MockTransport::new()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = connection.create_statement().unwrap();

    let cell_set = statement.execute_query(&GenderQuery).unwrap();
    assert_eq!(cell_set.axes().unwrap().len(), 2);
}

#[test]
fn test_cancel_wakes_blocked_execute() {
    let transport = MockTransport::new()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .with_delay(Duration::from_secs(10))
        .into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = Arc::new(connection.create_statement().unwrap());

    let started = Instant::now();
    let runner = {
        let statement = Arc::clone(&statement);
        thread::spawn(move || statement.execute(GENDER_QUERY))
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while !statement.is_executing() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(statement.is_executing());

    statement.cancel();
    let err = runner.join().unwrap().unwrap_err();
    XmlaAssertions::assert_cancelled(&err);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!statement.is_executing());

    // nothing left to cancel
    statement.cancel();
    assert!(statement.current_cell_set().is_none());
}

#[test]
fn test_timeout_leaves_request_running() {
    let transport = MockTransport::new()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .with_delay(Duration::from_secs(5))
        .into_shared();
    let connection = connect(quiet_config().with_query_timeout(1), &transport);
    let statement = connection.create_statement().unwrap();
    assert_eq!(statement.query_timeout(), Some(Duration::from_secs(1)));

    let err = statement.execute(GENDER_QUERY).unwrap_err();
    XmlaAssertions::assert_timeout(&err);
    assert!(statement.is_executing());

    statement.cancel();
    assert!(!statement.is_executing());
}

#[test]
fn test_statement_timeout_overrides_connection() {
    let transport = MockTransport::new().into_shared();
    let connection = connect(quiet_config().with_query_timeout(30), &transport);
    let statement = connection.create_statement().unwrap();

    statement.set_query_timeout(0);
    assert_eq!(statement.query_timeout(), None);
    statement.set_query_timeout(-5);
    assert_eq!(statement.query_timeout(), None);
}

#[test]
fn test_server_fault_surfaces_with_request() {
    let transport = MockTransport::new()
        .on_execute("[Bogus]", SoapFixtures::fault("MDX object '[Bogus]' not found in cube 'Sales'"))
        .into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = connection.create_statement().unwrap();

    let err = statement.execute("SELECT [Bogus] ON COLUMNS FROM [Sales]").unwrap_err();
    XmlaAssertions::assert_server_fault(&err, "[Bogus]");
    let XmlaError::ServerFault { request, .. } = err.root() else {
        panic!("expected a server fault, got {err:?}");
    };
    assert!(request.contains("SELECT [Bogus] ON COLUMNS FROM [Sales]"));

    // a failed query leaves nothing open
    assert!(statement.current_cell_set().is_none());
    assert!(!statement.is_executing());
}

#[test]
fn test_closed_statement_rejects_execute() {
    let transport = MockTransport::new()
        .on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set())
        .into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = connection.create_statement().unwrap();
    let cell_set = statement.execute(GENDER_QUERY).unwrap();

    statement.close();
    statement.close();
    assert!(statement.is_closed());
    assert!(cell_set.is_closed());
    assert!(matches!(statement.execute(GENDER_QUERY), Err(XmlaError::Closed(_))));
}

#[test]
fn test_closed_connection_rejects_statements() {
    let transport = MockTransport::new().into_shared();
    let connection = connect(quiet_config(), &transport);
    let statement = connection.create_statement().unwrap();

    connection.close();
    assert!(connection.is_closed());
    assert!(matches!(connection.create_statement(), Err(XmlaError::Closed(_))));
    assert!(matches!(statement.execute(GENDER_QUERY), Err(XmlaError::Closed(_))));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn test_unknown_catalog_fails_open() {
    let transport = FoodMart::transport().into_shared();
    let pool = WorkerPool::new().unwrap();
    let result = XmlaConnection::open_with(
        quiet_config().with_catalog("Sampledata"),
        Arc::clone(&transport) as _,
        pool,
    );
    let Err(err) = result else {
        panic!("opening with an unknown catalog should fail");
    };
    assert!(matches!(err.root(), XmlaError::NotFound(_)));
    assert!(err.to_string().contains("Sampledata"));
}
