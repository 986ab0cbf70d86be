// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Cell set parsing, cell addressing and axis member resolution

use std::sync::Arc;

use xmla_olap_driver::{AxisOrdinal, CellSet, CellValue, Statement, XmlaConfig, XmlaConnection};
use xmla_olap_metadata::{MetadataElement, WorkerPool};
use xmla_olap_protocol::XmlaError;
use xmla_olap_test_utils::{FoodMart, MockTransport, SoapFixtures};

const F: &str = "[Gender].[All Gender].[F]";
const M: &str = "[Gender].[All Gender].[M]";

struct Executed {
    transport: Arc<MockTransport>,
    // closing the statement would close its cell set
    _statement: Statement,
    cell_set: Arc<CellSet>,
}

fn execute(transport: MockTransport, mdx: &str) -> Executed {
    let transport = transport.into_shared();
    let config = XmlaConfig::new("http://localhost:8080/mondrian/xmla")
        .with_data_source_info(FoodMart::DATA_SOURCE_INFO)
        .with_catalog("FoodMart");
    let pool = WorkerPool::new().expect("worker pool");
    let connection =
        XmlaConnection::open_with(config, Arc::clone(&transport) as _, pool).expect("connection");
    let statement = connection.create_statement().expect("statement");
    let cell_set = statement.execute(mdx).expect("cell set");
    Executed {
        transport,
        _statement: statement,
        cell_set,
    }
}

fn gender_query() -> Executed {
    execute(
        FoodMart::transport().on_execute("[Gender].[Gender].Members", FoodMart::gender_cell_set()),
        "SELECT {[Measures].[Unit Sales]} ON COLUMNS, [Gender].[Gender].Members ON ROWS \
         FROM [Sales] WHERE [Time].[1997]",
    )
}

#[test]
fn test_metadata_and_axes() {
    let executed = gender_query();
    let cell_set = &executed.cell_set;

    let metadata = cell_set.metadata().unwrap();
    assert_eq!(metadata.cube_name, "Sales");
    assert_eq!(metadata.axes.len(), 2);
    assert_eq!(metadata.axes[1].hierarchies, vec!["Gender".to_string()]);
    assert_eq!(metadata.filter_axis.hierarchies, vec!["Time".to_string()]);
    assert_eq!(
        metadata.cell_properties,
        vec!["VALUE".to_string(), "FORMATTED_VALUE".to_string(), "FORMAT_STRING".to_string()]
    );

    let axes = cell_set.axes().unwrap();
    assert_eq!(axes[0].ordinal(), AxisOrdinal::Axis(0));
    assert_eq!(axes[0].position_count(), 1);
    assert_eq!(axes[1].position_count(), 2);
    assert_eq!(axes[1].positions[1].members[0].unique_name, M);

    let filter = cell_set.filter_axis().unwrap();
    assert_eq!(filter.position_count(), 1);
    assert_eq!(filter.positions[0].members[0].unique_name, "[Time].[1997]");
}

#[test]
fn test_cells_by_ordinal_and_coordinates() {
    let executed = gender_query();
    let cell_set = &executed.cell_set;

    assert_eq!(cell_set.cell_count().unwrap(), 2);
    let female = cell_set.cell_at(&[0, 0]).unwrap();
    assert_eq!(female.value, CellValue::Number(131558.0));
    assert_eq!(female.formatted_value.as_deref(), Some("131,558"));
    assert_eq!(female.format_string.as_deref(), Some("Standard"));

    let male = cell_set.cell_at(&[0, 1]).unwrap();
    assert_eq!(male.ordinal, 1);
    assert_eq!(male.display_value(), "135,215");

    assert_eq!(cell_set.coordinates_to_ordinal(&[0, 1]).unwrap(), 1);
    assert_eq!(cell_set.ordinal_to_coordinates(1).unwrap(), vec![0, 1]);

    assert!(matches!(cell_set.cell(2), Err(XmlaError::InvalidCoordinate(_))));
    assert!(matches!(cell_set.cell_at(&[1, 0]), Err(XmlaError::InvalidCoordinate(_))));
    assert!(matches!(cell_set.cell_at(&[0]), Err(XmlaError::InvalidCoordinate(_))));
}

#[test]
fn test_coordinates_follow_axis_zero_first() {
    let tuple = |uname: &str| {
        format!("<Tuple><Member Hierarchy=\"H\"><UName>{uname}</UName></Member></Tuple>")
    };
    let columns: String = ["[A]", "[B]", "[C]"].iter().map(|u| tuple(*u)).collect();
    let rows: String = ["[X]", "[Y]"].iter().map(|u| tuple(*u)).collect();
    let body = SoapFixtures::execute(&format!(
        "<OlapInfo><CubeInfo><Cube><CubeName>Sales</CubeName></Cube></CubeInfo></OlapInfo>\
         <Axes><Axis name=\"Axis0\"><Tuples>{columns}</Tuples></Axis>\
         <Axis name=\"Axis1\"><Tuples>{rows}</Tuples></Axis></Axes>\
         <CellData><Cell CellOrdinal=\"4\"><Value xsi:type=\"xsd:int\">7</Value></Cell></CellData>"
    ));
    let executed = execute(FoodMart::transport().on_execute("grid", body), "SELECT grid");
    let cell_set = &executed.cell_set;

    assert_eq!(cell_set.cell_count().unwrap(), 6);
    assert_eq!(cell_set.coordinates_to_ordinal(&[1, 1]).unwrap(), 4);
    assert_eq!(cell_set.ordinal_to_coordinates(5).unwrap(), vec![2, 1]);
    assert_eq!(cell_set.cell_at(&[1, 1]).unwrap().value, CellValue::Integer(7));
    // omitted cells are empty, not errors
    assert!(cell_set.cell(3).unwrap().is_empty());
}

#[test]
fn test_members_resolve_lazily_in_one_pass() {
    let executed = gender_query();
    let cell_set = &executed.cell_set;
    let members_before = executed.transport.discover_requests("MDSCHEMA_MEMBERS").len();

    let row = cell_set.position_members(AxisOrdinal::Axis(1), 0).unwrap();
    assert_eq!(row.len(), 1);
    assert!(row[0].is_resolved());
    assert_eq!(row[0].unique_name(), F);
    assert_eq!(row[0].member().unwrap().unique_name(), F);
    assert_eq!(
        row[0].property_value("PARENT_UNIQUE_NAME").as_deref(),
        Some("[Gender].[All Gender]")
    );

    let measure = cell_set.position_members(AxisOrdinal::Axis(0), 0).unwrap();
    assert!(measure[0].is_resolved());
    assert_eq!(measure[0].name(), "Unit Sales");

    let lookups = executed.transport.discover_requests("MDSCHEMA_MEMBERS").len();
    assert!(lookups > members_before);

    // later positions reuse the first resolution
    let second = cell_set.position_members(AxisOrdinal::Axis(1), 1).unwrap();
    assert_eq!(second[0].member().unwrap().unique_name(), M);
    assert_eq!(executed.transport.discover_requests("MDSCHEMA_MEMBERS").len(), lookups);
}

#[test]
fn test_unknown_members_stay_position_only() {
    let executed = gender_query();

    let slicer = executed.cell_set.position_members(AxisOrdinal::Filter, 0).unwrap();
    assert!(!slicer[0].is_resolved());
    assert_eq!(slicer[0].unique_name(), "[Time].[1997]");
    assert_eq!(slicer[0].name(), "1997");
    assert_eq!(slicer[0].property_value("LEVEL_UNIQUE_NAME").as_deref(), Some("[Time].[Year]"));
    assert_eq!(slicer[0].property_value("PARENT_UNIQUE_NAME"), None);

    assert!(matches!(
        executed.cell_set.position_members(AxisOrdinal::Axis(1), 2),
        Err(XmlaError::InvalidCoordinate(_))
    ));
    assert!(matches!(
        executed.cell_set.position_members(AxisOrdinal::Axis(2), 0),
        Err(XmlaError::InvalidCoordinate(_))
    ));
}

#[test]
fn test_position_values_shadow_schema_member() {
    let body = SoapFixtures::execute(&format!(
        "<OlapInfo><CubeInfo><Cube><CubeName>Sales</CubeName></Cube></CubeInfo></OlapInfo>\
         <Axes><Axis name=\"Axis0\"><Tuples><Tuple><Member Hierarchy=\"Gender\">\
         <UName>{F}</UName><Caption>Female</Caption></Member></Tuple></Tuples></Axis></Axes>\
         <CellData/>"
    ));
    let executed = execute(FoodMart::transport().on_execute("Female", body), "SELECT Female");

    let members = executed.cell_set.position_members(AxisOrdinal::Axis(0), 0).unwrap();
    let female = &members[0];
    assert!(female.is_resolved());
    assert_eq!(female.caption(), "Female");
    assert_eq!(female.property_value("MEMBER_CAPTION").as_deref(), Some("Female"));
    assert_eq!(female.member().unwrap().caption(), "F");
}

#[test]
fn test_cell_set_without_axes_has_one_cell() {
    let executed = execute(
        FoodMart::transport().on_execute("scalar", SoapFixtures::empty_cell_set()),
        "SELECT scalar",
    );
    let cell_set = &executed.cell_set;

    assert!(cell_set.axes().unwrap().is_empty());
    assert_eq!(cell_set.filter_axis().unwrap().position_count(), 0);
    assert_eq!(cell_set.cell_count().unwrap(), 1);
    assert!(cell_set.cell(0).unwrap().is_empty());
    assert_eq!(cell_set.ordinal_to_coordinates(0).unwrap(), Vec::<usize>::new());
}

#[test]
fn test_gap_in_axes_is_malformed() {
    let body = SoapFixtures::execute(
        "<OlapInfo/><Axes><Axis name=\"Axis0\"><Tuples/></Axis><Axis name=\"Axis2\"><Tuples/></Axis></Axes><CellData/>",
    );
    let transport = FoodMart::transport().on_execute("gap", body).into_shared();
    let config = XmlaConfig::new("http://localhost:8080/mondrian/xmla")
        .with_data_source_info(FoodMart::DATA_SOURCE_INFO);
    let connection =
        XmlaConnection::open_with(config, Arc::clone(&transport) as _, WorkerPool::new().unwrap())
            .unwrap();
    let statement = connection.create_statement().unwrap();

    let err = statement.execute("SELECT gap").unwrap_err();
    assert!(matches!(err.root(), XmlaError::MalformedResponse(_)));
    assert!(statement.current_cell_set().is_none());
}

#[test]
fn test_cell_outside_the_grid_is_malformed() {
    let body = SoapFixtures::execute(
        "<OlapInfo/><Axes><Axis name=\"Axis0\"><Tuples><Tuple><Member Hierarchy=\"H\"><UName>[A]</UName></Member></Tuple></Tuples></Axis></Axes>\
         <CellData><Cell CellOrdinal=\"1\"><Value>x</Value></Cell></CellData>",
    );
    let transport = FoodMart::transport().on_execute("outside", body).into_shared();
    let config = XmlaConfig::new("http://localhost:8080/mondrian/xmla")
        .with_data_source_info(FoodMart::DATA_SOURCE_INFO);
    let connection =
        XmlaConnection::open_with(config, Arc::clone(&transport) as _, WorkerPool::new().unwrap())
            .unwrap();
    let statement = connection.create_statement().unwrap();

    let err = statement.execute("SELECT outside").unwrap_err();
    assert!(matches!(err.root(), XmlaError::MalformedResponse(_)));
}

#[test]
fn test_closed_cell_set_rejects_access() {
    let executed = gender_query();
    executed.cell_set.close();

    assert!(matches!(executed.cell_set.cell(0), Err(XmlaError::Closed(_))));
    assert!(matches!(executed.cell_set.axes(), Err(XmlaError::Closed(_))));
    assert!(matches!(
        executed.cell_set.position_members(AxisOrdinal::Axis(0), 0),
        Err(XmlaError::Closed(_))
    ));
}
