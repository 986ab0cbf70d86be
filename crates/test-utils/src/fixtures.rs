// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures: SOAP envelopes and FoodMart sample data

use xmla_olap_protocol::codec::{xml_escape, MDDATASET_NS, ROWSET_NS, SOAP_ENV_NS, XMLA_NS};

use crate::mock_transport::{MockRoute, MockTransport};

/// A rowset row as column/value pairs
pub type FixtureRow<'a> = &'a [(&'a str, &'a str)];

/// Builders for SOAP response envelopes
pub struct SoapFixtures;

impl SoapFixtures {
    fn envelope(body: &str) -> Vec<u8> {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\"><SOAP-ENV:Body>{body}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
        )
        .into_bytes()
    }

    /// Discover response holding `rows`
    pub fn rowset(rows: &[FixtureRow<'_>]) -> Vec<u8> {
        let mut inner = String::new();
        for row in rows {
            inner.push_str("<row>");
            for (column, value) in row.iter() {
                inner.push_str(&format!("<{column}>{}</{column}>", xml_escape(value)));
            }
            inner.push_str("</row>");
        }
        Self::envelope(&format!(
            "<DiscoverResponse xmlns=\"{XMLA_NS}\"><return><root xmlns=\"{ROWSET_NS}\">{inner}</root></return></DiscoverResponse>"
        ))
    }

    /// Discover response with no rows
    pub fn empty_rowset() -> Vec<u8> {
        Self::rowset(&[])
    }

    /// SOAP Fault with the given fault string
    pub fn fault(message: &str) -> Vec<u8> {
        Self::envelope(&format!(
            "<SOAP-ENV:Fault><faultcode>SOAP-ENV:Server.00HSBE02</faultcode>\
             <faultstring>{}</faultstring><faultactor>Mondrian</faultactor>\
             <detail><XA:error xmlns:XA=\"http://mondrian.sourceforge.net\"><code>00HSBE02</code>\
             <desc>{}</desc></XA:error></detail></SOAP-ENV:Fault>",
            xml_escape(message),
            xml_escape(message)
        ))
    }

    /// Discover response whose root reports an error instead of a Fault
    pub fn root_error(description: &str) -> Vec<u8> {
        Self::envelope(&format!(
            "<DiscoverResponse xmlns=\"{XMLA_NS}\"><return><root xmlns=\"{ROWSET_NS}\">\
             <Messages><Error ErrorCode=\"1\" Description=\"{}\"/></Messages></root></return></DiscoverResponse>",
            xml_escape(description)
        ))
    }

    /// Execute response whose multidimensional root holds `inner`
    pub fn execute(inner: &str) -> Vec<u8> {
        Self::envelope(&format!(
            "<ExecuteResponse xmlns=\"{XMLA_NS}\"><return>\
             <root xmlns=\"{MDDATASET_NS}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\">{inner}</root></return></ExecuteResponse>"
        ))
    }

    /// Execute response with no axes and no cells
    pub fn empty_cell_set() -> Vec<u8> {
        Self::execute("<OlapInfo><CubeInfo><Cube><CubeName>Sales</CubeName></Cube></CubeInfo><AxesInfo/></OlapInfo><Axes/><CellData/>")
    }
}

/// The FoodMart sample catalog, reduced to the `Sales` cube with the
/// `Gender` dimension and two measures
pub struct FoodMart;

impl FoodMart {
    pub const DATA_SOURCE_INFO: &'static str = "Provider=Mondrian;DataSource=FoodMart";

    pub fn data_sources() -> Vec<u8> {
        SoapFixtures::rowset(&[&[
            ("DataSourceName", "Provider=Mondrian;DataSource=FoodMart;"),
            ("DataSourceDescription", "Mondrian FoodMart data source"),
            ("URL", "http://localhost:8080/mondrian/xmla"),
            ("DataSourceInfo", Self::DATA_SOURCE_INFO),
            ("ProviderName", "Mondrian"),
            ("ProviderType", "MDP"),
            ("AuthenticationMode", "Unauthenticated"),
        ]])
    }

    pub fn catalogs() -> Vec<u8> {
        SoapFixtures::rowset(&[&[("CATALOG_NAME", "FoodMart"), ("DESCRIPTION", "FoodMart sample")]])
    }

    pub fn schemata() -> Vec<u8> {
        SoapFixtures::rowset(&[&[("CATALOG_NAME", "FoodMart"), ("SCHEMA_NAME", "FoodMart")]])
    }

    pub fn cubes() -> Vec<u8> {
        SoapFixtures::rowset(&[&[
            ("CATALOG_NAME", "FoodMart"),
            ("SCHEMA_NAME", "FoodMart"),
            ("CUBE_NAME", "Sales"),
            ("CUBE_TYPE", "CUBE"),
            ("IS_DRILLTHROUGH_ENABLED", "true"),
            ("DESCRIPTION", "Sales cube"),
        ]])
    }

    pub fn dimensions() -> Vec<u8> {
        SoapFixtures::rowset(&[
            &[
                ("CUBE_NAME", "Sales"),
                ("DIMENSION_NAME", "Gender"),
                ("DIMENSION_UNIQUE_NAME", "[Gender]"),
                ("DIMENSION_CAPTION", "Gender"),
                ("DIMENSION_ORDINAL", "2"),
                ("DIMENSION_TYPE", "3"),
                ("DEFAULT_HIERARCHY", "[Gender]"),
            ],
            &[
                ("CUBE_NAME", "Sales"),
                ("DIMENSION_NAME", "Measures"),
                ("DIMENSION_UNIQUE_NAME", "[Measures]"),
                ("DIMENSION_CAPTION", "Measures"),
                ("DIMENSION_ORDINAL", "0"),
                ("DIMENSION_TYPE", "2"),
                ("DEFAULT_HIERARCHY", "[Measures]"),
            ],
        ])
    }

    fn gender_hierarchy_row() -> FixtureRow<'static> {
        &[
            ("CUBE_NAME", "Sales"),
            ("DIMENSION_UNIQUE_NAME", "[Gender]"),
            ("HIERARCHY_NAME", "Gender"),
            ("HIERARCHY_UNIQUE_NAME", "[Gender]"),
            ("HIERARCHY_CAPTION", "Gender"),
            ("ALL_MEMBER", "[Gender].[All Gender]"),
            ("DEFAULT_MEMBER", "[Gender].[All Gender]"),
            ("HIERARCHY_CARDINALITY", "3"),
        ]
    }

    fn measures_hierarchy_row() -> FixtureRow<'static> {
        &[
            ("CUBE_NAME", "Sales"),
            ("DIMENSION_UNIQUE_NAME", "[Measures]"),
            ("HIERARCHY_NAME", "Measures"),
            ("HIERARCHY_UNIQUE_NAME", "[Measures]"),
            ("DEFAULT_MEMBER", "[Measures].[Unit Sales]"),
            ("HIERARCHY_CARDINALITY", "2"),
        ]
    }

    /// Hierarchies of the `Gender` dimension only
    pub fn gender_hierarchies() -> Vec<u8> {
        SoapFixtures::rowset(&[Self::gender_hierarchy_row()])
    }

    /// Hierarchies of every dimension of the cube
    pub fn all_hierarchies() -> Vec<u8> {
        SoapFixtures::rowset(&[Self::measures_hierarchy_row(), Self::gender_hierarchy_row()])
    }

    pub fn gender_levels() -> Vec<u8> {
        SoapFixtures::rowset(&[
            &[
                ("HIERARCHY_UNIQUE_NAME", "[Gender]"),
                ("LEVEL_NAME", "Gender"),
                ("LEVEL_UNIQUE_NAME", "[Gender].[Gender]"),
                ("LEVEL_NUMBER", "1"),
                ("LEVEL_CARDINALITY", "2"),
                ("LEVEL_TYPE", "0"),
            ],
            &[
                ("HIERARCHY_UNIQUE_NAME", "[Gender]"),
                ("LEVEL_NAME", "(All)"),
                ("LEVEL_UNIQUE_NAME", "[Gender].[(All)]"),
                ("LEVEL_NUMBER", "0"),
                ("LEVEL_CARDINALITY", "1"),
                ("LEVEL_TYPE", "1"),
            ],
        ])
    }

    /// Rows of `MDSCHEMA_MEASURES`, deliberately out of ordinal order
    pub fn measures() -> Vec<u8> {
        SoapFixtures::rowset(&[
            &[
                ("CUBE_NAME", "Sales"),
                ("MEASURE_NAME", "Store Sales"),
                ("MEASURE_UNIQUE_NAME", "[Measures].[Store Sales]"),
                ("MEASURE_CAPTION", "Store Sales"),
                ("MEASURE_AGGREGATOR", "1"),
                ("DATA_TYPE", "5"),
                ("MEASURE_IS_VISIBLE", "true"),
            ],
            &[
                ("CUBE_NAME", "Sales"),
                ("MEASURE_NAME", "Unit Sales"),
                ("MEASURE_UNIQUE_NAME", "[Measures].[Unit Sales]"),
                ("MEASURE_CAPTION", "Unit Sales"),
                ("MEASURE_AGGREGATOR", "1"),
                ("DATA_TYPE", "5"),
                ("MEASURE_IS_VISIBLE", "true"),
            ],
        ])
    }

    /// Members of `[Measures].[MeasuresLevel]`, carrying the ordinals
    pub fn measure_members() -> Vec<u8> {
        SoapFixtures::rowset(&[
            &[
                ("MEMBER_UNIQUE_NAME", "[Measures].[Unit Sales]"),
                ("MEMBER_NAME", "Unit Sales"),
                ("MEMBER_ORDINAL", "0"),
                ("MEMBER_TYPE", "3"),
                ("LEVEL_UNIQUE_NAME", "[Measures].[MeasuresLevel]"),
                ("HIERARCHY_UNIQUE_NAME", "[Measures]"),
                ("DIMENSION_UNIQUE_NAME", "[Measures]"),
                ("LEVEL_NUMBER", "0"),
            ],
            &[
                ("MEMBER_UNIQUE_NAME", "[Measures].[Store Sales]"),
                ("MEMBER_NAME", "Store Sales"),
                ("MEMBER_ORDINAL", "1"),
                ("MEMBER_TYPE", "3"),
                ("LEVEL_UNIQUE_NAME", "[Measures].[MeasuresLevel]"),
                ("HIERARCHY_UNIQUE_NAME", "[Measures]"),
                ("DIMENSION_UNIQUE_NAME", "[Measures]"),
                ("LEVEL_NUMBER", "0"),
            ],
        ])
    }

    /// Row of one `Gender` member
    pub fn gender_member_row(name: &'static str, ordinal: &'static str) -> Vec<(&'static str, String)> {
        vec![
            ("CATALOG_NAME", "FoodMart".to_string()),
            ("CUBE_NAME", "Sales".to_string()),
            ("DIMENSION_UNIQUE_NAME", "[Gender]".to_string()),
            ("HIERARCHY_UNIQUE_NAME", "[Gender]".to_string()),
            ("LEVEL_UNIQUE_NAME", "[Gender].[Gender]".to_string()),
            ("LEVEL_NUMBER", "1".to_string()),
            ("MEMBER_ORDINAL", ordinal.to_string()),
            ("MEMBER_NAME", name.to_string()),
            ("MEMBER_UNIQUE_NAME", format!("[Gender].[All Gender].[{name}]")),
            ("MEMBER_TYPE", "1".to_string()),
            ("MEMBER_CAPTION", name.to_string()),
            ("CHILDREN_CARDINALITY", "0".to_string()),
            ("PARENT_LEVEL", "0".to_string()),
            ("PARENT_UNIQUE_NAME", "[Gender].[All Gender]".to_string()),
            ("PARENT_COUNT", "1".to_string()),
        ]
    }

    /// Members-rowset response holding the named `Gender` members
    pub fn gender_members(names: &[&'static str]) -> Vec<u8> {
        let rows: Vec<Vec<(&str, String)>> = names
            .iter()
            .map(|name| {
                let ordinal = match *name {
                    "F" => "1",
                    "M" => "2",
                    _ => "3",
                };
                Self::gender_member_row(name, ordinal)
            })
            .collect();
        let borrowed: Vec<Vec<(&str, &str)>> = rows
            .iter()
            .map(|row| row.iter().map(|(c, v)| (*c, v.as_str())).collect())
            .collect();
        let slices: Vec<FixtureRow<'_>> = borrowed.iter().map(Vec::as_slice).collect();
        SoapFixtures::rowset(&slices)
    }

    /// Transport scripted with the whole FoodMart catalog
    ///
    /// Hierarchy requests restricted by dimension are answered per
    /// dimension; member lookups by unique name answer `F` and `M`, one
    /// at a time or together.
    pub fn transport() -> MockTransport {
        MockTransport::new()
            .on_discover("DISCOVER_DATASOURCES", Self::data_sources())
            .on_discover("DBSCHEMA_CATALOGS", Self::catalogs())
            .on_discover("DBSCHEMA_SCHEMATA", Self::schemata())
            .on_discover("MDSCHEMA_CUBES", Self::cubes())
            .on_discover("MDSCHEMA_DIMENSIONS", Self::dimensions())
            .route(
                MockRoute::discover("MDSCHEMA_HIERARCHIES")
                    .restriction("DIMENSION_UNIQUE_NAME", "[Gender]")
                    .respond(Self::gender_hierarchies()),
            )
            .route(
                MockRoute::discover("MDSCHEMA_HIERARCHIES")
                    .restriction("DIMENSION_UNIQUE_NAME", "[Measures]")
                    .respond(SoapFixtures::rowset(&[Self::measures_hierarchy_row()])),
            )
            .on_discover("MDSCHEMA_HIERARCHIES", Self::all_hierarchies())
            .route(
                MockRoute::discover("MDSCHEMA_LEVELS")
                    .restriction("HIERARCHY_UNIQUE_NAME", "[Gender]")
                    .respond(Self::gender_levels()),
            )
            .on_discover("MDSCHEMA_MEASURES", Self::measures())
            .route(
                MockRoute::discover("MDSCHEMA_MEMBERS")
                    .restriction("LEVEL_UNIQUE_NAME", "[Measures].[MeasuresLevel]")
                    .respond(Self::measure_members()),
            )
            .route(
                MockRoute::discover("MDSCHEMA_MEMBERS")
                    .restriction("LEVEL_UNIQUE_NAME", "[Gender].[Gender]")
                    .respond(Self::gender_members(&["F", "M"])),
            )
            .route(
                MockRoute::discover("MDSCHEMA_MEMBERS")
                    .restriction_values(
                        "MEMBER_UNIQUE_NAME",
                        ["[Gender].[All Gender].[F]", "[Gender].[All Gender].[M]"],
                    )
                    .restriction("TREE_OP", "8")
                    .respond(Self::gender_members(&["F", "M"])),
            )
            .route(
                MockRoute::discover("MDSCHEMA_MEMBERS")
                    .restriction("MEMBER_UNIQUE_NAME", "[Gender].[All Gender].[F]")
                    .restriction("TREE_OP", "8")
                    .respond(Self::gender_members(&["F"])),
            )
            .route(
                MockRoute::discover("MDSCHEMA_MEMBERS")
                    .restriction("MEMBER_UNIQUE_NAME", "[Gender].[All Gender].[M]")
                    .restriction("TREE_OP", "8")
                    .respond(Self::gender_members(&["M"])),
            )
    }

    /// Cell set of
    /// `SELECT {[Measures].[Unit Sales]} ON COLUMNS, [Gender].[Gender].Members ON ROWS FROM [Sales]`
    pub fn gender_cell_set() -> Vec<u8> {
        SoapFixtures::execute(
            "<OlapInfo>\
               <CubeInfo><Cube><CubeName>Sales</CubeName></Cube></CubeInfo>\
               <AxesInfo>\
                 <AxisInfo name=\"Axis0\"><HierarchyInfo name=\"Measures\">\
                   <UName name=\"[Measures].[MEMBER_UNIQUE_NAME]\"/><Caption name=\"[Measures].[MEMBER_CAPTION]\"/>\
                 </HierarchyInfo></AxisInfo>\
                 <AxisInfo name=\"Axis1\"><HierarchyInfo name=\"Gender\">\
                   <UName name=\"[Gender].[MEMBER_UNIQUE_NAME]\"/><Caption name=\"[Gender].[MEMBER_CAPTION]\"/>\
                 </HierarchyInfo></AxisInfo>\
                 <AxisInfo name=\"SlicerAxis\"><HierarchyInfo name=\"Time\">\
                   <UName name=\"[Time].[MEMBER_UNIQUE_NAME]\"/>\
                 </HierarchyInfo></AxisInfo>\
               </AxesInfo>\
               <CellInfo><Value name=\"VALUE\"/><FmtValue name=\"FORMATTED_VALUE\"/><FormatString name=\"FORMAT_STRING\"/></CellInfo>\
             </OlapInfo>\
             <Axes>\
               <Axis name=\"Axis0\"><Tuples>\
                 <Tuple><Member Hierarchy=\"Measures\"><UName>[Measures].[Unit Sales]</UName><Caption>Unit Sales</Caption>\
                   <LName>[Measures].[MeasuresLevel]</LName><LNum>0</LNum><DisplayInfo>0</DisplayInfo></Member></Tuple>\
               </Tuples></Axis>\
               <Axis name=\"Axis1\"><Tuples>\
                 <Tuple><Member Hierarchy=\"Gender\"><UName>[Gender].[All Gender].[F]</UName><Caption>F</Caption>\
                   <LName>[Gender].[Gender]</LName><LNum>1</LNum><DisplayInfo>131072</DisplayInfo></Member></Tuple>\
                 <Tuple><Member Hierarchy=\"Gender\"><UName>[Gender].[All Gender].[M]</UName><Caption>M</Caption>\
                   <LName>[Gender].[Gender]</LName><LNum>1</LNum><DisplayInfo>131072</DisplayInfo></Member></Tuple>\
               </Tuples></Axis>\
               <Axis name=\"SlicerAxis\"><Tuples>\
                 <Tuple><Member Hierarchy=\"Time\"><UName>[Time].[1997]</UName><Caption>1997</Caption>\
                   <LName>[Time].[Year]</LName><LNum>0</LNum><DisplayInfo>4</DisplayInfo></Member></Tuple>\
               </Tuples></Axis>\
             </Axes>\
             <CellData>\
               <Cell CellOrdinal=\"0\"><Value xsi:type=\"xsd:double\">131558</Value><FmtValue>131,558</FmtValue><FormatString>Standard</FormatString></Cell>\
               <Cell CellOrdinal=\"1\"><Value xsi:type=\"xsd:double\">135215</Value><FmtValue>135,215</FmtValue><FormatString>Standard</FormatString></Cell>\
             </CellData>",
        )
    }
}
