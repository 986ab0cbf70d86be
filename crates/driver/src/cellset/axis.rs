// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use xmla_olap_metadata::{Member, MetadataElement};
use xmla_olap_protocol::{XmlElement, XmlaError, XmlaResult};

/// Tuple element children and the member property each one carries
const TUPLE_PROPERTY_TAGS: &[(&str, &str)] = &[
    ("UName", "MEMBER_UNIQUE_NAME"),
    ("Caption", "MEMBER_CAPTION"),
    ("LName", "LEVEL_UNIQUE_NAME"),
    ("LNum", "LEVEL_NUMBER"),
    ("DisplayInfo", "DISPLAY_INFO"),
];

/// Which axis of a query an axis is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisOrdinal {
    /// The slicer (`WHERE` clause)
    Filter,
    Axis(usize),
}

impl AxisOrdinal {
    /// Parse an axis name as it appears in a response (`Axis0`, `SlicerAxis`)
    pub fn from_response_name(name: &str) -> XmlaResult<Self> {
        if name == "SlicerAxis" {
            return Ok(AxisOrdinal::Filter);
        }
        name.strip_prefix("Axis")
            .and_then(|n| n.parse().ok())
            .map(AxisOrdinal::Axis)
            .ok_or_else(|| XmlaError::MalformedResponse(format!("unknown axis name '{}'", name)))
    }

    /// MDX name of the axis
    pub fn mdx_name(self) -> String {
        match self {
            AxisOrdinal::Filter => "FILTER".to_string(),
            AxisOrdinal::Axis(0) => "COLUMNS".to_string(),
            AxisOrdinal::Axis(1) => "ROWS".to_string(),
            AxisOrdinal::Axis(2) => "PAGES".to_string(),
            AxisOrdinal::Axis(3) => "CHAPTERS".to_string(),
            AxisOrdinal::Axis(4) => "SECTIONS".to_string(),
            AxisOrdinal::Axis(n) => format!("AXIS({})", n),
        }
    }
}

impl fmt::Display for AxisOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mdx_name())
    }
}

/// Declared shape of an axis: which hierarchies its tuples span
#[derive(Debug, Clone, PartialEq)]
pub struct AxisMetadata {
    pub ordinal: AxisOrdinal,
    pub hierarchies: Vec<String>,
}

impl AxisMetadata {
    pub(crate) fn parse(element: &XmlElement) -> XmlaResult<Self> {
        let ordinal = AxisOrdinal::from_response_name(element.attribute("name").unwrap_or_default())?;
        let hierarchies = element
            .children_named("HierarchyInfo")
            .filter_map(|h| h.attribute("name"))
            .map(str::to_string)
            .collect();
        Ok(Self { ordinal, hierarchies })
    }

    pub(crate) fn empty(ordinal: AxisOrdinal) -> Self {
        Self {
            ordinal,
            hierarchies: Vec::new(),
        }
    }
}

/// A member as it appears in one position of an axis
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMember {
    pub hierarchy: String,
    pub unique_name: String,
    pub caption: String,
    pub level_unique_name: Option<String>,
    pub level_number: Option<i32>,
    pub display_info: Option<i64>,
    /// Every value the tuple carried, keyed by member property name
    pub properties: HashMap<String, String>,
}

impl PositionMember {
    pub(crate) fn parse(element: &XmlElement) -> XmlaResult<Self> {
        let mut properties = HashMap::new();
        for child in element.children() {
            let name = TUPLE_PROPERTY_TAGS
                .iter()
                .find(|(tag, _)| *tag == child.name())
                .map(|(_, property)| *property)
                .unwrap_or(child.name());
            properties.insert(name.to_string(), child.text().to_string());
        }

        let unique_name = element
            .child_text("UName")
            .ok_or_else(|| XmlaError::MalformedResponse("tuple member has no UName".to_string()))?
            .to_string();
        let level_number = element
            .child_text("LNum")
            .map(|n| {
                n.trim().parse::<i32>().map_err(|_| {
                    XmlaError::MalformedResponse(format!("LNum '{}' is not an integer", n))
                })
            })
            .transpose()?;
        let display_info = element
            .child_text("DisplayInfo")
            .and_then(|n| n.trim().parse::<i64>().ok());

        Ok(Self {
            hierarchy: element.attribute("Hierarchy").unwrap_or_default().to_string(),
            caption: element.child_text("Caption").unwrap_or(unique_name.as_str()).to_string(),
            unique_name,
            level_unique_name: element.child_text("LName").map(str::to_string),
            level_number,
            display_info,
            properties,
        })
    }

    /// Child count the provider reported in the low 16 bits of `DisplayInfo`
    pub fn child_count_hint(&self) -> Option<i64> {
        self.display_info.map(|info| info & 0xFFFF)
    }
}

/// One tuple of an axis
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ordinal: usize,
    pub members: Vec<PositionMember>,
}

/// An axis of a cell set and its positions
#[derive(Debug, Clone, PartialEq)]
pub struct CellSetAxis {
    pub metadata: AxisMetadata,
    pub positions: Vec<Position>,
}

impl CellSetAxis {
    pub(crate) fn parse(element: &XmlElement, metadata: AxisMetadata) -> XmlaResult<Self> {
        let tuples = element
            .child("Tuples")
            .map(|t| t.children_named("Tuple").collect::<Vec<_>>())
            .unwrap_or_default();
        let positions = tuples
            .into_iter()
            .enumerate()
            .map(|(ordinal, tuple)| {
                let members = tuple
                    .children_named("Member")
                    .map(PositionMember::parse)
                    .collect::<XmlaResult<Vec<_>>>()
                    .map_err(|e| {
                        e.with_context(format!("{} position {}", metadata.ordinal, ordinal))
                    })?;
                Ok(Position { ordinal, members })
            })
            .collect::<XmlaResult<Vec<_>>>()?;
        Ok(Self { metadata, positions })
    }

    pub(crate) fn empty(ordinal: AxisOrdinal) -> Self {
        Self {
            metadata: AxisMetadata::empty(ordinal),
            positions: Vec::new(),
        }
    }

    pub fn ordinal(&self) -> AxisOrdinal {
        self.metadata.ordinal
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn unique_names(&self) -> impl Iterator<Item = &str> {
        self.positions
            .iter()
            .flat_map(|p| p.members.iter().map(|m| m.unique_name.as_str()))
    }
}

/// A position member joined with the schema member it refers to
///
/// Values carried by the position shadow the schema member's properties.
/// Members the server could not resolve, such as calculated members, have
/// no schema member and answer from the position alone.
#[derive(Debug, Clone)]
pub struct AxisMember {
    position: PositionMember,
    member: Option<Arc<Member>>,
}

impl AxisMember {
    pub(crate) fn new(position: PositionMember, member: Option<Arc<Member>>) -> Self {
        Self { position, member }
    }

    pub fn unique_name(&self) -> &str {
        &self.position.unique_name
    }

    pub fn caption(&self) -> &str {
        &self.position.caption
    }

    pub fn hierarchy(&self) -> &str {
        &self.position.hierarchy
    }

    pub fn position_member(&self) -> &PositionMember {
        &self.position
    }

    /// The schema member, when the server knows it
    pub fn member(&self) -> Option<&Arc<Member>> {
        self.member.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.member.is_some()
    }

    /// Property value: the position's own value first, then the schema member's
    pub fn property_value(&self, name: &str) -> Option<String> {
        self.position
            .properties
            .get(name)
            .cloned()
            .or_else(|| self.member.as_ref().and_then(|m| m.property_value(name)))
    }

    pub fn name(&self) -> &str {
        match &self.member {
            Some(member) => member.name(),
            None => &self.position.caption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(xml: &str) -> XmlElement {
        XmlElement::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_axis_names() {
        assert_eq!(AxisOrdinal::from_response_name("Axis1").unwrap(), AxisOrdinal::Axis(1));
        assert_eq!(
            AxisOrdinal::from_response_name("SlicerAxis").unwrap(),
            AxisOrdinal::Filter
        );
        assert!(AxisOrdinal::from_response_name("Sideways").is_err());
        assert_eq!(AxisOrdinal::Axis(0).to_string(), "COLUMNS");
        assert_eq!(AxisOrdinal::Axis(7).to_string(), "AXIS(7)");
    }

    #[test]
    fn test_position_member_maps_tags_to_properties() {
        let member = PositionMember::parse(&element(
            "<Member Hierarchy=\"Gender\"><UName>[Gender].[F]</UName><Caption>Female</Caption>\
             <LName>[Gender].[Gender]</LName><LNum>1</LNum><DisplayInfo>131074</DisplayInfo>\
             <PARENT_UNIQUE_NAME>[Gender].[All Gender]</PARENT_UNIQUE_NAME></Member>",
        ))
        .unwrap();
        assert_eq!(member.hierarchy, "Gender");
        assert_eq!(member.level_number, Some(1));
        assert_eq!(member.child_count_hint(), Some(2));
        assert_eq!(member.properties["MEMBER_CAPTION"], "Female");
        assert_eq!(member.properties["PARENT_UNIQUE_NAME"], "[Gender].[All Gender]");
    }

    #[test]
    fn test_bad_level_number_names_the_position() {
        let axis = element(
            "<Axis name=\"Axis1\"><Tuples><Tuple><Member Hierarchy=\"Gender\">\
             <UName>[Gender].[F]</UName><LNum>one</LNum></Member></Tuple></Tuples></Axis>",
        );
        let err = CellSetAxis::parse(&axis, AxisMetadata::empty(AxisOrdinal::Axis(1))).unwrap_err();
        assert!(err.to_string().starts_with("ROWS position 0"));
        assert!(matches!(err.root(), XmlaError::MalformedResponse(_)));
    }

    #[test]
    fn test_position_value_shadows_schema_member() {
        let position = PositionMember::parse(&element(
            "<Member Hierarchy=\"Gender\"><UName>[Gender].[F]</UName><Caption>Female</Caption></Member>",
        ))
        .unwrap();
        let schema = Arc::new(
            Member::new("[Gender].[F]", "F")
                .with_caption("F")
                .with_description("female customers"),
        );
        let member = AxisMember::new(position, Some(schema));
        assert_eq!(member.property_value("MEMBER_CAPTION").as_deref(), Some("Female"));
        assert_eq!(member.property_value("DESCRIPTION").as_deref(), Some("female customers"));
        assert_eq!(member.member().map(|m| m.caption()), Some("F"));
    }
}
