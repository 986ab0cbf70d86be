// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Members and measures
//!
//! Members are not stored under their level; they are fetched on demand
//! through the cube's metadata reader. A member refers to its parent and its
//! level by unique name and resolves them lazily through the same reader, so
//! materializing one member never materializes its ancestor chain.
//!
//! A measure is a member of the `[Measures]` dimension that additionally
//! carries an aggregator and a datatype.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use xmla_olap_protocol::{TreeOps, XmlaResult};

use super::cube::Cube;
use super::level::Level;
use super::upgrade;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::reader::MetadataReader;

/// Unique name of the level that holds all measures
pub const MEASURES_LEVEL_UNIQUE_NAME: &str = "[Measures].[MeasuresLevel]";

/// Unique name of the measures dimension and hierarchy
pub const MEASURES_UNIQUE_NAME: &str = "[Measures]";

/// Kind of member, from the `MEMBER_TYPE` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberType {
    #[default]
    Unknown,
    Regular,
    All,
    Measure,
    Formula,
}

impl MemberType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MemberType::Regular,
            2 => MemberType::All,
            3 => MemberType::Measure,
            4 => MemberType::Formula,
            _ => MemberType::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            MemberType::Unknown => 0,
            MemberType::Regular => 1,
            MemberType::All => 2,
            MemberType::Measure => 3,
            MemberType::Formula => 4,
        }
    }
}

/// How a measure aggregates, from `MEASURE_AGGREGATOR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aggregator {
    #[default]
    Unknown,
    Sum,
    Count,
    Min,
    Max,
    Avg,
    Var,
    Std,
    DistinctCount,
    Calculated,
}

impl Aggregator {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Aggregator::Sum,
            2 => Aggregator::Count,
            3 => Aggregator::Min,
            4 => Aggregator::Max,
            5 => Aggregator::Avg,
            6 => Aggregator::Var,
            7 => Aggregator::Std,
            8 => Aggregator::DistinctCount,
            127 => Aggregator::Calculated,
            _ => Aggregator::Unknown,
        }
    }
}

/// OLE DB datatype of a measure or property, from `DATA_TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Datatype {
    #[default]
    Unknown,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Single,
    Double,
    Currency,
    Decimal,
    Numeric,
    Date,
    String,
}

impl Datatype {
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Datatype::SmallInt,
            3 => Datatype::Integer,
            4 => Datatype::Single,
            5 => Datatype::Double,
            6 => Datatype::Currency,
            7 | 133 | 135 => Datatype::Date,
            8 | 129 | 130 => Datatype::String,
            11 => Datatype::Boolean,
            14 => Datatype::Decimal,
            16 | 17 => Datatype::TinyInt,
            20 | 21 => Datatype::BigInt,
            131 => Datatype::Numeric,
            _ => Datatype::Unknown,
        }
    }
}

/// Attributes that make a member a measure
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeasureInfo {
    pub aggregator: Aggregator,
    pub datatype: Datatype,
    pub visible: bool,
    pub measure_group: Option<String>,
}

/// Standard member properties, available on every member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardMemberProperty {
    MemberUniqueName,
    MemberName,
    MemberCaption,
    MemberOrdinal,
    MemberType,
    ChildrenCardinality,
    ParentUniqueName,
    LevelUniqueName,
    LevelNumber,
    HierarchyUniqueName,
    DimensionUniqueName,
    Description,
    Depth,
}

impl StandardMemberProperty {
    pub const ALL: [StandardMemberProperty; 13] = [
        StandardMemberProperty::MemberUniqueName,
        StandardMemberProperty::MemberName,
        StandardMemberProperty::MemberCaption,
        StandardMemberProperty::MemberOrdinal,
        StandardMemberProperty::MemberType,
        StandardMemberProperty::ChildrenCardinality,
        StandardMemberProperty::ParentUniqueName,
        StandardMemberProperty::LevelUniqueName,
        StandardMemberProperty::LevelNumber,
        StandardMemberProperty::HierarchyUniqueName,
        StandardMemberProperty::DimensionUniqueName,
        StandardMemberProperty::Description,
        StandardMemberProperty::Depth,
    ];

    /// Rowset column name of the property
    pub fn column(self) -> &'static str {
        match self {
            StandardMemberProperty::MemberUniqueName => "MEMBER_UNIQUE_NAME",
            StandardMemberProperty::MemberName => "MEMBER_NAME",
            StandardMemberProperty::MemberCaption => "MEMBER_CAPTION",
            StandardMemberProperty::MemberOrdinal => "MEMBER_ORDINAL",
            StandardMemberProperty::MemberType => "MEMBER_TYPE",
            StandardMemberProperty::ChildrenCardinality => "CHILDREN_CARDINALITY",
            StandardMemberProperty::ParentUniqueName => "PARENT_UNIQUE_NAME",
            StandardMemberProperty::LevelUniqueName => "LEVEL_UNIQUE_NAME",
            StandardMemberProperty::LevelNumber => "LEVEL_NUMBER",
            StandardMemberProperty::HierarchyUniqueName => "HIERARCHY_UNIQUE_NAME",
            StandardMemberProperty::DimensionUniqueName => "DIMENSION_UNIQUE_NAME",
            StandardMemberProperty::Description => "DESCRIPTION",
            StandardMemberProperty::Depth => "DEPTH",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.column() == column)
    }
}

/// A member of a level
#[derive(Debug, Clone)]
pub struct Member {
    cube: Weak<Cube>,
    unique_name: String,
    name: String,
    caption: Option<String>,
    description: Option<String>,
    parent_unique_name: Option<String>,
    level_unique_name: String,
    hierarchy_unique_name: String,
    dimension_unique_name: String,
    depth: i32,
    ordinal: i32,
    child_member_count: i32,
    member_type: MemberType,
    properties: HashMap<String, String>,
    measure: Option<MeasureInfo>,
}

impl_identity_by_unique_name!(Member);

impl MetadataElement for Member {
    fn unique_name(&self) -> &str {
        &self.unique_name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn caption(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.name)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Member {
    /// Create a detached member with builder pattern
    pub fn new(unique_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cube: Weak::new(),
            unique_name: unique_name.into(),
            name: name.into(),
            caption: None,
            description: None,
            parent_unique_name: None,
            level_unique_name: String::new(),
            hierarchy_unique_name: String::new(),
            dimension_unique_name: String::new(),
            depth: 0,
            ordinal: -1,
            child_member_count: 0,
            member_type: MemberType::Regular,
            properties: HashMap::new(),
            measure: None,
        }
    }

    /// Builder method: attach to a cube, through which relatives resolve
    pub fn in_cube(mut self, cube: Weak<Cube>) -> Self {
        self.cube = cube;
        self
    }

    /// Builder method: set caption
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method: set parent unique name
    pub fn with_parent(mut self, parent_unique_name: impl Into<String>) -> Self {
        self.parent_unique_name = Some(parent_unique_name.into());
        self
    }

    /// Builder method: set the level, hierarchy and dimension unique names
    pub fn with_level(
        mut self,
        level: impl Into<String>,
        hierarchy: impl Into<String>,
        dimension: impl Into<String>,
    ) -> Self {
        self.level_unique_name = level.into();
        self.hierarchy_unique_name = hierarchy.into();
        self.dimension_unique_name = dimension.into();
        self
    }

    /// Builder method: set depth (level number)
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Builder method: set ordinal
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Builder method: set child member count
    pub fn with_child_count(mut self, count: i32) -> Self {
        self.child_member_count = count;
        self
    }

    /// Builder method: set member type
    pub fn with_type(mut self, member_type: MemberType) -> Self {
        self.member_type = member_type;
        self
    }

    /// Builder method: add a non-standard property value
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder method: make this member a measure
    pub fn with_measure(mut self, info: MeasureInfo) -> Self {
        self.member_type = MemberType::Measure;
        self.measure = Some(info);
        self
    }

    pub fn parent_unique_name(&self) -> Option<&str> {
        self.parent_unique_name.as_deref()
    }

    pub fn level_unique_name(&self) -> &str {
        &self.level_unique_name
    }

    pub fn hierarchy_unique_name(&self) -> &str {
        &self.hierarchy_unique_name
    }

    pub fn dimension_unique_name(&self) -> &str {
        &self.dimension_unique_name
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Position among the members of the hierarchy; -1 when unknown
    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    pub fn child_member_count(&self) -> i32 {
        self.child_member_count
    }

    pub fn member_type(&self) -> MemberType {
        self.member_type
    }

    pub fn is_measure(&self) -> bool {
        self.member_type == MemberType::Measure
    }

    pub fn is_all(&self) -> bool {
        self.member_type == MemberType::All
    }

    pub fn measure_info(&self) -> Option<&MeasureInfo> {
        self.measure.as_ref()
    }

    /// Non-standard property values sent by the server
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Value of a standard property, computed from structural fields
    pub fn standard_property(&self, property: StandardMemberProperty) -> Option<String> {
        match property {
            StandardMemberProperty::MemberUniqueName => Some(self.unique_name.clone()),
            StandardMemberProperty::MemberName => Some(self.name.clone()),
            StandardMemberProperty::MemberCaption => Some(self.caption().to_string()),
            StandardMemberProperty::MemberOrdinal => Some(self.ordinal.to_string()),
            StandardMemberProperty::MemberType => Some(self.member_type.code().to_string()),
            StandardMemberProperty::ChildrenCardinality => {
                Some(self.child_member_count.to_string())
            }
            StandardMemberProperty::ParentUniqueName => self.parent_unique_name.clone(),
            StandardMemberProperty::LevelUniqueName => Some(self.level_unique_name.clone()),
            StandardMemberProperty::LevelNumber | StandardMemberProperty::Depth => {
                Some(self.depth.to_string())
            }
            StandardMemberProperty::HierarchyUniqueName => {
                Some(self.hierarchy_unique_name.clone())
            }
            StandardMemberProperty::DimensionUniqueName => {
                Some(self.dimension_unique_name.clone())
            }
            StandardMemberProperty::Description => self.description.clone(),
        }
    }

    /// Value of a property by name
    ///
    /// Sparse server-sent values win; standard properties are computed from
    /// the member's fields when the map has no entry.
    pub fn property_value(&self, name: &str) -> Option<String> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.clone());
        }
        StandardMemberProperty::from_column(name).and_then(|p| self.standard_property(p))
    }

    /// The cube this member belongs to
    pub fn cube(&self) -> XmlaResult<Arc<Cube>> {
        upgrade(&self.cube, "cube")
    }

    /// The member's level, resolved through the cube
    pub fn level(&self) -> XmlaResult<Option<Arc<Level>>> {
        self.cube()?.lookup_level(&self.level_unique_name)
    }

    /// The parent member, resolved through the cube's metadata reader
    pub fn parent(&self) -> XmlaResult<Option<Arc<Member>>> {
        match &self.parent_unique_name {
            Some(parent) if !parent.is_empty() => {
                self.cube()?.metadata_reader().lookup_member_by_unique_name(parent)
            }
            _ => Ok(None),
        }
    }

    /// Immediate children
    pub fn children(&self) -> XmlaResult<Vec<Arc<Member>>> {
        self.relatives(TreeOps::CHILDREN)
    }

    /// All ancestors
    pub fn ancestors(&self) -> XmlaResult<Vec<Arc<Member>>> {
        self.relatives(TreeOps::ANCESTORS)
    }

    /// Relatives selected by a set of tree operations
    pub fn relatives(&self, ops: TreeOps) -> XmlaResult<Vec<Arc<Member>>> {
        self.cube()?
            .metadata_reader()
            .lookup_member_relatives(ops, &self.unique_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn female() -> Member {
        Member::new("[Gender].[All Gender].[F]", "F")
            .with_caption("Female")
            .with_parent("[Gender].[All Gender]")
            .with_level("[Gender].[Gender]", "[Gender]", "[Gender]")
            .with_depth(1)
            .with_ordinal(2)
            .with_property("DISPLAY_INFO", "65536")
    }

    #[test]
    fn test_property_value_prefers_sparse_map() {
        let member = female().with_property("MEMBER_CAPTION", "F (server)");
        assert_eq!(member.property_value("MEMBER_CAPTION").as_deref(), Some("F (server)"));
        assert_eq!(member.property_value("DISPLAY_INFO").as_deref(), Some("65536"));
    }

    #[test]
    fn test_property_value_falls_back_to_standard() {
        let member = female();
        assert_eq!(member.property_value("MEMBER_CAPTION").as_deref(), Some("Female"));
        assert_eq!(member.property_value("MEMBER_ORDINAL").as_deref(), Some("2"));
        assert_eq!(
            member.property_value("PARENT_UNIQUE_NAME").as_deref(),
            Some("[Gender].[All Gender]")
        );
        assert_eq!(member.property_value("LEVEL_NUMBER").as_deref(), Some("1"));
        assert_eq!(member.property_value("NO_SUCH_PROPERTY"), None);
    }

    #[test]
    fn test_equality_by_unique_name() {
        let a = female();
        let b = Member::new("[Gender].[All Gender].[F]", "other name").with_ordinal(9);
        let c = Member::new("[Gender].[All Gender].[M]", "F");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_caption_falls_back_to_name() {
        let member = Member::new("[Store].[USA]", "USA");
        assert_eq!(member.caption(), "USA");
    }

    #[test]
    fn test_detached_member_has_no_cube() {
        let member = female();
        assert!(member.parent().is_err());
    }

    #[test]
    fn test_measure_builder() {
        let measure = Member::new("[Measures].[Unit Sales]", "Unit Sales").with_measure(MeasureInfo {
            aggregator: Aggregator::from_code(1),
            datatype: Datatype::from_code(5),
            visible: true,
            measure_group: None,
        });
        assert!(measure.is_measure());
        assert_eq!(measure.measure_info().unwrap().aggregator, Aggregator::Sum);
        assert_eq!(measure.measure_info().unwrap().datatype, Datatype::Double);
    }

    #[test]
    fn test_member_type_codes() {
        for code in 0..5 {
            assert_eq!(MemberType::from_code(code).code(), code);
        }
    }
}
