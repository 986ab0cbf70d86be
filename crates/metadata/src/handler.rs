// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Row handlers
//!
//! One handler per rowset. A handler names the request it materializes,
//! turns each response row into a domain object appended to the target list,
//! and may then re-order the list. Most rowsets keep server order.
//!
//! Coordinates a row omits are filled in from the [`Context`] the request
//! ran in.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use xmla_olap_protocol::{RequestType, Row, XmlaError, XmlaResult};

use crate::context::Context;
use crate::element::MetadataElement;
use crate::model::{
    Aggregator, Catalog, Cube, Datatype, Dimension, DimensionInfo, DimensionType, Hierarchy,
    HierarchyInfo, Level, LevelInfo, LevelType, MeasureInfo, Member, MemberType, NamedSet,
    Property, Schema, StandardMemberProperty, MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME,
};
use crate::reader::MetadataReader;

/// Materializes the rows of one rowset into domain objects
pub trait RowHandler<T>: Send + Sync {
    /// Rowset this handler consumes
    fn request_type(&self) -> RequestType;

    /// Turn one row into zero or more elements of `list`
    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<T>) -> XmlaResult<()>;

    /// Re-order the list once every row has been handled
    fn sort(&self, _context: &Context, _list: &mut Vec<T>) -> XmlaResult<()> {
        Ok(())
    }
}

fn required(row: &Row, column: &str, request_type: RequestType) -> XmlaResult<String> {
    row.string(column).ok_or_else(|| {
        XmlaError::MalformedResponse(format!("{} row has no {} column", request_type, column))
    })
}

fn int32(row: &Row, column: &str) -> Option<i32> {
    row.integer(column).and_then(|v| i32::try_from(v).ok())
}

fn require<'a, T>(value: Option<&'a Arc<T>>, what: &str, request_type: RequestType) -> XmlaResult<&'a Arc<T>> {
    value.ok_or_else(|| {
        XmlaError::InvariantViolation(format!("{} requires a {} in its context", request_type, what))
    })
}

pub struct CatalogHandler;

impl RowHandler<Arc<Catalog>> for CatalogHandler {
    fn request_type(&self) -> RequestType {
        RequestType::DbschemaCatalogs
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Catalog>>) -> XmlaResult<()> {
        let name = required(row, "CATALOG_NAME", self.request_type())?;
        list.push(Catalog::new(
            Arc::clone(context.session()),
            name,
            row.string("DESCRIPTION"),
        ));
        Ok(())
    }
}

pub struct SchemaHandler;

impl RowHandler<Arc<Schema>> for SchemaHandler {
    fn request_type(&self) -> RequestType {
        RequestType::DbschemaSchemata
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Schema>>) -> XmlaResult<()> {
        let catalog = require(context.catalog(), "catalog", self.request_type())?;
        let name = row.string("SCHEMA_NAME").unwrap_or_default();
        list.push(Schema::new(catalog, name));
        Ok(())
    }
}

/// Derives schemas from the distinct `SCHEMA_NAME`s of the cubes rowset, for
/// providers that do not serve `DBSCHEMA_SCHEMATA`
pub struct SchemaFromCubesHandler;

impl RowHandler<Arc<Schema>> for SchemaFromCubesHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaCubes
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Schema>>) -> XmlaResult<()> {
        let catalog = require(context.catalog(), "catalog", self.request_type())?;
        let name = row.string("SCHEMA_NAME").unwrap_or_default();
        if !list.iter().any(|s| s.name() == name) {
            list.push(Schema::new(catalog, name));
        }
        Ok(())
    }
}

pub struct CubeHandler;

impl RowHandler<Arc<Cube>> for CubeHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaCubes
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Cube>>) -> XmlaResult<()> {
        let schema = require(context.schema(), "schema", self.request_type())?;
        let name = required(row, "CUBE_NAME", self.request_type())?;
        list.push(Cube::new(
            schema,
            name,
            row.string("CUBE_CAPTION"),
            row.string("DESCRIPTION"),
        ));
        Ok(())
    }
}

pub struct DimensionHandler;

impl RowHandler<Arc<Dimension>> for DimensionHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaDimensions
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Dimension>>) -> XmlaResult<()> {
        let cube = context.require_cube("MDSCHEMA_DIMENSIONS")?;
        let name = required(row, "DIMENSION_NAME", self.request_type())?;
        let info = DimensionInfo {
            unique_name: row
                .string("DIMENSION_UNIQUE_NAME")
                .unwrap_or_else(|| crate::element::bracket(&name)),
            name,
            caption: row.string("DIMENSION_CAPTION"),
            description: row.string("DESCRIPTION"),
            dimension_type: DimensionType::from_code(row.integer("DIMENSION_TYPE").unwrap_or(0)),
            ordinal: int32(row, "DIMENSION_ORDINAL").unwrap_or(-1),
            default_hierarchy: row.string("DEFAULT_HIERARCHY"),
        };
        list.push(Dimension::new(cube, info));
        Ok(())
    }

    fn sort(&self, _context: &Context, list: &mut Vec<Arc<Dimension>>) -> XmlaResult<()> {
        list.sort_by_key(|d| d.ordinal());
        Ok(())
    }
}

/// Materializes hierarchies, keeping only those of one dimension when asked
pub struct HierarchyHandler {
    dimension: Option<String>,
}

impl HierarchyHandler {
    pub fn new() -> Self {
        Self { dimension: None }
    }

    /// Skip rows that belong to any other dimension
    pub fn for_dimension(unique_name: &str) -> Self {
        Self {
            dimension: Some(unique_name.to_string()),
        }
    }
}

impl Default for HierarchyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RowHandler<Arc<Hierarchy>> for HierarchyHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaHierarchies
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Hierarchy>>) -> XmlaResult<()> {
        let dimension_name = match row.string("DIMENSION_UNIQUE_NAME") {
            Some(name) => name,
            None => match context.dimension() {
                Some(dimension) => dimension.unique_name().to_string(),
                None => required(row, "DIMENSION_UNIQUE_NAME", self.request_type())?,
            },
        };
        if let Some(wanted) = &self.dimension {
            if *wanted != dimension_name {
                return Ok(());
            }
        }
        let Some(dimension) = context.resolve_dimension(&dimension_name)? else {
            debug!(dimension = %dimension_name, "skipping hierarchy of unknown dimension");
            return Ok(());
        };

        let name = required(row, "HIERARCHY_NAME", self.request_type())?;
        let info = HierarchyInfo {
            unique_name: row
                .string("HIERARCHY_UNIQUE_NAME")
                .unwrap_or_else(|| crate::element::bracket(&name)),
            name,
            caption: row.string("HIERARCHY_CAPTION"),
            description: row.string("DESCRIPTION"),
            default_member: row.string("DEFAULT_MEMBER"),
            all_member: row.string("ALL_MEMBER").filter(|s| !s.is_empty()),
            cardinality: row.integer("HIERARCHY_CARDINALITY").unwrap_or(0),
        };
        list.push(Hierarchy::new(&dimension, info));
        Ok(())
    }
}

pub struct LevelHandler;

impl RowHandler<Arc<Level>> for LevelHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaLevels
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Level>>) -> XmlaResult<()> {
        let hierarchy = match row.string("HIERARCHY_UNIQUE_NAME") {
            Some(name) => context.resolve_hierarchy(&name)?,
            None => context.hierarchy().cloned(),
        };
        let Some(hierarchy) = hierarchy else {
            debug!("skipping level of unknown hierarchy");
            return Ok(());
        };

        let name = required(row, "LEVEL_NAME", self.request_type())?;
        let info = LevelInfo {
            unique_name: required(row, "LEVEL_UNIQUE_NAME", self.request_type())?,
            name,
            caption: row.string("LEVEL_CAPTION"),
            description: row.string("DESCRIPTION"),
            depth: int32(row, "LEVEL_NUMBER").unwrap_or(0),
            level_type: LevelType::from_code(row.integer("LEVEL_TYPE").unwrap_or(0)),
            cardinality: row.integer("LEVEL_CARDINALITY").unwrap_or(0),
        };
        list.push(Level::new(&hierarchy, info));
        Ok(())
    }

    fn sort(&self, _context: &Context, list: &mut Vec<Arc<Level>>) -> XmlaResult<()> {
        list.sort_by_key(|l| l.depth());
        Ok(())
    }
}

/// Materializes measures and re-sorts them by member ordinal
///
/// The measures rowset carries no ordinal, so sorting looks up the members
/// of the measures level. That lookup bypasses the caching reader, whose
/// measures shortcut is not armed yet while measures are being loaded.
pub struct MeasureHandler;

impl RowHandler<Arc<Member>> for MeasureHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaMeasures
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Member>>) -> XmlaResult<()> {
        let cube = context.require_cube("MDSCHEMA_MEASURES")?;
        let name = required(row, "MEASURE_NAME", self.request_type())?;
        let unique_name = row
            .string("MEASURE_UNIQUE_NAME")
            .unwrap_or_else(|| format!("{}.{}", MEASURES_UNIQUE_NAME, crate::element::bracket(&name)));
        let info = MeasureInfo {
            aggregator: Aggregator::from_code(row.integer("MEASURE_AGGREGATOR").unwrap_or(0)),
            datatype: Datatype::from_code(row.integer("DATA_TYPE").unwrap_or(0)),
            visible: row.boolean("MEASURE_IS_VISIBLE").unwrap_or(true),
            measure_group: row.string("MEASUREGROUP_NAME"),
        };

        let mut member = Member::new(unique_name, name)
            .in_cube(Arc::downgrade(cube))
            .with_level(MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME, MEASURES_UNIQUE_NAME)
            .with_measure(info);
        if let Some(caption) = row.string("MEASURE_CAPTION") {
            member = member.with_caption(caption);
        }
        if let Some(description) = row.string("DESCRIPTION") {
            member = member.with_description(description);
        }
        list.push(Arc::new(member));
        Ok(())
    }

    fn sort(&self, context: &Context, list: &mut Vec<Arc<Member>>) -> XmlaResult<()> {
        if list.is_empty() {
            return Ok(());
        }
        let cube = context.require_cube("MDSCHEMA_MEASURES")?;
        let ordinals: HashMap<String, i32> = cube
            .metadata_reader()
            .raw()
            .level_members_by_unique_name(MEASURES_LEVEL_UNIQUE_NAME)?
            .into_iter()
            .map(|m| (m.unique_name().to_string(), m.ordinal()))
            .collect();

        let sorted: Vec<Arc<Member>> = list
            .drain(..)
            .map(|measure| match ordinals.get(measure.unique_name()) {
                Some(&ordinal) => Arc::new((*measure).clone().with_ordinal(ordinal)),
                None => measure,
            })
            .collect();
        list.extend(sorted);
        // Measures without a known ordinal keep server order, after the rest.
        list.sort_by_key(|m| (m.ordinal() < 0, m.ordinal()));
        Ok(())
    }
}

/// Materializes members, filling level coordinates from the context
pub struct MemberHandler;

/// Columns that map onto member fields rather than the property map
const MEMBER_STRUCTURAL_COLUMNS: &[&str] = &["CATALOG_NAME", "SCHEMA_NAME", "CUBE_NAME"];

impl RowHandler<Arc<Member>> for MemberHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaMembers
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Member>>) -> XmlaResult<()> {
        let cube = context.require_cube("MDSCHEMA_MEMBERS")?;
        let unique_name = required(row, "MEMBER_UNIQUE_NAME", self.request_type())?;
        let name = row.string("MEMBER_NAME").unwrap_or_else(|| unique_name.clone());

        let level = row
            .string("LEVEL_UNIQUE_NAME")
            .or_else(|| context.level().map(|l| l.unique_name().to_string()))
            .unwrap_or_default();
        let hierarchy = row
            .string("HIERARCHY_UNIQUE_NAME")
            .or_else(|| context.hierarchy().map(|h| h.unique_name().to_string()))
            .unwrap_or_default();
        let dimension = row
            .string("DIMENSION_UNIQUE_NAME")
            .or_else(|| context.dimension().map(|d| d.unique_name().to_string()))
            .unwrap_or_default();
        let depth = int32(row, "LEVEL_NUMBER")
            .or_else(|| context.level().map(|l| l.depth()))
            .unwrap_or(0);

        let mut member = Member::new(unique_name, name)
            .in_cube(Arc::downgrade(cube))
            .with_level(level, hierarchy, dimension)
            .with_depth(depth)
            .with_ordinal(int32(row, "MEMBER_ORDINAL").unwrap_or(-1))
            .with_child_count(int32(row, "CHILDREN_CARDINALITY").unwrap_or(0))
            .with_type(MemberType::from_code(row.integer("MEMBER_TYPE").unwrap_or(1)));
        if let Some(caption) = row.string("MEMBER_CAPTION") {
            member = member.with_caption(caption);
        }
        if let Some(description) = row.string("DESCRIPTION") {
            member = member.with_description(description);
        }
        if let Some(parent) = row.string("PARENT_UNIQUE_NAME").filter(|p| !p.is_empty()) {
            member = member.with_parent(parent);
        }
        for (column, value) in row.columns() {
            if StandardMemberProperty::from_column(column).is_none()
                && !MEMBER_STRUCTURAL_COLUMNS.contains(&column)
            {
                member = member.with_property(column, value);
            }
        }
        list.push(Arc::new(member));
        Ok(())
    }
}

pub struct NamedSetHandler;

impl RowHandler<Arc<NamedSet>> for NamedSetHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaSets
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<NamedSet>>) -> XmlaResult<()> {
        let cube = context.require_cube("MDSCHEMA_SETS")?;
        let name = required(row, "SET_NAME", self.request_type())?;
        list.push(NamedSet::new(
            cube,
            name,
            row.string("SET_CAPTION"),
            row.string("DESCRIPTION"),
            row.string("EXPRESSION").unwrap_or_default(),
        ));
        Ok(())
    }
}

pub struct PropertyHandler;

impl RowHandler<Arc<Property>> for PropertyHandler {
    fn request_type(&self) -> RequestType {
        RequestType::MdschemaProperties
    }

    fn handle(&self, row: &Row, context: &Context, list: &mut Vec<Arc<Property>>) -> XmlaResult<()> {
        let name = required(row, "PROPERTY_NAME", self.request_type())?;
        let level = row
            .string("LEVEL_UNIQUE_NAME")
            .or_else(|| context.level().map(|l| l.unique_name().to_string()));
        let Some(level) = level else {
            warn!(property = %name, "property row without a level");
            return Ok(());
        };
        list.push(Arc::new(Property::new(
            name,
            row.string("PROPERTY_CAPTION"),
            row.string("DESCRIPTION"),
            Datatype::from_code(row.integer("DATA_TYPE").unwrap_or(0)),
            level,
        )));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_graph;

    #[test]
    fn test_dimensions_sorted_by_ordinal() {
        let g = sample_graph();
        let context = Context::for_cube(&g.cube).unwrap();
        let rows = [
            Row::new([("DIMENSION_NAME", "Store"), ("DIMENSION_UNIQUE_NAME", "[Store]"), ("DIMENSION_ORDINAL", "3")]),
            Row::new([("DIMENSION_NAME", "Measures"), ("DIMENSION_UNIQUE_NAME", "[Measures]"), ("DIMENSION_ORDINAL", "0"), ("DIMENSION_TYPE", "2")]),
            Row::new([("DIMENSION_NAME", "Time"), ("DIMENSION_UNIQUE_NAME", "[Time]"), ("DIMENSION_ORDINAL", "1"), ("DIMENSION_TYPE", "1")]),
        ];
        let mut list = Vec::new();
        for row in &rows {
            DimensionHandler.handle(row, &context, &mut list).unwrap();
        }
        DimensionHandler.sort(&context, &mut list).unwrap();

        let names: Vec<_> = list.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["Measures", "Time", "Store"]);
        assert!(list[0].is_measures());
        assert_eq!(list[1].dimension_type(), DimensionType::Time);
    }

    #[test]
    fn test_hierarchy_handler_filters_other_dimensions() {
        let g = sample_graph();
        let context = Context::for_dimension(&g.dimension).unwrap();
        let handler = HierarchyHandler::for_dimension("[Gender]");
        let rows = [
            Row::new([("DIMENSION_UNIQUE_NAME", "[Store]"), ("HIERARCHY_NAME", "Store"), ("HIERARCHY_UNIQUE_NAME", "[Store]")]),
            Row::new([
                ("DIMENSION_UNIQUE_NAME", "[Gender]"),
                ("HIERARCHY_NAME", "Gender"),
                ("HIERARCHY_UNIQUE_NAME", "[Gender]"),
                ("ALL_MEMBER", "[Gender].[All Gender]"),
                ("DEFAULT_MEMBER", "[Gender].[All Gender]"),
            ]),
        ];
        let mut list = Vec::new();
        for row in &rows {
            handler.handle(row, &context, &mut list).unwrap();
        }
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].unique_name(), "[Gender]");
        assert!(list[0].has_all());
        assert_eq!(list[0].dimension_unique_name(), "[Gender]");
    }

    #[test]
    fn test_levels_sorted_by_depth() {
        let g = sample_graph();
        let context = Context::for_hierarchy(&g.hierarchy).unwrap();
        let rows = [
            Row::new([("HIERARCHY_UNIQUE_NAME", "[Gender]"), ("LEVEL_NAME", "Gender"), ("LEVEL_UNIQUE_NAME", "[Gender].[Gender]"), ("LEVEL_NUMBER", "1")]),
            Row::new([("HIERARCHY_UNIQUE_NAME", "[Gender]"), ("LEVEL_NAME", "(All)"), ("LEVEL_UNIQUE_NAME", "[Gender].[(All)]"), ("LEVEL_NUMBER", "0"), ("LEVEL_TYPE", "1")]),
        ];
        let mut list = Vec::new();
        for row in &rows {
            LevelHandler.handle(row, &context, &mut list).unwrap();
        }
        LevelHandler.sort(&context, &mut list).unwrap();
        assert_eq!(list[0].name(), "(All)");
        assert_eq!(list[0].level_type(), LevelType::All);
        assert_eq!(list[1].depth(), 1);
    }

    #[test]
    fn test_member_handler_fills_coordinates_from_context() {
        let g = sample_graph();
        let context = Context::for_level(&g.level).unwrap();
        let row = Row::new([
            ("CATALOG_NAME", "FoodMart"),
            ("CUBE_NAME", "Sales"),
            ("MEMBER_UNIQUE_NAME", "[Gender].[All Gender].[F]"),
            ("MEMBER_NAME", "F"),
            ("MEMBER_ORDINAL", "1"),
            ("MEMBER_TYPE", "1"),
            ("PARENT_UNIQUE_NAME", "[Gender].[All Gender]"),
            ("DISPLAY_INFO", "131072"),
        ]);
        let mut list = Vec::new();
        MemberHandler.handle(&row, &context, &mut list).unwrap();

        let member = &list[0];
        assert_eq!(member.level_unique_name(), "[Gender].[Gender]");
        assert_eq!(member.hierarchy_unique_name(), "[Gender]");
        assert_eq!(member.dimension_unique_name(), "[Gender]");
        assert_eq!(member.depth(), 1);
        assert_eq!(member.ordinal(), 1);
        assert_eq!(member.properties().get("DISPLAY_INFO").map(String::as_str), Some("131072"));
        assert!(!member.properties().contains_key("CUBE_NAME"));
        assert!(!member.properties().contains_key("MEMBER_NAME"));
    }

    #[test]
    fn test_member_row_without_unique_name_is_malformed() {
        let g = sample_graph();
        let context = Context::for_cube(&g.cube).unwrap();
        let row = Row::new([("MEMBER_NAME", "F")]);
        let err = MemberHandler.handle(&row, &context, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, XmlaError::MalformedResponse(_)));
    }

    #[test]
    fn test_schemas_from_cubes_are_distinct() {
        let g = sample_graph();
        let context = Context::for_catalog(&g.catalog);
        let rows = [
            Row::new([("SCHEMA_NAME", "FoodMart"), ("CUBE_NAME", "Sales")]),
            Row::new([("SCHEMA_NAME", "FoodMart"), ("CUBE_NAME", "Warehouse")]),
            Row::new([("SCHEMA_NAME", "Steel Wheels"), ("CUBE_NAME", "Orders")]),
        ];
        let mut list = Vec::new();
        for row in &rows {
            SchemaFromCubesHandler.handle(row, &context, &mut list).unwrap();
        }
        let names: Vec<_> = list.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["FoodMart", "Steel Wheels"]);
    }

    #[test]
    fn test_cube_handler_requires_schema() {
        let g = sample_graph();
        let context = Context::for_catalog(&g.catalog);
        let row = Row::new([("CUBE_NAME", "Sales")]);
        let err = CubeHandler.handle(&row, &context, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, XmlaError::InvariantViolation(_)));
    }
}
