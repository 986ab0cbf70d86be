// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use xmla_olap_protocol::XmlaResult;

use super::{upgrade, Cube, Hierarchy, Member, Property, MEASURES_LEVEL_UNIQUE_NAME};
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::handler::PropertyHandler;
use crate::reader::MetadataReader;

/// Kind of level, from the `LEVEL_TYPE` bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LevelType {
    #[default]
    Regular,
    All,
    Calculated,
    Time,
    TimeYears,
    TimeHalfYears,
    TimeQuarters,
    TimeMonths,
    TimeWeeks,
    TimeDays,
    TimeHours,
    TimeMinutes,
    TimeSeconds,
}

impl LevelType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0x0001 => LevelType::All,
            0x0002 => LevelType::Calculated,
            0x0004 => LevelType::Time,
            0x0014 => LevelType::TimeYears,
            0x0024 => LevelType::TimeHalfYears,
            0x0044 => LevelType::TimeQuarters,
            0x0084 => LevelType::TimeMonths,
            0x0104 => LevelType::TimeWeeks,
            0x0204 => LevelType::TimeDays,
            0x0304 => LevelType::TimeHours,
            0x0404 => LevelType::TimeMinutes,
            0x0804 => LevelType::TimeSeconds,
            _ => LevelType::Regular,
        }
    }

    pub fn is_time(self) -> bool {
        !matches!(self, LevelType::Regular | LevelType::All | LevelType::Calculated)
    }
}

/// Row-derived attributes of a level
#[derive(Debug, Clone, Default)]
pub(crate) struct LevelInfo {
    pub unique_name: String,
    pub name: String,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub depth: i32,
    pub level_type: LevelType,
    pub cardinality: i64,
}

pub struct Level {
    hierarchy: Weak<Hierarchy>,
    cube: Weak<Cube>,
    hierarchy_unique_name: String,
    dimension_unique_name: String,
    info: LevelInfo,
    properties: DeferredNamedList<Arc<Property>>,
}

impl_identity_by_unique_name!(Level);

impl MetadataElement for Level {
    fn unique_name(&self) -> &str {
        &self.info.unique_name
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn caption(&self) -> &str {
        self.info.caption.as_deref().unwrap_or(&self.info.name)
    }

    fn description(&self) -> Option<&str> {
        self.info.description.as_deref()
    }
}

impl Level {
    pub(crate) fn new(hierarchy: &Arc<Hierarchy>, info: LevelInfo) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Level>| {
            let weak = weak.clone();
            Level {
                hierarchy: Arc::downgrade(hierarchy),
                cube: hierarchy.cube_ref().clone(),
                hierarchy_unique_name: hierarchy.unique_name().to_string(),
                dimension_unique_name: hierarchy.dimension_unique_name().to_string(),
                info,
                properties: DeferredNamedList::new(move || {
                    let level = upgrade(&weak, "level")?;
                    level.load_properties()
                }),
            }
        })
    }

    pub fn hierarchy(&self) -> XmlaResult<Arc<Hierarchy>> {
        upgrade(&self.hierarchy, "hierarchy")
    }

    pub fn cube(&self) -> XmlaResult<Arc<Cube>> {
        upgrade(&self.cube, "cube")
    }

    pub fn hierarchy_unique_name(&self) -> &str {
        &self.hierarchy_unique_name
    }

    pub fn dimension_unique_name(&self) -> &str {
        &self.dimension_unique_name
    }

    /// Distance from the root level; the `All` level has depth 0
    pub fn depth(&self) -> i32 {
        self.info.depth
    }

    pub fn level_type(&self) -> LevelType {
        self.info.level_type
    }

    pub fn cardinality(&self) -> i64 {
        self.info.cardinality
    }

    pub fn is_measures(&self) -> bool {
        self.info.unique_name == MEASURES_LEVEL_UNIQUE_NAME
    }

    /// User-defined member properties of this level
    pub fn properties(&self) -> &DeferredNamedList<Arc<Property>> {
        &self.properties
    }

    /// Members of this level, through the cube's caching reader
    pub fn members(&self) -> XmlaResult<Vec<Arc<Member>>> {
        self.cube()?.metadata_reader().level_members(self)
    }

    fn load_properties(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Property>>> {
        let cube = self.cube()?;
        let context = Context::for_level(self)?;
        let restrictions = cube
            .restrictions()
            .with("DIMENSION_UNIQUE_NAME", self.dimension_unique_name.as_str())
            .with("HIERARCHY_UNIQUE_NAME", self.hierarchy_unique_name.as_str())
            .with("LEVEL_UNIQUE_NAME", self.info.unique_name.as_str())
            .with("PROPERTY_TYPE", "1");
        let mut properties = Vec::new();
        cube.session()
            .populate_list(&context, &PropertyHandler, &restrictions, &mut properties)?;
        Ok(properties)
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("unique_name", &self.info.unique_name)
            .field("depth", &self.info.depth)
            .field("properties", &self.properties)
            .finish()
    }
}
