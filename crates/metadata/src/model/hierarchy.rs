// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use xmla_olap_protocol::XmlaResult;

use super::{upgrade, Cube, Dimension, Level, Member};
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::handler::LevelHandler;
use crate::reader::MetadataReader;

/// Row-derived attributes of a hierarchy
#[derive(Debug, Clone, Default)]
pub(crate) struct HierarchyInfo {
    pub unique_name: String,
    pub name: String,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub default_member: Option<String>,
    pub all_member: Option<String>,
    pub cardinality: i64,
}

pub struct Hierarchy {
    dimension: Weak<Dimension>,
    cube: Weak<Cube>,
    dimension_unique_name: String,
    info: HierarchyInfo,
    levels: DeferredNamedList<Arc<Level>>,
}

impl_identity_by_unique_name!(Hierarchy);

impl MetadataElement for Hierarchy {
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

impl Hierarchy {
    pub(crate) fn new(dimension: &Arc<Dimension>, info: HierarchyInfo) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Hierarchy>| {
            let weak = weak.clone();
            Hierarchy {
                dimension: Arc::downgrade(dimension),
                cube: dimension.cube_ref().clone(),
                dimension_unique_name: dimension.unique_name().to_string(),
                info,
                levels: DeferredNamedList::new(move || {
                    let hierarchy = upgrade(&weak, "hierarchy")?;
                    hierarchy.load_levels()
                }),
            }
        })
    }

    pub fn dimension(&self) -> XmlaResult<Arc<Dimension>> {
        upgrade(&self.dimension, "dimension")
    }

    pub fn cube(&self) -> XmlaResult<Arc<Cube>> {
        upgrade(&self.cube, "cube")
    }

    pub(crate) fn cube_ref(&self) -> &Weak<Cube> {
        &self.cube
    }

    pub fn dimension_unique_name(&self) -> &str {
        &self.dimension_unique_name
    }

    /// Unique name of the hierarchy's default member
    pub fn default_member_unique_name(&self) -> Option<&str> {
        self.info.default_member.as_deref()
    }

    /// Unique name of the `All` member, if the hierarchy has one
    pub fn all_member_unique_name(&self) -> Option<&str> {
        self.info.all_member.as_deref()
    }

    pub fn has_all(&self) -> bool {
        self.info.all_member.is_some()
    }

    pub fn cardinality(&self) -> i64 {
        self.info.cardinality
    }

    /// Levels, fetched on first access and sorted by depth
    pub fn levels(&self) -> &DeferredNamedList<Arc<Level>> {
        &self.levels
    }

    pub fn default_member(&self) -> XmlaResult<Option<Arc<Member>>> {
        match &self.info.default_member {
            Some(name) => self.cube()?.metadata_reader().lookup_member_by_unique_name(name),
            None => Ok(None),
        }
    }

    /// Members of the top level
    pub fn root_members(&self) -> XmlaResult<Vec<Arc<Member>>> {
        match self.levels.get(0)? {
            Some(level) => level.members(),
            None => Ok(Vec::new()),
        }
    }

    fn load_levels(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Level>>> {
        let cube = self.cube()?;
        let context = Context::for_hierarchy(self)?;
        let restrictions = cube
            .restrictions()
            .with("DIMENSION_UNIQUE_NAME", self.dimension_unique_name.as_str())
            .with("HIERARCHY_UNIQUE_NAME", self.info.unique_name.as_str());
        let mut levels = Vec::new();
        cube.session()
            .populate_list(&context, &LevelHandler, &restrictions, &mut levels)?;
        Ok(levels)
    }

    #[cfg(test)]
    pub(crate) fn preload(&self, levels: Vec<Arc<Level>>) {
        self.levels.preload(levels);
    }
}

impl std::fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hierarchy")
            .field("unique_name", &self.info.unique_name)
            .field("levels", &self.levels)
            .finish()
    }
}
