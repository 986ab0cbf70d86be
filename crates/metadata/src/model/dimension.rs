// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use tracing::warn;
use xmla_olap_protocol::XmlaResult;

use super::{is_provider_rejection, upgrade, Cube, Hierarchy};
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::handler::HierarchyHandler;

/// Kind of dimension, from the `DIMENSION_TYPE` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DimensionType {
    #[default]
    Unknown,
    Time,
    Measure,
    Other,
    Quantitative,
    Accounts,
    Customers,
    Products,
    Scenario,
    Utility,
    Currency,
    Rates,
    Channel,
    Promotion,
    Organization,
    BillOfMaterials,
    Geography,
}

impl DimensionType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => DimensionType::Time,
            2 => DimensionType::Measure,
            3 => DimensionType::Other,
            5 => DimensionType::Quantitative,
            6 => DimensionType::Accounts,
            7 => DimensionType::Customers,
            8 => DimensionType::Products,
            9 => DimensionType::Scenario,
            10 => DimensionType::Utility,
            11 => DimensionType::Currency,
            12 => DimensionType::Rates,
            13 => DimensionType::Channel,
            14 => DimensionType::Promotion,
            15 => DimensionType::Organization,
            16 => DimensionType::BillOfMaterials,
            17 => DimensionType::Geography,
            _ => DimensionType::Unknown,
        }
    }
}

/// Row-derived attributes of a dimension
#[derive(Debug, Clone, Default)]
pub(crate) struct DimensionInfo {
    pub unique_name: String,
    pub name: String,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub dimension_type: DimensionType,
    pub ordinal: i32,
    pub default_hierarchy: Option<String>,
}

pub struct Dimension {
    cube: Weak<Cube>,
    info: DimensionInfo,
    hierarchies: DeferredNamedList<Arc<Hierarchy>>,
}

impl_identity_by_unique_name!(Dimension);

impl MetadataElement for Dimension {
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

impl Dimension {
    pub(crate) fn new(cube: &Arc<Cube>, info: DimensionInfo) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Dimension>| {
            let weak = weak.clone();
            Dimension {
                cube: Arc::downgrade(cube),
                info,
                hierarchies: DeferredNamedList::new(move || {
                    let dimension = upgrade(&weak, "dimension")?;
                    dimension.load_hierarchies()
                }),
            }
        })
    }

    pub fn cube(&self) -> XmlaResult<Arc<Cube>> {
        upgrade(&self.cube, "cube")
    }

    pub(crate) fn cube_ref(&self) -> &Weak<Cube> {
        &self.cube
    }

    pub fn dimension_type(&self) -> DimensionType {
        self.info.dimension_type
    }

    pub fn ordinal(&self) -> i32 {
        self.info.ordinal
    }

    pub fn is_measures(&self) -> bool {
        self.info.dimension_type == DimensionType::Measure
            || self.info.unique_name == super::MEASURES_UNIQUE_NAME
    }

    /// Hierarchies of this dimension, fetched on first access
    pub fn hierarchies(&self) -> &DeferredNamedList<Arc<Hierarchy>> {
        &self.hierarchies
    }

    /// The default hierarchy, or the first one when none is named
    pub fn default_hierarchy(&self) -> XmlaResult<Option<Arc<Hierarchy>>> {
        if let Some(name) = &self.info.default_hierarchy {
            if let Some(hierarchy) = self.hierarchies.get_by_unique_name(name)? {
                return Ok(Some(hierarchy));
            }
        }
        self.hierarchies.get(0)
    }

    /// Fetch hierarchies restricted to this dimension, or, when the provider
    /// rejects that restriction, all of the cube's hierarchies filtered here
    fn load_hierarchies(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Hierarchy>>> {
        let cube = self.cube()?;
        let session = Arc::clone(cube.session());
        let context = Context::for_dimension(self)?;
        let handler = HierarchyHandler::for_dimension(&self.info.unique_name);

        let preferred = cube
            .restrictions()
            .with("DIMENSION_UNIQUE_NAME", self.info.unique_name.as_str());
        let mut hierarchies = Vec::new();
        match session.populate_list(&context, &handler, &preferred, &mut hierarchies) {
            Ok(()) => return Ok(hierarchies),
            Err(err) if is_provider_rejection(&err) => {
                warn!(
                    dimension = %self.info.unique_name,
                    error = %err,
                    "hierarchy request rejected, falling back to cube-wide request"
                );
            }
            Err(err) => return Err(err),
        }

        hierarchies.clear();
        session.populate_list(&context, &handler, &cube.restrictions(), &mut hierarchies)?;
        Ok(hierarchies)
    }

    #[cfg(test)]
    pub(crate) fn preload(&self, hierarchies: Vec<Arc<Hierarchy>>) {
        self.hierarchies.preload(hierarchies);
    }
}

impl std::fmt::Debug for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dimension")
            .field("unique_name", &self.info.unique_name)
            .field("type", &self.info.dimension_type)
            .field("hierarchies", &self.hierarchies)
            .finish()
    }
}
