// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Request context
//!
//! A [`Context`] is the scope a metadata request runs in:
//! session ⊇ catalog ⊇ schema ⊇ cube ⊇ dimension ⊇ hierarchy ⊇ level.
//! Each coordinate may only be present when every coordinate above it is
//! present. Handlers use the context to fill in coordinates a response row
//! omits and to find the parent object of a row (first in the context, then
//! through the enclosing cube's lookup tables).

use std::sync::Arc;

use xmla_olap_protocol::{XmlaError, XmlaResult};

use crate::element::MetadataElement;
use crate::model::{Catalog, Cube, Dimension, Hierarchy, Level, Schema};
use crate::session::XmlaSession;

/// Immutable, strictly nested scope of a metadata request
#[derive(Clone)]
pub struct Context {
    session: Arc<XmlaSession>,
    catalog: Option<Arc<Catalog>>,
    schema: Option<Arc<Schema>>,
    cube: Option<Arc<Cube>>,
    dimension: Option<Arc<Dimension>>,
    hierarchy: Option<Arc<Hierarchy>>,
    level: Option<Arc<Level>>,
}

impl Context {
    /// Build a context from explicit coordinates
    ///
    /// Fails with `InvariantViolation` when a coordinate is present but one
    /// above it is missing.
    pub fn new(
        session: Arc<XmlaSession>,
        catalog: Option<Arc<Catalog>>,
        schema: Option<Arc<Schema>>,
        cube: Option<Arc<Cube>>,
        dimension: Option<Arc<Dimension>>,
        hierarchy: Option<Arc<Hierarchy>>,
        level: Option<Arc<Level>>,
    ) -> XmlaResult<Self> {
        const NAMES: [&str; 6] = ["catalog", "schema", "cube", "dimension", "hierarchy", "level"];
        let present = [
            catalog.is_some(),
            schema.is_some(),
            cube.is_some(),
            dimension.is_some(),
            hierarchy.is_some(),
            level.is_some(),
        ];
        for i in 1..present.len() {
            if present[i] && !present[i - 1] {
                return Err(XmlaError::InvariantViolation(format!(
                    "context has a {} but no {}",
                    NAMES[i],
                    NAMES[i - 1]
                )));
            }
        }
        Ok(Self {
            session,
            catalog,
            schema,
            cube,
            dimension,
            hierarchy,
            level,
        })
    }

    pub fn for_session(session: Arc<XmlaSession>) -> Self {
        Self {
            session,
            catalog: None,
            schema: None,
            cube: None,
            dimension: None,
            hierarchy: None,
            level: None,
        }
    }

    pub fn for_catalog(catalog: &Arc<Catalog>) -> Self {
        Self {
            catalog: Some(Arc::clone(catalog)),
            ..Self::for_session(Arc::clone(catalog.session()))
        }
    }

    pub fn for_schema(schema: &Arc<Schema>) -> XmlaResult<Self> {
        let catalog = schema.catalog()?;
        Ok(Self {
            schema: Some(Arc::clone(schema)),
            ..Self::for_catalog(&catalog)
        })
    }

    pub fn for_cube(cube: &Arc<Cube>) -> XmlaResult<Self> {
        let schema = cube.schema()?;
        Ok(Self {
            cube: Some(Arc::clone(cube)),
            ..Self::for_schema(&schema)?
        })
    }

    pub fn for_dimension(dimension: &Arc<Dimension>) -> XmlaResult<Self> {
        let cube = dimension.cube()?;
        Ok(Self {
            dimension: Some(Arc::clone(dimension)),
            ..Self::for_cube(&cube)?
        })
    }

    pub fn for_hierarchy(hierarchy: &Arc<Hierarchy>) -> XmlaResult<Self> {
        let dimension = hierarchy.dimension()?;
        Ok(Self {
            hierarchy: Some(Arc::clone(hierarchy)),
            ..Self::for_dimension(&dimension)?
        })
    }

    pub fn for_level(level: &Arc<Level>) -> XmlaResult<Self> {
        let hierarchy = level.hierarchy()?;
        Ok(Self {
            level: Some(Arc::clone(level)),
            ..Self::for_hierarchy(&hierarchy)?
        })
    }

    pub fn session(&self) -> &Arc<XmlaSession> {
        &self.session
    }

    pub fn catalog(&self) -> Option<&Arc<Catalog>> {
        self.catalog.as_ref()
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn cube(&self) -> Option<&Arc<Cube>> {
        self.cube.as_ref()
    }

    pub fn dimension(&self) -> Option<&Arc<Dimension>> {
        self.dimension.as_ref()
    }

    pub fn hierarchy(&self) -> Option<&Arc<Hierarchy>> {
        self.hierarchy.as_ref()
    }

    pub fn level(&self) -> Option<&Arc<Level>> {
        self.level.as_ref()
    }

    pub fn catalog_name(&self) -> Option<&str> {
        self.catalog.as_ref().map(|c| c.name())
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_ref().map(|s| s.name())
    }

    pub fn cube_name(&self) -> Option<&str> {
        self.cube.as_ref().map(|c| c.name())
    }

    /// The cube, or an error naming what needed it
    pub(crate) fn require_cube(&self, what: &str) -> XmlaResult<&Arc<Cube>> {
        self.cube.as_ref().ok_or_else(|| {
            XmlaError::InvariantViolation(format!("{} requires a cube in its context", what))
        })
    }

    /// Find a dimension by unique name: the context's own first, then the cube
    pub fn resolve_dimension(&self, unique_name: &str) -> XmlaResult<Option<Arc<Dimension>>> {
        if let Some(dimension) = &self.dimension {
            if dimension.unique_name() == unique_name {
                return Ok(Some(Arc::clone(dimension)));
            }
        }
        match &self.cube {
            Some(cube) => cube.lookup_dimension(unique_name),
            None => Ok(None),
        }
    }

    /// Find a hierarchy by unique name: the context's own first, then the cube
    pub fn resolve_hierarchy(&self, unique_name: &str) -> XmlaResult<Option<Arc<Hierarchy>>> {
        if let Some(hierarchy) = &self.hierarchy {
            if hierarchy.unique_name() == unique_name {
                return Ok(Some(Arc::clone(hierarchy)));
            }
        }
        match &self.cube {
            Some(cube) => cube.lookup_hierarchy(unique_name),
            None => Ok(None),
        }
    }

    /// Find a level by unique name: the context's own first, then the cube
    pub fn resolve_level(&self, unique_name: &str) -> XmlaResult<Option<Arc<Level>>> {
        if let Some(level) = &self.level {
            if level.unique_name() == unique_name {
                return Ok(Some(Arc::clone(level)));
            }
        }
        match &self.cube {
            Some(cube) => cube.lookup_level(unique_name),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("catalog", &self.catalog_name())
            .field("schema", &self.schema_name())
            .field("cube", &self.cube_name())
            .field("dimension", &self.dimension.as_ref().map(|d| d.unique_name()))
            .field("hierarchy", &self.hierarchy.as_ref().map(|h| h.unique_name()))
            .field("level", &self.level.as_ref().map(|l| l.unique_name()))
            .finish()
    }
}
