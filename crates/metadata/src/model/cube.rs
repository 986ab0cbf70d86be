// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Cube
//!
//! Creating a cube is cheap; [`Cube::load`] then fetches its measures and
//! named sets, which every query needs. Dimensions stay deferred.
//!
//! The cube owns the caching metadata reader through which members of any of
//! its hierarchies are resolved.

use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;
use xmla_olap_protocol::{Restrictions, XmlaResult};

use super::{upgrade, Dimension, Hierarchy, Level, Member, NamedSet, Schema};
use crate::cache::CachingMetadataReader;
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{bracket, impl_identity_by_unique_name, MetadataElement};
use crate::handler::{DimensionHandler, MeasureHandler, NamedSetHandler};
use crate::reader::MetadataReader;
use crate::session::XmlaSession;

pub struct Cube {
    schema: Weak<Schema>,
    session: Arc<XmlaSession>,
    catalog_name: String,
    schema_name: String,
    unique_name: String,
    name: String,
    caption: Option<String>,
    description: Option<String>,
    dimensions: DeferredNamedList<Arc<Dimension>>,
    measures: OnceLock<Vec<Arc<Member>>>,
    named_sets: OnceLock<Vec<Arc<NamedSet>>>,
    reader: CachingMetadataReader,
}

impl_identity_by_unique_name!(Cube);

impl MetadataElement for Cube {
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

impl Cube {
    pub(crate) fn new(
        schema: &Arc<Schema>,
        name: String,
        caption: Option<String>,
        description: Option<String>,
    ) -> Arc<Self> {
        let session = Arc::clone(schema.session());
        let member_capacity = session.settings().member_cache_capacity;
        let level_capacity = session.settings().level_cache_capacity;
        Arc::new_cyclic(|weak: &Weak<Cube>| {
            let for_dimensions = weak.clone();
            Cube {
                schema: Arc::downgrade(schema),
                catalog_name: schema.catalog_name().to_string(),
                schema_name: schema.name().to_string(),
                unique_name: bracket(&name),
                name,
                caption,
                description,
                dimensions: DeferredNamedList::new(move || {
                    let cube = upgrade(&for_dimensions, "cube")?;
                    cube.load_dimensions()
                }),
                measures: OnceLock::new(),
                named_sets: OnceLock::new(),
                reader: CachingMetadataReader::new(weak.clone(), member_capacity, level_capacity),
                session,
            }
        })
    }

    pub fn schema(&self) -> XmlaResult<Arc<Schema>> {
        upgrade(&self.schema, "schema")
    }

    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub(crate) fn session(&self) -> &Arc<XmlaSession> {
        &self.session
    }

    /// Restrictions that scope a request to this cube
    pub(crate) fn restrictions(&self) -> Restrictions {
        let restrictions = Restrictions::new().with("CATALOG_NAME", self.catalog_name.as_str());
        let restrictions = if self.schema_name.is_empty() {
            restrictions
        } else {
            restrictions.with("SCHEMA_NAME", self.schema_name.as_str())
        };
        restrictions.with("CUBE_NAME", self.name.as_str())
    }

    /// Fetch measures and named sets; a no-op once loaded
    pub(crate) fn load(self: &Arc<Self>) -> XmlaResult<()> {
        if self.measures.get().is_some() {
            return Ok(());
        }
        let context = Context::for_cube(self)?;
        let restrictions = self.restrictions();

        let mut measures = Vec::new();
        self.session
            .populate_list(&context, &MeasureHandler, &restrictions, &mut measures)?;
        self.reader.register_measures(&measures);
        debug!(cube = %self.name, measures = measures.len(), "measures loaded");
        let _ = self.measures.set(measures);

        let mut named_sets = Vec::new();
        self.session
            .populate_list(&context, &NamedSetHandler, &restrictions, &mut named_sets)?;
        let _ = self.named_sets.set(named_sets);
        Ok(())
    }

    fn load_dimensions(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Dimension>>> {
        let context = Context::for_cube(self)?;
        let mut dimensions = Vec::new();
        self.session
            .populate_list(&context, &DimensionHandler, &self.restrictions(), &mut dimensions)?;
        Ok(dimensions)
    }

    /// Dimensions, fetched on first access and sorted by ordinal
    pub fn dimensions(&self) -> &DeferredNamedList<Arc<Dimension>> {
        &self.dimensions
    }

    /// Measures, in ordinal order; empty until the cube is loaded
    pub fn measures(&self) -> &[Arc<Member>] {
        self.measures.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Measure by name or unique name
    pub fn measure(&self, name: &str) -> Option<Arc<Member>> {
        self.measures()
            .iter()
            .find(|m| m.name() == name || m.unique_name() == name)
            .cloned()
    }

    pub fn named_sets(&self) -> &[Arc<NamedSet>] {
        self.named_sets.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn named_set(&self, name: &str) -> Option<Arc<NamedSet>> {
        self.named_sets()
            .iter()
            .find(|s| s.name() == name || s.unique_name() == name)
            .cloned()
    }

    /// Reader for members of this cube's hierarchies
    pub fn metadata_reader(&self) -> &CachingMetadataReader {
        &self.reader
    }

    /// Member by unique name, through the caching reader
    pub fn lookup_member(&self, unique_name: &str) -> XmlaResult<Option<Arc<Member>>> {
        self.reader.lookup_member_by_unique_name(unique_name)
    }

    pub fn lookup_dimension(&self, unique_name: &str) -> XmlaResult<Option<Arc<Dimension>>> {
        self.dimensions.get_by_unique_name(unique_name)
    }

    pub fn lookup_hierarchy(&self, unique_name: &str) -> XmlaResult<Option<Arc<Hierarchy>>> {
        for dimension in self.candidate_dimensions(unique_name)? {
            if let Some(hierarchy) = dimension.hierarchies().get_by_unique_name(unique_name)? {
                return Ok(Some(hierarchy));
            }
        }
        Ok(None)
    }

    pub fn lookup_level(&self, unique_name: &str) -> XmlaResult<Option<Arc<Level>>> {
        for dimension in self.candidate_dimensions(unique_name)? {
            let mut hierarchies = dimension.hierarchies().to_vec()?;
            hierarchies.sort_by_key(|h| !unique_name.starts_with(h.unique_name()));
            for hierarchy in hierarchies {
                if let Some(level) = hierarchy.levels().get_by_unique_name(unique_name)? {
                    return Ok(Some(level));
                }
            }
        }
        Ok(None)
    }

    /// All dimensions, those whose unique name prefixes `unique_name` first
    fn candidate_dimensions(&self, unique_name: &str) -> XmlaResult<Vec<Arc<Dimension>>> {
        let mut dimensions = self.dimensions.to_vec()?;
        dimensions.sort_by_key(|d| !unique_name.starts_with(d.unique_name()));
        Ok(dimensions)
    }

    #[cfg(test)]
    pub(crate) fn preload(&self, dimensions: Vec<Arc<Dimension>>, measures: Vec<Arc<Member>>) {
        self.dimensions.preload(dimensions);
        self.reader.register_measures(&measures);
        let _ = self.measures.set(measures);
        let _ = self.named_sets.set(Vec::new());
    }
}

impl std::fmt::Debug for Cube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cube")
            .field("unique_name", &self.unique_name)
            .field("dimensions", &self.dimensions)
            .field("measures", &self.measures().len())
            .finish()
    }
}
