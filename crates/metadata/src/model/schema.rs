// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use xmla_olap_protocol::{Restrictions, XmlaResult};

use super::{upgrade, Catalog, Cube};
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::handler::CubeHandler;
use crate::session::XmlaSession;

/// A schema within a catalog
///
/// Providers without schemas report a single schema with an empty name.
pub struct Schema {
    catalog: Weak<Catalog>,
    session: Arc<XmlaSession>,
    catalog_name: String,
    name: String,
    cubes: DeferredNamedList<Arc<Cube>>,
}

impl_identity_by_unique_name!(Schema);

impl MetadataElement for Schema {
    fn unique_name(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn caption(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        None
    }
}

impl Schema {
    pub(crate) fn new(catalog: &Arc<Catalog>, name: String) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Schema>| {
            let weak = weak.clone();
            Schema {
                catalog: Arc::downgrade(catalog),
                session: Arc::clone(catalog.session()),
                catalog_name: catalog.name().to_string(),
                name,
                cubes: DeferredNamedList::new(move || {
                    let schema = upgrade(&weak, "schema")?;
                    schema.load_cubes()
                }),
            }
        })
    }

    pub fn catalog(&self) -> XmlaResult<Arc<Catalog>> {
        upgrade(&self.catalog, "catalog")
    }

    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    pub(crate) fn session(&self) -> &Arc<XmlaSession> {
        &self.session
    }

    /// Cubes of this schema, fetched on first access
    ///
    /// Populating the list also loads each cube's measures and named sets.
    pub fn cubes(&self) -> &DeferredNamedList<Arc<Cube>> {
        &self.cubes
    }

    /// Restrictions that scope a request to this schema
    pub(crate) fn restrictions(&self) -> Restrictions {
        let restrictions = Restrictions::new().with("CATALOG_NAME", self.catalog_name.as_str());
        if self.name.is_empty() {
            restrictions
        } else {
            restrictions.with("SCHEMA_NAME", self.name.as_str())
        }
    }

    fn load_cubes(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Cube>>> {
        let context = Context::for_schema(self)?;
        let mut cubes = Vec::new();
        self.session
            .populate_list(&context, &CubeHandler, &self.restrictions(), &mut cubes)?;
        for cube in &cubes {
            cube.load()?;
        }
        Ok(cubes)
    }

    #[cfg(test)]
    pub(crate) fn preload(&self, cubes: Vec<Arc<Cube>>) {
        self.cubes.preload(cubes);
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("catalog", &self.catalog_name)
            .field("name", &self.name)
            .field("cubes", &self.cubes)
            .finish()
    }
}
