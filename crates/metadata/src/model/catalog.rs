// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use tracing::warn;
use xmla_olap_protocol::{Restrictions, XmlaResult};

use super::{is_provider_rejection, upgrade, Schema};
use crate::context::Context;
use crate::deferred::DeferredNamedList;
use crate::element::{impl_identity_by_unique_name, MetadataElement};
use crate::handler::{CatalogHandler, SchemaFromCubesHandler, SchemaHandler};
use crate::session::XmlaSession;

/// A catalog (database) on the server
pub struct Catalog {
    session: Arc<XmlaSession>,
    name: String,
    description: Option<String>,
    schemas: DeferredNamedList<Arc<Schema>>,
}

impl_identity_by_unique_name!(Catalog);

impl MetadataElement for Catalog {
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
        self.description.as_deref()
    }
}

impl Catalog {
    pub(crate) fn new(
        session: Arc<XmlaSession>,
        name: String,
        description: Option<String>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Catalog>| {
            let weak = weak.clone();
            Catalog {
                session,
                name,
                description,
                schemas: DeferredNamedList::new(move || {
                    let catalog = upgrade(&weak, "catalog")?;
                    catalog.load_schemas()
                }),
            }
        })
    }

    pub fn session(&self) -> &Arc<XmlaSession> {
        &self.session
    }

    /// Schemas of this catalog, fetched on first access
    pub fn schemas(&self) -> &DeferredNamedList<Arc<Schema>> {
        &self.schemas
    }

    fn load_schemas(self: &Arc<Self>) -> XmlaResult<Vec<Arc<Schema>>> {
        let context = Context::for_catalog(self);
        let restrictions = Restrictions::new().with("CATALOG_NAME", self.name.as_str());

        let mut schemas = Vec::new();
        match self
            .session
            .populate_list(&context, &SchemaHandler, &restrictions, &mut schemas)
        {
            Ok(()) if !schemas.is_empty() => return Ok(schemas),
            Ok(()) => {
                warn!(catalog = %self.name, "schemata rowset is empty, deriving schemas from cubes");
            }
            Err(err) if is_provider_rejection(&err) => {
                warn!(
                    catalog = %self.name,
                    error = %err,
                    "schemata rowset rejected, deriving schemas from cubes"
                );
            }
            Err(err) => return Err(err),
        }

        schemas.clear();
        self.session
            .populate_list(&context, &SchemaFromCubesHandler, &restrictions, &mut schemas)?;
        Ok(schemas)
    }

    #[cfg(test)]
    pub(crate) fn preload(&self, schemas: Vec<Arc<Schema>>) {
        self.schemas.preload(schemas);
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("name", &self.name)
            .field("schemas", &self.schemas)
            .finish()
    }
}

/// The session's catalogs, fetched on first access
pub fn catalog_list(session: &Arc<XmlaSession>) -> DeferredNamedList<Arc<Catalog>> {
    let session = Arc::clone(session);
    DeferredNamedList::new(move || {
        let context = Context::for_session(Arc::clone(&session));
        let mut catalogs = Vec::new();
        session.populate_list(&context, &CatalogHandler, &Restrictions::new(), &mut catalogs)?;
        Ok(catalogs)
    })
}
