// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata reader
//!
//! [`MetadataReader`] resolves members of a cube by unique name, by tree
//! navigation, and by level. [`RawMetadataReader`] answers every call with
//! `MDSCHEMA_MEMBERS` requests; the cube wraps it in a
//! [`CachingMetadataReader`](crate::cache::CachingMetadataReader).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::{debug, warn};
use xmla_olap_protocol::{Restrictions, TreeOps, XmlaError, XmlaResult};

use crate::context::Context;
use crate::element::MetadataElement;
use crate::handler::MemberHandler;
use crate::model::{upgrade, Cube, Level, Member};
use crate::provider::BatchLookupStrategy;

/// Member lookups against one cube
pub trait MetadataReader: Send + Sync {
    /// The member with this unique name, if any
    ///
    /// More than one match is a protocol violation reported as
    /// `XmlaError::AmbiguousLookup`.
    fn lookup_member_by_unique_name(&self, unique_name: &str) -> XmlaResult<Option<Arc<Member>>>;

    /// The members with these unique names, keyed by unique name
    ///
    /// Names the server does not know are absent from the map.
    fn lookup_members_by_unique_name(
        &self,
        unique_names: &[String],
    ) -> XmlaResult<HashMap<String, Arc<Member>>>;

    /// Union of the relatives selected by `ops`, in server order
    fn lookup_member_relatives(
        &self,
        ops: TreeOps,
        unique_name: &str,
    ) -> XmlaResult<Vec<Arc<Member>>>;

    /// Members of the level with this unique name, in server order
    fn level_members_by_unique_name(&self, level_unique_name: &str) -> XmlaResult<Vec<Arc<Member>>>;

    fn level_members(&self, level: &Level) -> XmlaResult<Vec<Arc<Member>>> {
        self.level_members_by_unique_name(level.unique_name())
    }
}

/// Reader that sends one Discover request per lookup
#[derive(Debug, Clone)]
pub struct RawMetadataReader {
    cube: Weak<Cube>,
}

impl RawMetadataReader {
    pub fn new(cube: Weak<Cube>) -> Self {
        Self { cube }
    }

    fn fetch(&self, restrictions: Restrictions) -> XmlaResult<Vec<Arc<Member>>> {
        let cube = upgrade(&self.cube, "cube")?;
        let context = Context::for_cube(&cube)?;
        let mut scoped = cube.restrictions();
        scoped.extend(restrictions);
        let mut members = Vec::new();
        cube.session()
            .populate_list(&context, &MemberHandler, &scoped, &mut members)?;
        Ok(members)
    }

    fn batch_strategy(&self) -> XmlaResult<BatchLookupStrategy> {
        Ok(upgrade(&self.cube, "cube")?.session().batch_strategy())
    }

    fn lookup_batched(&self, unique_names: &[String]) -> XmlaResult<HashMap<String, Arc<Member>>> {
        let members = self.fetch(
            Restrictions::new()
                .with_many("MEMBER_UNIQUE_NAME", unique_names.iter().cloned())
                .with("TREE_OP", TreeOps::SELF.restriction_value()),
        )?;
        let mut found = HashMap::with_capacity(members.len());
        for member in members {
            if unique_names.iter().any(|n| n == member.unique_name()) {
                found.entry(member.unique_name().to_string()).or_insert(member);
            }
        }
        Ok(found)
    }

    fn lookup_sequential(
        &self,
        unique_names: &[String],
    ) -> XmlaResult<HashMap<String, Arc<Member>>> {
        if unique_names.len() > 1 {
            warn!(
                count = unique_names.len(),
                "provider does not support batched member lookup, looking up one by one"
            );
        }
        let mut found = HashMap::with_capacity(unique_names.len());
        for name in unique_names {
            if let Some(member) = self.lookup_member_by_unique_name(name)? {
                found.insert(name.clone(), member);
            }
        }
        Ok(found)
    }
}

impl MetadataReader for RawMetadataReader {
    fn lookup_member_by_unique_name(&self, unique_name: &str) -> XmlaResult<Option<Arc<Member>>> {
        let mut members = self.fetch(
            Restrictions::new()
                .with("MEMBER_UNIQUE_NAME", unique_name)
                .with("TREE_OP", TreeOps::SELF.restriction_value()),
        )?;
        match members.len() {
            0 => Ok(None),
            1 => Ok(members.pop()),
            count => Err(XmlaError::AmbiguousLookup {
                name: unique_name.to_string(),
                count,
            }),
        }
    }

    fn lookup_members_by_unique_name(
        &self,
        unique_names: &[String],
    ) -> XmlaResult<HashMap<String, Arc<Member>>> {
        if unique_names.is_empty() {
            return Ok(HashMap::new());
        }
        match self.batch_strategy()? {
            BatchLookupStrategy::Batched => {
                debug!(count = unique_names.len(), "batched member lookup");
                self.lookup_batched(unique_names)
            }
            BatchLookupStrategy::Sequential => self.lookup_sequential(unique_names),
        }
    }

    fn lookup_member_relatives(
        &self,
        ops: TreeOps,
        unique_name: &str,
    ) -> XmlaResult<Vec<Arc<Member>>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(
            Restrictions::new()
                .with("MEMBER_UNIQUE_NAME", unique_name)
                .with("TREE_OP", ops.restriction_value()),
        )
    }

    fn level_members_by_unique_name(&self, level_unique_name: &str) -> XmlaResult<Vec<Arc<Member>>> {
        self.fetch(Restrictions::new().with("LEVEL_UNIQUE_NAME", level_unique_name))
    }
}
