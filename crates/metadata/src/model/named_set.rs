// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::sync::{Arc, Weak};

use xmla_olap_protocol::XmlaResult;

use super::{upgrade, Cube};
use crate::element::{bracket, impl_identity_by_unique_name, MetadataElement};

/// A named set defined on a cube
#[derive(Debug)]
pub struct NamedSet {
    cube: Weak<Cube>,
    unique_name: String,
    name: String,
    caption: Option<String>,
    description: Option<String>,
    expression: String,
}

impl_identity_by_unique_name!(NamedSet);

impl MetadataElement for NamedSet {
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

impl NamedSet {
    pub(crate) fn new(
        cube: &Arc<Cube>,
        name: String,
        caption: Option<String>,
        description: Option<String>,
        expression: String,
    ) -> Arc<Self> {
        let unique_name = if name.starts_with('[') {
            name.clone()
        } else {
            bracket(&name)
        };
        Arc::new(Self {
            cube: Arc::downgrade(cube),
            unique_name,
            name,
            caption,
            description,
            expression,
        })
    }

    pub fn cube(&self) -> XmlaResult<Arc<Cube>> {
        upgrade(&self.cube, "cube")
    }

    /// MDX set expression
    pub fn expression(&self) -> &str {
        &self.expression
    }
}
