// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use super::Datatype;
use crate::element::{impl_identity_by_unique_name, MetadataElement};

/// A member property declared on a level
///
/// Property names are unique within a level, so the name doubles as the
/// unique name.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    caption: Option<String>,
    description: Option<String>,
    datatype: Datatype,
    level_unique_name: String,
}

impl_identity_by_unique_name!(Property);

impl MetadataElement for Property {
    fn unique_name(&self) -> &str {
        &self.name
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

impl Property {
    pub(crate) fn new(
        name: String,
        caption: Option<String>,
        description: Option<String>,
        datatype: Datatype,
        level_unique_name: String,
    ) -> Self {
        Self {
            name,
            caption,
            description,
            datatype,
            level_unique_name,
        }
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn level_unique_name(&self) -> &str {
        &self.level_unique_name
    }
}
