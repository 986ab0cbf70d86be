// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # OLAP entity model
//!
//! ```text
//! Catalog ─▶ Schema ─▶ Cube ─┬▶ Dimension ─▶ Hierarchy ─▶ Level ─▶ Property
//!                            ├▶ Measure (eager)
//!                            └▶ NamedSet (eager)
//! ```
//!
//! Parents own their children through deferred lists; children point back
//! with `Weak` references, so dropping a catalog releases the whole subtree.
//! An operation that needs a dropped parent fails with `XmlaError::Closed`.

mod catalog;
mod cube;
mod dimension;
mod hierarchy;
mod level;
mod member;
mod named_set;
mod property;
mod schema;

use std::sync::{Arc, Weak};

use xmla_olap_protocol::{XmlaError, XmlaResult};

pub use catalog::{catalog_list, Catalog};
pub use cube::Cube;
pub use dimension::{Dimension, DimensionType};
pub use hierarchy::Hierarchy;
pub use level::{Level, LevelType};
pub use member::{
    Aggregator, Datatype, MeasureInfo, Member, MemberType, StandardMemberProperty,
    MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME,
};
pub use named_set::NamedSet;
pub use property::Property;
pub use schema::Schema;

pub(crate) use dimension::DimensionInfo;
pub(crate) use hierarchy::HierarchyInfo;
pub(crate) use level::LevelInfo;

/// Upgrade a parent reference, failing with `Closed` once it is gone
pub(crate) fn upgrade<T>(weak: &Weak<T>, what: &str) -> XmlaResult<Arc<T>> {
    weak.upgrade()
        .ok_or_else(|| XmlaError::Closed(format!("{} is no longer available", what)))
}

/// Whether a failed request should fall back to a less precise one
///
/// Only rejections by the provider qualify; transport failures, timeouts and
/// cancellation would fail the fallback request just the same.
pub(crate) fn is_provider_rejection(err: &XmlaError) -> bool {
    matches!(
        err.root(),
        XmlaError::ServerFault { .. } | XmlaError::MalformedResponse(_)
    )
}
