// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Common metadata element contract
//!
//! Every entity exposes a unique name, a name, a caption and an optional
//! description. Two elements of the same kind are equal exactly when their
//! unique names are equal.

use std::sync::Arc;

/// Behavior shared by catalogs, schemas, cubes, dimensions, hierarchies,
/// levels, members, named sets and properties
pub trait MetadataElement {
    /// Name that identifies the element within its kind, e.g. `[Gender].[F]`
    fn unique_name(&self) -> &str;

    fn name(&self) -> &str;

    /// Display caption; providers that send none fall back to the name
    fn caption(&self) -> &str;

    fn description(&self) -> Option<&str>;
}

impl<T: MetadataElement + ?Sized> MetadataElement for Arc<T> {
    fn unique_name(&self) -> &str {
        (**self).unique_name()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn caption(&self) -> &str {
        (**self).caption()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }
}

/// Implement `PartialEq`, `Eq` and `Hash` by unique name
macro_rules! impl_identity_by_unique_name {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    $crate::element::MetadataElement::unique_name(self)
                        == $crate::element::MetadataElement::unique_name(other)
                }
            }

            impl Eq for $ty {}

            impl std::hash::Hash for $ty {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    $crate::element::MetadataElement::unique_name(self).hash(state);
                }
            }
        )+
    };
}

pub(crate) use impl_identity_by_unique_name;

/// Wrap a name in brackets, as MDX unique names are written
pub fn bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}
