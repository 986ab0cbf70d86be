// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Discover request types, restrictions and request properties

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rowsets this client knows how to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    DiscoverDatasources,
    DiscoverProperties,
    DiscoverLiterals,
    DbschemaCatalogs,
    DbschemaSchemata,
    MdschemaCubes,
    MdschemaDimensions,
    MdschemaHierarchies,
    MdschemaLevels,
    MdschemaMeasures,
    MdschemaMembers,
    MdschemaProperties,
    MdschemaSets,
}

impl RequestType {
    /// Name sent in the `RequestType` element
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::DiscoverDatasources => "DISCOVER_DATASOURCES",
            RequestType::DiscoverProperties => "DISCOVER_PROPERTIES",
            RequestType::DiscoverLiterals => "DISCOVER_LITERALS",
            RequestType::DbschemaCatalogs => "DBSCHEMA_CATALOGS",
            RequestType::DbschemaSchemata => "DBSCHEMA_SCHEMATA",
            RequestType::MdschemaCubes => "MDSCHEMA_CUBES",
            RequestType::MdschemaDimensions => "MDSCHEMA_DIMENSIONS",
            RequestType::MdschemaHierarchies => "MDSCHEMA_HIERARCHIES",
            RequestType::MdschemaLevels => "MDSCHEMA_LEVELS",
            RequestType::MdschemaMeasures => "MDSCHEMA_MEASURES",
            RequestType::MdschemaMembers => "MDSCHEMA_MEMBERS",
            RequestType::MdschemaProperties => "MDSCHEMA_PROPERTIES",
            RequestType::MdschemaSets => "MDSCHEMA_SETS",
        }
    }

    /// Whether the rowset is scoped by a catalog, and so needs the
    /// `Catalog` request property
    pub fn is_catalog_scoped(&self) -> bool {
        !matches!(
            self,
            RequestType::DiscoverDatasources
                | RequestType::DiscoverProperties
                | RequestType::DiscoverLiterals
                | RequestType::DbschemaCatalogs
        )
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single restriction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionValue {
    Single(String),
    Multiple(Vec<String>),
}

/// A name/value filter applied to a Discover request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub name: String,
    pub value: RestrictionValue,
}

/// Ordered list of restrictions for one Discover request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    entries: Vec<Restriction>,
}

impl Restrictions {
    /// Create an empty restriction list
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a single-valued restriction
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, RestrictionValue::Single(value.into()));
        self
    }

    /// Builder method: add a single-valued restriction when a value is present
    pub fn with_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Builder method: add a multi-valued restriction
    pub fn with_many<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(name, RestrictionValue::Multiple(values));
        self
    }

    /// Append a restriction
    pub fn push(&mut self, name: impl Into<String>, value: RestrictionValue) {
        self.entries.push(Restriction {
            name: name.into(),
            value,
        });
    }

    /// Look up a restriction value by name
    pub fn get(&self, name: &str) -> Option<&RestrictionValue> {
        self.entries
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.value)
    }

    /// Single value of a restriction, if it is single-valued
    pub fn single(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            RestrictionValue::Single(value) => Some(value),
            RestrictionValue::Multiple(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Restriction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<Restriction> for Restrictions {
    fn extend<I: IntoIterator<Item = Restriction>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Restrictions {
    type Item = Restriction;
    type IntoIter = std::vec::IntoIter<Restriction>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Request properties sent in the `PropertyList` element
///
/// Entries keep insertion order; setting a property twice replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyList {
    entries: Vec<(String, String)>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a property
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder method: set a property when a value is present
    pub fn with_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    /// Set a property, replacing an earlier value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrictions_builder_keeps_order() {
        let r = Restrictions::new()
            .with("CATALOG_NAME", "FoodMart")
            .with("CUBE_NAME", "Sales")
            .with_opt("SCHEMA_NAME", None::<String>);
        let names: Vec<_> = r.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["CATALOG_NAME", "CUBE_NAME"]);
        assert_eq!(r.single("CUBE_NAME"), Some("Sales"));
    }

    #[test]
    fn test_multi_valued_restriction() {
        let r = Restrictions::new().with_many("MEMBER_UNIQUE_NAME", ["[a]", "[b]"]);
        assert_eq!(
            r.get("MEMBER_UNIQUE_NAME"),
            Some(&RestrictionValue::Multiple(vec!["[a]".into(), "[b]".into()]))
        );
        assert_eq!(r.single("MEMBER_UNIQUE_NAME"), None);
    }

    #[test]
    fn test_property_list_replaces() {
        let p = PropertyList::new()
            .with("Catalog", "A")
            .with("Content", "SchemaData")
            .with("Catalog", "B");
        assert_eq!(p.get("Catalog"), Some("B"));
        assert_eq!(p.iter().count(), 2);
    }

    #[test]
    fn test_catalog_scoped_request_types() {
        assert!(RequestType::MdschemaCubes.is_catalog_scoped());
        assert!(!RequestType::DbschemaCatalogs.is_catalog_scoped());
        assert_eq!(RequestType::MdschemaMembers.to_string(), "MDSCHEMA_MEMBERS");
    }
}
