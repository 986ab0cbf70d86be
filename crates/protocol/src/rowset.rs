// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Rowset rows
//!
//! A Discover response is a sequence of `row` elements, each holding one child
//! element per column. Absent columns mean "null".

use crate::dom::XmlElement;

/// One row of a Discover rowset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, String)>,
}

impl Row {
    /// Create a row from column name/value pairs
    pub fn new<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a row from a `row` element
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            columns: element
                .children()
                .iter()
                .map(|c| (c.name().to_string(), c.text().to_string()))
                .collect(),
        }
    }

    /// Raw text of a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Owned text of a column
    pub fn string(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    /// Column parsed as an integer; unparseable values read as absent
    pub fn integer(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(|v| {
            let v = v.trim();
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().map(|f| f as i64))
        })
    }

    /// Column parsed as a boolean (`true`/`1`)
    pub fn boolean(&self, column: &str) -> Option<bool> {
        self.get(column).map(|v| {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v == "1"
        })
    }

    /// Whether the row carries a column
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Columns in document order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let row = Row::new([
            ("MEMBER_ORDINAL", "7"),
            ("CHILDREN_CARDINALITY", "12.0"),
            ("MEASURE_IS_VISIBLE", "true"),
            ("BAD", "n/a"),
        ]);
        assert_eq!(row.integer("MEMBER_ORDINAL"), Some(7));
        assert_eq!(row.integer("CHILDREN_CARDINALITY"), Some(12));
        assert_eq!(row.boolean("MEASURE_IS_VISIBLE"), Some(true));
        assert_eq!(row.integer("BAD"), None);
        assert_eq!(row.integer("MISSING"), None);
    }

    #[test]
    fn test_from_element() {
        let element = XmlElement::parse(b"<row><CUBE_NAME>Sales</CUBE_NAME><DESCRIPTION/></row>")
            .unwrap();
        let row = Row::from_element(&element);
        assert_eq!(row.get("CUBE_NAME"), Some("Sales"));
        assert_eq!(row.get("DESCRIPTION"), Some(""));
        assert!(!row.contains("CUBE_CAPTION"));
    }
}
