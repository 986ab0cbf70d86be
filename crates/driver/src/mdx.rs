// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Anything that can be submitted as an MDX statement

/// A query that serializes to MDX text
///
/// Parse trees produced by an MDX parser implement this to be executed
/// without going back through a string the caller holds.
pub trait MdxStatement {
    fn to_mdx(&self) -> String;
}

impl MdxStatement for str {
    fn to_mdx(&self) -> String {
        self.to_string()
    }
}

impl MdxStatement for String {
    fn to_mdx(&self) -> String {
        self.clone()
    }
}

impl<T: MdxStatement + ?Sized> MdxStatement for &T {
    fn to_mdx(&self) -> String {
        (**self).to_mdx()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Select {
        columns: Vec<&'static str>,
        cube: &'static str,
    }

    impl MdxStatement for Select {
        fn to_mdx(&self) -> String {
            format!("SELECT {{{}}} ON COLUMNS FROM {}", self.columns.join(", "), self.cube)
        }
    }

    #[test]
    fn test_tree_serializes() {
        let select = Select {
            columns: vec!["[Measures].[Unit Sales]"],
            cube: "[Sales]",
        };
        let statement: &dyn MdxStatement = &select;
        assert_eq!(
            statement.to_mdx(),
            "SELECT {[Measures].[Unit Sales]} ON COLUMNS FROM [Sales]"
        );
        assert_eq!("SELECT 1".to_mdx(), "SELECT 1");
    }
}
