// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Provider detection
//!
//! Providers differ in which protocol extensions they honor. The only one this
//! client depends on is a multi-valued `MEMBER_UNIQUE_NAME` restriction, which
//! lets a batch of members be fetched in one request. Detection is a string
//! match on the data-source description and is inherently fragile, so it can
//! be overridden with [`BatchLookupMode`].

use serde::{Deserialize, Serialize};

/// Signature of providers known to honor multi-valued member restrictions
const MONDRIAN_SIGNATURE: &str = "mondrian";

/// How a batch of member unique names is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchLookupStrategy {
    /// One request with a multi-valued `MEMBER_UNIQUE_NAME` restriction
    Batched,
    /// One request per name
    Sequential,
}

/// User-facing choice of batch lookup strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchLookupMode {
    /// Infer from the provider description
    #[default]
    Auto,
    Batched,
    Sequential,
}

/// Signature of a strategy-selection function
pub type StrategySelector = fn(&str) -> BatchLookupStrategy;

/// Default selector: batched for Mondrian, sequential for everyone else
pub fn detect_batch_strategy(description: &str) -> BatchLookupStrategy {
    if description.to_ascii_lowercase().contains(MONDRIAN_SIGNATURE) {
        BatchLookupStrategy::Batched
    } else {
        BatchLookupStrategy::Sequential
    }
}

impl BatchLookupMode {
    /// Resolve the mode against a provider description
    pub fn resolve(self, description: &str, selector: StrategySelector) -> BatchLookupStrategy {
        match self {
            BatchLookupMode::Auto => selector(description),
            BatchLookupMode::Batched => BatchLookupStrategy::Batched,
            BatchLookupMode::Sequential => BatchLookupStrategy::Sequential,
        }
    }
}

impl std::str::FromStr for BatchLookupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BatchLookupMode::Auto),
            "batched" | "batch" => Ok(BatchLookupMode::Batched),
            "sequential" => Ok(BatchLookupMode::Sequential),
            other => Err(format!("unknown batch lookup mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_mondrian() {
        assert_eq!(
            detect_batch_strategy("Provider=Mondrian;DataSource=FoodMart"),
            BatchLookupStrategy::Batched
        );
        assert_eq!(
            detect_batch_strategy("Mondrian XML for Analysis"),
            BatchLookupStrategy::Batched
        );
    }

    #[test]
    fn test_unknown_provider_is_sequential() {
        assert_eq!(
            detect_batch_strategy("Provider=MSOLAP;Data Source=local"),
            BatchLookupStrategy::Sequential
        );
        assert_eq!(detect_batch_strategy(""), BatchLookupStrategy::Sequential);
    }

    #[test]
    fn test_mode_overrides_detection() {
        let desc = "Provider=Mondrian";
        assert_eq!(
            BatchLookupMode::Sequential.resolve(desc, detect_batch_strategy),
            BatchLookupStrategy::Sequential
        );
        assert_eq!(
            BatchLookupMode::Batched.resolve("MSOLAP", detect_batch_strategy),
            BatchLookupStrategy::Batched
        );
        assert_eq!(
            BatchLookupMode::Auto.resolve(desc, detect_batch_strategy),
            BatchLookupStrategy::Batched
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Batched".parse::<BatchLookupMode>(), Ok(BatchLookupMode::Batched));
        assert!("fast".parse::<BatchLookupMode>().is_err());
    }
}
