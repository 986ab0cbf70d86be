// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # XMLA OLAP - Protocol Layer
//!
//! This crate holds the request/response plumbing of the XML for Analysis
//! protocol, independent of any metadata model:
//!
//! - **Codec**: builds `Discover` / `Execute` SOAP envelopes and decodes
//!   responses, surfacing SOAP faults as errors
//! - **Restrictions**: single- and multi-valued filters for Discover requests
//! - **Rowsets**: typed access to the rows of a Discover response
//! - **Tree operations**: the `TREE_OP` bitmask used for member navigation
//! - **Errors**: the [`XmlaError`] type shared by every crate in the workspace
//!
//! ## Usage
//!
//! ```rust
//! use xmla_olap_protocol::{codec, RequestType, Restrictions};
//!
//! let restrictions = Restrictions::new()
//!     .with("CATALOG_NAME", "FoodMart")
//!     .with("CUBE_NAME", "Sales");
//! let properties = codec::discover_properties(None, Some("FoodMart"), None);
//! let request = codec::encode_discover(RequestType::MdschemaCubes, &restrictions, &properties);
//! assert!(request.contains("<CUBE_NAME>Sales</CUBE_NAME>"));
//! ```

pub mod codec;
pub mod dom;
pub mod error;
pub mod request;
pub mod rowset;
pub mod tree_op;

// Re-exports
pub use dom::XmlElement;
pub use error::{XmlaError, XmlaResult};
pub use request::{PropertyList, RequestType, Restriction, RestrictionValue, Restrictions};
pub use rowset::Row;
pub use tree_op::{TreeOp, TreeOps};
