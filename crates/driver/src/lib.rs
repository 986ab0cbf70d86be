// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # XMLA OLAP - Driver
//!
//! The user-facing surface of the client:
//!
//! - **Configuration**: [`XmlaConfig`] from YAML, JSON settings or a
//!   `jdbc:xmla:` style connect string
//! - **Transport**: [`HttpTransport`] posts SOAP requests with `reqwest`
//! - **Connection**: [`XmlaConnection`] owns the session and the catalog list
//! - **Statements**: [`Statement`] executes MDX with timeout and cancellation
//! - **Cell sets**: [`CellSet`] exposes axes, positions and cells, and joins
//!   axis members with their schema members on demand
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xmla_olap_driver::{AxisOrdinal, XmlaConfig, XmlaConnection};
//!
//! let config = XmlaConfig::new("http://localhost:8080/mondrian/xmla").with_catalog("FoodMart");
//! let connection = XmlaConnection::open(config)?;
//! let statement = connection.create_statement()?;
//! let cell_set = statement.execute(
//!     "SELECT {[Measures].[Unit Sales]} ON COLUMNS, [Gender].[Gender].Members ON ROWS FROM [Sales]",
//! )?;
//! for row in 0..cell_set.axis(AxisOrdinal::Axis(1))?.position_count() {
//!     let members = cell_set.position_members(AxisOrdinal::Axis(1), row)?;
//!     println!("{}: {}", members[0].caption(), cell_set.cell_at(&[0, row])?.display_value());
//! }
//! ```

pub mod cellset;
pub mod config;
pub mod connection;
pub mod http;
pub mod mdx;
pub mod statement;

// Re-exports
pub use cellset::{
    AxisMember, AxisMetadata, AxisOrdinal, Cell, CellSet, CellSetAxis, CellSetMetadata, CellValue,
    Position, PositionMember,
};
pub use config::{ConfigError, XmlaConfig};
pub use connection::XmlaConnection;
pub use http::HttpTransport;
pub use mdx::MdxStatement;
pub use statement::Statement;
