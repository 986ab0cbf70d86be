// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::collections::HashMap;
use std::fmt;

use xmla_olap_protocol::{XmlElement, XmlaError, XmlaResult};

/// Value of a cell, typed from the response's `xsi:type`
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
    /// The provider could not compute the cell
    Error(String),
}

impl CellValue {
    fn parse(value: &XmlElement) -> XmlaResult<Self> {
        if let Some(error) = value.child("Error") {
            let description = error
                .child_text("Description")
                .or_else(|| error.attribute("Description"))
                .unwrap_or("unknown error");
            return Ok(CellValue::Error(description.to_string()));
        }

        let text = value.text().trim();
        let xsi_type = value.attribute("type").unwrap_or("xsd:string");
        let local_type = xsi_type.rsplit(':').next().unwrap_or(xsi_type);
        let invalid = || {
            XmlaError::MalformedResponse(format!("'{}' is not a valid {}", text, xsi_type))
        };

        Ok(match local_type {
            "double" | "float" | "decimal" => CellValue::Number(text.parse().map_err(|_| invalid())?),
            "int" | "integer" | "long" | "short" | "byte" | "unsignedInt" | "unsignedLong"
            | "unsignedShort" | "unsignedByte" => {
                CellValue::Integer(text.parse().map_err(|_| invalid())?)
            }
            "boolean" => match text {
                "true" | "1" => CellValue::Boolean(true),
                "false" | "0" => CellValue::Boolean(false),
                _ => return Err(invalid()),
            },
            _ => CellValue::String(value.text().to_string()),
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Integer(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "#ERR: {}", e),
        }
    }
}

/// A cell of a cell set
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ordinal: usize,
    pub value: CellValue,
    pub formatted_value: Option<String>,
    pub format_string: Option<String>,
    /// Other cell properties the response carried
    pub properties: HashMap<String, String>,
}

impl Cell {
    pub(crate) fn empty(ordinal: usize) -> Self {
        Self {
            ordinal,
            value: CellValue::Empty,
            formatted_value: None,
            format_string: None,
            properties: HashMap::new(),
        }
    }

    pub(crate) fn parse(element: &XmlElement) -> XmlaResult<Self> {
        let ordinal_text = element.attribute("CellOrdinal").ok_or_else(|| {
            XmlaError::MalformedResponse("cell has no CellOrdinal".to_string())
        })?;
        let ordinal: usize = ordinal_text.trim().parse().map_err(|_| {
            XmlaError::MalformedResponse(format!("CellOrdinal '{}' is not an index", ordinal_text))
        })?;

        let mut cell = Cell::empty(ordinal);
        for child in element.children() {
            match child.name() {
                "Value" => {
                    cell.value = CellValue::parse(child)
                        .map_err(|e| e.with_context(format!("cell {}", ordinal)))?;
                }
                "FmtValue" => cell.formatted_value = Some(child.text().to_string()),
                "FormatString" => cell.format_string = Some(child.text().to_string()),
                other => {
                    cell.properties.insert(other.to_string(), child.text().to_string());
                }
            }
        }
        Ok(cell)
    }

    pub fn is_empty(&self) -> bool {
        self.value == CellValue::Empty
    }

    pub fn is_error(&self) -> bool {
        matches!(self.value, CellValue::Error(_))
    }

    /// The formatted value when the provider sent one, else the raw value
    pub fn display_value(&self) -> String {
        self.formatted_value
            .clone()
            .unwrap_or_else(|| self.value.to_string())
    }
}
