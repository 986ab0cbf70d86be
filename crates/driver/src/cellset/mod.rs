// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Cell sets
//!
//! The result of an MDX query: axes of positions, an optional filter axis
//! for the slicer, and cells addressed either by ordinal or by one
//! coordinate per axis. Axis 0 varies fastest:
//!
//! ```text
//! ordinal = c0 + c1 * |axis0| + c2 * |axis0| * |axis1| + ...
//! ```
//!
//! Members on the axes are joined with their schema members lazily, in one
//! batch lookup against the query's cube the first time any position's
//! members are asked for.

mod axis;
mod cell;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};
use xmla_olap_metadata::{Member, MetadataReader};
use xmla_olap_protocol::{XmlElement, XmlaError, XmlaResult};

use crate::connection::XmlaConnection;

pub use axis::{AxisMember, AxisMetadata, AxisOrdinal, CellSetAxis, Position, PositionMember};
pub use cell::{Cell, CellValue};

/// Shape of a cell set, as declared in the response's `OlapInfo`
#[derive(Debug, Clone, PartialEq)]
pub struct CellSetMetadata {
    pub cube_name: String,
    pub axes: Vec<AxisMetadata>,
    pub filter_axis: AxisMetadata,
    /// Cell properties the response declared, such as `VALUE`
    pub cell_properties: Vec<String>,
}

impl CellSetMetadata {
    fn parse(olap_info: Option<&XmlElement>) -> XmlaResult<Self> {
        let cube_name = olap_info
            .and_then(|info| info.find(&["CubeInfo", "Cube", "CubeName"]))
            .map(|name| name.text().to_string())
            .unwrap_or_default();

        let mut axes = Vec::new();
        let mut filter_axis = AxisMetadata::empty(AxisOrdinal::Filter);
        if let Some(axes_info) = olap_info.and_then(|info| info.child("AxesInfo")) {
            for element in axes_info.children_named("AxisInfo") {
                let metadata = AxisMetadata::parse(element)?;
                match metadata.ordinal {
                    AxisOrdinal::Filter => filter_axis = metadata,
                    AxisOrdinal::Axis(_) => axes.push(metadata),
                }
            }
        }
        axes.sort_by_key(|m| m.ordinal);

        let cell_properties = olap_info
            .and_then(|info| info.child("CellInfo"))
            .map(|cell_info| {
                cell_info
                    .children()
                    .iter()
                    .map(|p| p.attribute("name").unwrap_or(p.name()).to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            cube_name,
            axes,
            filter_axis,
            cell_properties,
        })
    }
}

/// The result of executing an MDX query
pub struct CellSet {
    metadata: CellSetMetadata,
    axes: Vec<CellSetAxis>,
    filter_axis: CellSetAxis,
    cells: HashMap<usize, Cell>,
    cell_count: usize,
    connection: Arc<XmlaConnection>,
    resolved: OnceLock<HashMap<String, Arc<Member>>>,
    closed: AtomicBool,
}

impl CellSet {
    /// Build a cell set from the `root` element of an Execute response
    pub(crate) fn parse(root: &XmlElement, connection: Arc<XmlaConnection>) -> XmlaResult<Self> {
        let metadata = CellSetMetadata::parse(root.child("OlapInfo"))?;

        let mut by_ordinal: HashMap<AxisOrdinal, &XmlElement> = HashMap::new();
        if let Some(axes) = root.child("Axes") {
            for element in axes.children_named("Axis") {
                let ordinal = AxisOrdinal::from_response_name(
                    element.attribute("name").unwrap_or_default(),
                )?;
                by_ordinal.insert(ordinal, element);
            }
        }

        let mut axis_ordinals: Vec<usize> = by_ordinal
            .keys()
            .filter_map(|o| match o {
                AxisOrdinal::Axis(n) => Some(*n),
                AxisOrdinal::Filter => None,
            })
            .collect();
        axis_ordinals.sort_unstable();
        if let Some((index, found)) = axis_ordinals
            .iter()
            .enumerate()
            .find(|(index, found)| *index != **found)
        {
            return Err(XmlaError::MalformedResponse(format!(
                "axes are not contiguous: expected Axis{}, found Axis{}",
                index, found
            )));
        }

        let axes = axis_ordinals
            .iter()
            .map(|&n| {
                let ordinal = AxisOrdinal::Axis(n);
                let declared = metadata
                    .axes
                    .iter()
                    .find(|m| m.ordinal == ordinal)
                    .cloned()
                    .unwrap_or_else(|| AxisMetadata::empty(ordinal));
                CellSetAxis::parse(by_ordinal[&ordinal], declared)
            })
            .collect::<XmlaResult<Vec<_>>>()?;

        let filter_axis = match by_ordinal.get(&AxisOrdinal::Filter) {
            Some(element) => CellSetAxis::parse(element, metadata.filter_axis.clone())?,
            None => CellSetAxis::empty(AxisOrdinal::Filter),
        };

        let cell_count = axes.iter().map(CellSetAxis::position_count).product();
        let mut cells = HashMap::new();
        if let Some(cell_data) = root.child("CellData") {
            for element in cell_data.children_named("Cell") {
                let cell = Cell::parse(element)?;
                if cell.ordinal >= cell_count {
                    return Err(XmlaError::MalformedResponse(format!(
                        "cell ordinal {} is outside a cell set of {} cells",
                        cell.ordinal, cell_count
                    )));
                }
                cells.insert(cell.ordinal, cell);
            }
        }

        debug!(
            cube = %metadata.cube_name,
            axes = axes.len(),
            cells = cell_count,
            non_empty = cells.len(),
            "cell set parsed"
        );

        Ok(Self {
            metadata,
            axes,
            filter_axis,
            cells,
            cell_count,
            connection,
            resolved: OnceLock::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn metadata(&self) -> XmlaResult<&CellSetMetadata> {
        self.ensure_open()?;
        Ok(&self.metadata)
    }

    pub fn axes(&self) -> XmlaResult<&[CellSetAxis]> {
        self.ensure_open()?;
        Ok(&self.axes)
    }

    /// The slicer axis; empty when the query had no `WHERE` clause
    pub fn filter_axis(&self) -> XmlaResult<&CellSetAxis> {
        self.ensure_open()?;
        Ok(&self.filter_axis)
    }

    pub fn axis(&self, ordinal: AxisOrdinal) -> XmlaResult<&CellSetAxis> {
        self.ensure_open()?;
        match ordinal {
            AxisOrdinal::Filter => Ok(&self.filter_axis),
            AxisOrdinal::Axis(n) => self.axes.get(n).ok_or_else(|| {
                XmlaError::InvalidCoordinate(format!(
                    "axis {} does not exist; the cell set has {} axes",
                    n,
                    self.axes.len()
                ))
            }),
        }
    }

    /// Number of cells: the product of the axes' position counts
    pub fn cell_count(&self) -> XmlaResult<usize> {
        self.ensure_open()?;
        Ok(self.cell_count)
    }

    /// Cell by ordinal; cells the response omitted are empty
    pub fn cell(&self, ordinal: usize) -> XmlaResult<Cell> {
        self.ensure_open()?;
        if ordinal >= self.cell_count {
            return Err(XmlaError::InvalidCoordinate(format!(
                "cell ordinal {} is outside a cell set of {} cells",
                ordinal, self.cell_count
            )));
        }
        Ok(self
            .cells
            .get(&ordinal)
            .cloned()
            .unwrap_or_else(|| Cell::empty(ordinal)))
    }

    /// Cell at one position per axis, axis 0 first
    pub fn cell_at(&self, coordinates: &[usize]) -> XmlaResult<Cell> {
        let ordinal = self.coordinates_to_ordinal(coordinates)?;
        self.cell(ordinal)
    }

    pub fn coordinates_to_ordinal(&self, coordinates: &[usize]) -> XmlaResult<usize> {
        self.ensure_open()?;
        if coordinates.len() != self.axes.len() {
            return Err(XmlaError::InvalidCoordinate(format!(
                "expected {} coordinates, got {}",
                self.axes.len(),
                coordinates.len()
            )));
        }
        let mut ordinal = 0;
        let mut stride = 1;
        for (axis, &coordinate) in self.axes.iter().zip(coordinates) {
            let count = axis.position_count();
            if coordinate >= count {
                return Err(XmlaError::InvalidCoordinate(format!(
                    "position {} is outside {} with {} positions",
                    coordinate,
                    axis.ordinal(),
                    count
                )));
            }
            ordinal += coordinate * stride;
            stride *= count;
        }
        Ok(ordinal)
    }

    pub fn ordinal_to_coordinates(&self, ordinal: usize) -> XmlaResult<Vec<usize>> {
        self.ensure_open()?;
        if ordinal >= self.cell_count {
            return Err(XmlaError::InvalidCoordinate(format!(
                "cell ordinal {} is outside a cell set of {} cells",
                ordinal, self.cell_count
            )));
        }
        let mut remainder = ordinal;
        Ok(self
            .axes
            .iter()
            .map(|axis| {
                let count = axis.position_count();
                let coordinate = remainder % count;
                remainder /= count;
                coordinate
            })
            .collect())
    }

    /// Members of one position, joined with their schema members
    ///
    /// The first call resolves every member on every axis in a single
    /// batch lookup. Members the cube does not know stay position-only.
    pub fn position_members(
        &self,
        axis: AxisOrdinal,
        position: usize,
    ) -> XmlaResult<Vec<AxisMember>> {
        let members = &self
            .axis(axis)?
            .positions
            .get(position)
            .ok_or_else(|| {
                XmlaError::InvalidCoordinate(format!("{} has no position {}", axis, position))
            })?
            .members;

        let resolved = self.resolved_members()?;
        Ok(members
            .iter()
            .map(|m| AxisMember::new(m.clone(), resolved.get(&m.unique_name).cloned()))
            .collect())
    }

    fn resolved_members(&self) -> XmlaResult<&HashMap<String, Arc<Member>>> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.resolve_members()?;
        // a racing resolver may have won; either map is equivalent
        Ok(self.resolved.get_or_init(|| resolved))
    }

    fn resolve_members(&self) -> XmlaResult<HashMap<String, Arc<Member>>> {
        let mut seen = HashSet::new();
        let unique_names: Vec<String> = self
            .axes
            .iter()
            .chain(std::iter::once(&self.filter_axis))
            .flat_map(CellSetAxis::unique_names)
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect();
        if unique_names.is_empty() {
            return Ok(HashMap::new());
        }

        let cube_name = &self.metadata.cube_name;
        let Some(cube) = self.connection.find_cube(cube_name)? else {
            warn!(cube = %cube_name, "cube of cell set not found; members stay unresolved");
            return Ok(HashMap::new());
        };
        cube.metadata_reader()
            .lookup_members_by_unique_name(&unique_names)
            .map_err(|e| e.with_context(format!("resolving members of cube '{}'", cube_name)))
    }

    /// Release the cell set; every later access fails with `XmlaError::Closed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> XmlaResult<()> {
        if self.is_closed() {
            Err(XmlaError::Closed("cell set is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CellSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellSet")
            .field("cube", &self.metadata.cube_name)
            .field(
                "axes",
                &self.axes.iter().map(CellSetAxis::position_count).collect::<Vec<_>>(),
            )
            .field("cell_count", &self.cell_count)
            .field("closed", &self.is_closed())
            .finish()
    }
}
