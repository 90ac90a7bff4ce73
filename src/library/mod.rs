use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::netlist::Point;

pub mod target;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellId(usize);

impl CellId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self, PinDirection::Input)
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, PinDirection::Output)
    }
}

impl Display for PinDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// A linear output drive model: `slew = intrinsic_slew + slew_per_cap * load`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveModel {
    pub intrinsic_slew: f64,
    pub slew_per_cap: f64,
}

impl DriveModel {
    #[inline]
    pub fn slew(&self, load: f64) -> f64 {
        self.intrinsic_slew + self.slew_per_cap * load
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryPin {
    pub name: ArcStr,
    pub direction: PinDirection,
    #[serde(default)]
    pub capacitance: f64,
    /// Output capacitance limit, if the library specifies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacitance: Option<f64>,
    /// Pin position relative to the instance origin.
    #[serde(default)]
    pub offset: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryCell {
    pub name: ArcStr,
    /// Cells sharing a footprint and pin signature are interchangeable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<ArcStr>,
    #[serde(default)]
    pub area: f64,
    /// Overrides the computed target load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_load: Option<f64>,
    #[serde(default)]
    pub buffer: bool,
    #[serde(default)]
    pub sequential: bool,
    pub pins: Vec<LibraryPin>,
}

impl LibraryCell {
    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.pins.iter().position(|p| p.name == name)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = (usize, &LibraryPin)> {
        self.pins
            .iter()
            .enumerate()
            .filter(|(_, p)| p.direction.is_input())
    }

    pub fn output_ports(&self) -> impl Iterator<Item = (usize, &LibraryPin)> {
        self.pins
            .iter()
            .enumerate()
            .filter(|(_, p)| p.direction.is_output())
    }

    /// The capacitance limit of the first output pin that declares one.
    pub fn max_load(&self) -> f64 {
        self.output_ports()
            .find_map(|(_, p)| p.max_capacitance)
            .unwrap_or(0.0)
    }

    fn is_equivalent(&self, other: &LibraryCell) -> bool {
        match (&self.footprint, &other.footprint) {
            (Some(a), Some(b)) if a == b => {}
            _ => return false,
        }
        self.pins.len() == other.pins.len()
            && self
                .pins
                .iter()
                .zip(other.pins.iter())
                .all(|(a, b)| a.name == b.name && a.direction == b.direction)
    }
}

/// An immutable catalog of library cells.
#[derive(Debug, Clone, Default)]
pub struct Library {
    cells: Vec<LibraryCell>,
    names: HashMap<ArcStr, CellId>,
}

impl Library {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_cells(cells: impl IntoIterator<Item = LibraryCell>) -> Self {
        let mut lib = Self::new();
        for cell in cells {
            lib.add_cell(cell);
        }
        lib
    }

    /// Adds a cell, replacing any previous cell of the same name.
    pub fn add_cell(&mut self, cell: LibraryCell) -> CellId {
        if let Some(&id) = self.names.get(&cell.name) {
            self.cells[id.0] = cell;
            return id;
        }
        let id = CellId(self.cells.len());
        self.names.insert(cell.name.clone(), id);
        self.cells.push(cell);
        id
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &LibraryCell {
        &self.cells[id.0]
    }

    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &LibraryCell)> {
        self.cells.iter().enumerate().map(|(i, c)| (CellId(i), c))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells interchangeable with `id`, excluding `id` itself.
    pub fn equivalent_cells(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        let cell = self.cell(id);
        self.cells()
            .filter(move |(other, c)| *other != id && cell.is_equivalent(c))
            .map(|(other, _)| other)
    }

    /// The equivalent cell with the largest output capacitance limit.
    ///
    /// `id` itself is returned when no equivalent cell strictly exceeds it.
    pub fn largest_equivalent_cell(&self, id: CellId) -> CellId {
        let mut largest = id;
        let mut current_max = self.cell(id).max_load();
        for other in self.equivalent_cells(id) {
            let load = self.cell(other).max_load();
            if load > current_max {
                current_max = load;
                largest = other;
            }
        }
        largest
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn buf(name: &str, footprint: &str, max_cap: f64) -> LibraryCell {
        LibraryCell {
            name: ArcStr::from(name),
            footprint: Some(ArcStr::from(footprint)),
            area: 1.0,
            target_load: None,
            buffer: true,
            sequential: false,
            pins: vec![
                LibraryPin {
                    name: arcstr::literal!("A"),
                    direction: PinDirection::Input,
                    capacitance: 1.0,
                    max_capacitance: None,
                    offset: Point::default(),
                    drive: None,
                },
                LibraryPin {
                    name: arcstr::literal!("Z"),
                    direction: PinDirection::Output,
                    capacitance: 0.0,
                    max_capacitance: Some(max_cap),
                    offset: Point::default(),
                    drive: Some(DriveModel {
                        intrinsic_slew: 10.0,
                        slew_per_cap: 2.0,
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_largest_equivalent_cell() {
        let lib = Library::from_cells([
            buf("BUF_X1", "buf", 60.0),
            buf("BUF_X4", "buf", 240.0),
            buf("BUF_X2", "buf", 120.0),
            buf("DLY_X8", "dly", 500.0),
        ]);
        let x1 = lib.find_cell("BUF_X1").unwrap();
        let x4 = lib.find_cell("BUF_X4").unwrap();
        let dly = lib.find_cell("DLY_X8").unwrap();

        assert_eq!(lib.largest_equivalent_cell(x1), x4);
        assert_eq!(lib.largest_equivalent_cell(x4), x4);
        assert_eq!(lib.largest_equivalent_cell(dly), dly);
        assert_eq!(lib.equivalent_cells(x1).count(), 2);
    }

    #[test]
    fn test_equivalence_requires_footprint() {
        let mut a = buf("A_X1", "buf", 10.0);
        a.footprint = None;
        let lib = Library::from_cells([a, buf("A_X2", "buf", 20.0)]);
        let id = lib.find_cell("A_X1").unwrap();
        assert_eq!(lib.largest_equivalent_cell(id), id);
    }

    #[test]
    fn test_max_load_defaults_to_zero() {
        let mut cell = buf("B", "buf", 10.0);
        cell.pins[1].max_capacitance = None;
        assert_eq!(cell.max_load(), 0.0);
    }
}
