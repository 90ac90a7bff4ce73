//! A placed design together with the library and settings it was loaded with.
//!
//! [`Design`] answers the capacitance and connectivity queries the transforms
//! need: pin capacitances, target loads, equivalent cells, wire parasitics and
//! the level-ordered list of driver pins.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::library::target::TargetLoads;
use crate::library::{CellId, Library};
use crate::netlist::{InstanceId, NetId, Netlist, PinId, Point};

pub mod io;
pub mod level;

pub use io::{load_design, save_design, DesignFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct DesignSettings {
    /// Database units per micron.
    #[builder(default = "1000")]
    #[serde(default = "default_dbu_per_micron")]
    pub dbu_per_micron: u32,
    /// Wire capacitance per micron, in the library's capacitance unit.
    #[builder(default)]
    #[serde(default)]
    pub cap_per_micron: f64,
    /// Stop transforms once the total cell area exceeds this.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area: Option<f64>,
}

fn default_dbu_per_micron() -> u32 {
    1000
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            dbu_per_micron: default_dbu_per_micron(),
            cap_per_micron: 0.0,
            max_area: None,
        }
    }
}

impl DesignSettings {
    #[inline]
    pub fn builder() -> DesignSettingsBuilder {
        DesignSettingsBuilder::default()
    }
}

#[derive(Debug, Clone)]
pub struct Design {
    pub netlist: Netlist,
    pub library: Library,
    pub settings: DesignSettings,
    target_loads: Option<TargetLoads>,
}

impl Design {
    pub fn new(netlist: Netlist, library: Library, settings: DesignSettings) -> Self {
        Self {
            netlist,
            library,
            settings,
            target_loads: None,
        }
    }

    #[inline]
    pub fn cap_per_micron(&self) -> f64 {
        self.settings.cap_per_micron
    }

    #[inline]
    pub fn dbu_to_microns(&self, dist: i64) -> f64 {
        dist as f64 / self.settings.dbu_per_micron.max(1) as f64
    }

    /// Target load of `cell`, computing the library's target loads on first use.
    pub fn target_load(&mut self, cell: CellId) -> f64 {
        let library = &self.library;
        self.target_loads
            .get_or_insert_with(|| TargetLoads::compute(library))
            .target_load(cell)
    }

    #[inline]
    pub fn largest_equivalent_cell(&self, cell: CellId) -> CellId {
        self.library.largest_equivalent_cell(cell)
    }

    /// Capacitance of a pin's library port. Top-level ports are 0.
    pub fn pin_capacitance(&self, pin: PinId) -> f64 {
        match (self.netlist.instance_of(pin), self.netlist.port_of(pin)) {
            (Some(inst), Some(port)) => {
                self.library.cell(self.netlist.cell_of(inst)).pins[port].capacitance
            }
            _ => 0.0,
        }
    }

    #[inline]
    pub fn location(&self, pin: PinId) -> Point {
        self.netlist.location(pin, &self.library)
    }

    #[inline]
    pub fn path_name(&self, pin: PinId) -> String {
        self.netlist.path_name(pin, &self.library)
    }

    #[inline]
    pub fn cell_of(&self, inst: InstanceId) -> CellId {
        self.netlist.cell_of(inst)
    }

    #[inline]
    pub fn fanout_count(&self, net: NetId) -> usize {
        self.netlist.fanout_pins(net).len()
    }

    /// Total cell area of all instances.
    pub fn area(&self) -> f64 {
        self.netlist
            .instances()
            .map(|(_, inst)| self.library.cell(inst.cell).area)
            .sum()
    }

    /// Instance output pins ordered by logic level, ties broken by path name.
    pub fn level_driver_pins(&self) -> Vec<PinId> {
        level::level_driver_pins(self)
    }
}
