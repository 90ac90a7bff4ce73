//! Load-driven gate cloning.
//!
//! Drivers are visited in logic-level order. For each driver whose net load
//! exceeds `cap_factor` times its cell's target load, the net's Steiner tree is
//! walked from the driver down and greedily partitioned into subtrees that fit
//! within that budget. Each selected subtree is moved onto a fresh net driven
//! by a copy of the original gate placed on top of it.
//!
//! Partitioning is decided against a snapshot of the tree before any edit is
//! made. Each clone point is then applied as a unit: its sinks are checked to
//! still sit on the driver's net before anything is created or moved.

use arcstr::ArcStr;
use log::{debug, error, info, trace, warn};

use crate::design::Design;
use crate::netlist::{InstanceId, NetId, Netlist, PinId};
use crate::steiner::{SteinerPoint, SteinerTree};
use crate::transform::Transform;

pub mod args;
pub mod error;

pub use args::{GateCloneArgs, DEFAULT_CAP_FACTOR, USAGE};
pub use error::{CloneError, CloneResult, UsageError};

/// Net loads within this much of the budget are not violations.
/// The band lies above the budget: a load up to `c_limit + LOAD_EPSILON` is skipped.
pub const LOAD_EPSILON: f64 = f32::EPSILON as f64;

const NET_PREFIX: &str = "net_";
const CLONE_PREFIX: &str = "cloned_gate_";

/// The gate cloning transform and its name counters.
///
/// Counters persist for the life of the value so that generated names stay
/// unique across runs. Runs take the design by `&mut`, so a design and a
/// transform are never shared between concurrent runs.
#[derive(Debug, Default)]
pub struct GateCloningTransform {
    net_index: usize,
    clone_index: usize,
    clone_count: usize,
}

impl GateCloningTransform {
    pub fn new() -> Self {
        Default::default()
    }

    /// Runs one cloning pass over every driver in `design` and returns the
    /// number of gates created.
    pub fn gate_clone(
        &mut self,
        design: &mut Design,
        cap_factor: f64,
        clone_largest_only: bool,
    ) -> usize {
        self.clone_count = 0;
        debug!("gate_clone cap_factor={cap_factor} clone_largest_only={clone_largest_only}");

        for pin in design.level_driver_pins() {
            let Some(inst) = design.netlist.instance_of(pin) else {
                continue;
            };
            if let Err(e) = self.clone_tree(design, inst, cap_factor, clone_largest_only) {
                error!(
                    "failed to clone {}: {e}",
                    design.netlist.instance(inst).name
                );
            }
            if let Some(max_area) = design.settings.max_area {
                if design.area() > max_area {
                    warn!("design area exceeds {max_area}, stopping");
                    break;
                }
            }
        }

        info!("created {} gate clones", self.clone_count);
        self.clone_count
    }

    fn clone_tree(
        &mut self,
        design: &mut Design,
        inst: InstanceId,
        cap_factor: f64,
        clone_largest_only: bool,
    ) -> CloneResult<()> {
        let Some(&output_pin) = design.netlist.output_pins(inst).first() else {
            return Ok(());
        };
        let Some(net) = design.netlist.net_of(output_pin) else {
            return Ok(());
        };
        let Some(tree) = SteinerTree::create(design, net) else {
            return Ok(());
        };

        let cap_per_micron = design.cap_per_micron();
        let total_net_load = tree.total_load(cap_per_micron);
        let cell = design.cell_of(inst);
        let output_target_load = design.target_load(cell);
        let c_limit = cap_factor * output_target_load;

        let inst_name = &design.netlist.instance(inst).name;
        trace!("instance {inst_name}");
        trace!("cell {}", design.library.cell(cell).name);
        trace!("output pin {}", design.path_name(output_pin));
        trace!("output net {}", design.netlist.net(net).name);
        trace!("total net load {total_net_load}");
        trace!("output target load {output_target_load}");
        trace!("cap limit {c_limit}");

        if total_net_load - c_limit <= LOAD_EPSILON {
            trace!("load within limit");
            return Ok(());
        }
        if clone_largest_only && design.largest_equivalent_cell(cell) != cell {
            trace!("not the largest equivalent cell");
            return Ok(());
        }
        if design.fanout_count(net) <= 1 {
            trace!("fanout too small to split");
            return Ok(());
        }

        debug!("cloning {inst_name} ({total_net_load} > {c_limit})");
        let mut points = Vec::new();
        top_down_clone(design, &tree, tree.driver_point(), c_limit, &mut points);
        for point in points {
            self.clone_instance(design, &tree, point)?;
        }
        Ok(())
    }

    /// Moves the sinks below `k` onto a new net, driven by a new copy of the
    /// tree's driver or, if nothing would be left behind, by the driver itself.
    fn clone_instance(
        &mut self,
        design: &mut Design,
        tree: &SteinerTree,
        k: SteinerPoint,
    ) -> CloneResult<()> {
        let output_pin = tree
            .pin(tree.driver_point())
            .ok_or(CloneError::DriverWithoutPin)?;
        let inst = design
            .netlist
            .instance_of(output_pin)
            .ok_or(CloneError::DriverNotOnInstance)?;
        let output_port = design
            .netlist
            .port_of(output_pin)
            .ok_or(CloneError::DriverNotOnInstance)?;
        let output_net = design
            .netlist
            .net_of(output_pin)
            .ok_or(CloneError::DriverUnconnected)?;
        let sinks = sink_pins(design, tree, k, output_net)?;

        let clone_net_name = self.make_unique_net_name(&design.netlist);
        let clone_net = design.netlist.create_net(clone_net_name)?;
        for &pin in sinks.iter() {
            design.netlist.connect(clone_net, pin)?;
        }

        let left_behind = design
            .netlist
            .net(output_net)
            .pins()
            .iter()
            .filter(|&&p| p != output_pin)
            .count();
        if left_behind == 0 {
            design.netlist.connect(clone_net, output_pin)?;
            design.netlist.delete_net(output_net)?;
            debug!(
                "moved {} onto {}",
                design.path_name(output_pin),
                design.netlist.net(clone_net).name
            );
            return Ok(());
        }

        let clone_name = self.make_unique_clone_name(&design.netlist);
        let cell = design.cell_of(inst);
        let clone = design
            .netlist
            .create_instance(clone_name, cell, &design.library)?;
        let location = design.location(output_pin);
        design.netlist.set_location(clone, location)?;
        design.netlist.connect_port(clone_net, clone, output_port)?;
        self.clone_count += 1;

        for pin in design.netlist.input_pins(inst) {
            let (Some(net), Some(port)) = (design.netlist.net_of(pin), design.netlist.port_of(pin))
            else {
                continue;
            };
            design.netlist.connect_port(net, clone, port)?;
        }

        debug!(
            "created {} driving {} sinks on {}",
            design.netlist.instance(clone).name,
            sinks.len(),
            design.netlist.net(clone_net).name
        );
        Ok(())
    }

    /// Returns a net name of the form `net_N` not yet used in `netlist`.
    pub fn make_unique_net_name(&mut self, netlist: &Netlist) -> ArcStr {
        loop {
            let name = arcstr::format!("{NET_PREFIX}{}", self.net_index);
            self.net_index += 1;
            if netlist.find_net(&name).is_none() {
                return name;
            }
        }
    }

    /// Returns an instance name of the form `cloned_gate_N` not yet used in `netlist`.
    pub fn make_unique_clone_name(&mut self, netlist: &Netlist) -> ArcStr {
        loop {
            let name = arcstr::format!("{CLONE_PREFIX}{}", self.clone_index);
            self.clone_index += 1;
            if netlist.find_instance(&name).is_none() {
                return name;
            }
        }
    }
}

/// Pins on the leaves below `k`, all of which must still be on `net`.
fn sink_pins(
    design: &Design,
    tree: &SteinerTree,
    k: SteinerPoint,
    net: NetId,
) -> CloneResult<Vec<PinId>> {
    tree.leaves(k)
        .into_iter()
        .map(|leaf| {
            let pin = tree.pin(leaf).ok_or(CloneError::LeafWithoutPin(leaf))?;
            if design.netlist.net_of(pin) != Some(net) {
                return Err(CloneError::StalePin(design.path_name(pin)));
            }
            Ok(pin)
        })
        .collect()
}

/// Collects, in left-to-right order, the subtrees below `k` that become clone
/// points for a driver with load budget `c_limit`.
///
/// A child is taken whole if its load plus the wire from the driver down to
/// its parent fits the budget, or if it is a single sink. Otherwise it is split
/// further. Branches whose driver wire alone exceeds the budget stay where they
/// are.
fn top_down_clone(
    design: &Design,
    tree: &SteinerTree,
    k: SteinerPoint,
    c_limit: f64,
    points: &mut Vec<SteinerPoint>,
) {
    let cap_per_micron = design.cap_per_micron();
    // Children still to decide, each with its parent's source wire cap.
    let mut pending: Vec<(SteinerPoint, f64)> = Vec::new();
    let split = |p: SteinerPoint, pending: &mut Vec<(SteinerPoint, f64)>| {
        let src_wire_len = design.dbu_to_microns(tree.driver_wire_length(p));
        let src_wire_cap = src_wire_len * cap_per_micron;
        if src_wire_cap > c_limit {
            return;
        }
        // Right first so the left child is popped first.
        for child in [tree.right(p), tree.left(p)].into_iter().flatten() {
            pending.push((child, src_wire_cap));
        }
    };

    split(k, &mut pending);
    while let Some((child, src_wire_cap)) = pending.pop() {
        let child_load = tree.subtree_load(cap_per_micron, child) + src_wire_cap;
        if child_load < c_limit || tree.is_leaf(child) {
            points.push(child);
        } else {
            split(child, &mut pending);
        }
    }
}

impl Transform for GateCloningTransform {
    fn name(&self) -> &'static str {
        "gate_clone"
    }

    fn description(&self) -> &'static str {
        "Splits overloaded nets across copies of their driving gate"
    }

    fn help(&self) -> &'static str {
        USAGE
    }

    fn run(&mut self, design: &mut Design, args: &[String]) -> i32 {
        let args = match GateCloneArgs::parse(args) {
            Ok(args) => args,
            Err(e) => {
                error!("{e}");
                error!("{USAGE}");
                return -1;
            }
        };
        let count = self.gate_clone(design, args.cap_factor, args.clone_largest_only);
        i32::try_from(count).unwrap_or(i32::MAX)
    }
}
