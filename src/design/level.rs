//! Logic levelization of instance output pins.
//!
//! Input ports and undriven pins sit at level 0. A load pin is one level past
//! its driver. A combinational output is one level past its deepest input,
//! while a sequential output restarts at level 1.

use std::collections::{BTreeSet, VecDeque};

use itertools::Itertools;
use log::warn;

use super::Design;
use crate::netlist::{InstanceId, Netlist, PinId};

/// Output level of every instance, indexed by instance id.
pub fn instance_levels(design: &Design) -> Vec<u32> {
    let netlist = &design.netlist;
    let n = netlist.num_instances();
    let sequential: Vec<bool> = netlist
        .instances()
        .map(|(_, inst)| design.library.cell(inst.cell).sequential)
        .collect();

    let preds: Vec<BTreeSet<InstanceId>> = netlist
        .instances()
        .map(|(id, _)| {
            if sequential[id.index()] {
                return BTreeSet::new();
            }
            netlist
                .input_pins(id)
                .into_iter()
                .filter_map(|p| driver_instance(netlist, p))
                .collect()
        })
        .collect();

    let mut succs: Vec<Vec<InstanceId>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    for (i, ps) in preds.iter().enumerate() {
        indegree[i] = ps.len();
        for p in ps {
            succs[p.index()].push(InstanceId::from_index(i));
        }
    }

    let mut levels: Vec<Option<u32>> = vec![None; n];
    let mut queue: VecDeque<InstanceId> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(InstanceId::from_index)
        .collect();

    let assign = |id: InstanceId, levels: &mut Vec<Option<u32>>| {
        let level = if sequential[id.index()] {
            1
        } else {
            netlist
                .input_pins(id)
                .into_iter()
                .map(|p| input_level(netlist, p, levels))
                .max()
                .unwrap_or(0)
                + 1
        };
        levels[id.index()] = Some(level);
    };

    while let Some(id) = queue.pop_front() {
        assign(id, &mut levels);
        for &s in succs[id.index()].iter() {
            indegree[s.index()] -= 1;
            if indegree[s.index()] == 0 {
                queue.push_back(s);
            }
        }
    }

    let looped = (0..n).filter(|&i| levels[i].is_none()).collect_vec();
    if !looped.is_empty() {
        warn!(
            "combinational loop through {} instance(s): {}",
            looped.len(),
            looped
                .iter()
                .map(|&i| netlist.instance(InstanceId::from_index(i)).name.as_str())
                .join(", ")
        );
        for i in looped {
            assign(InstanceId::from_index(i), &mut levels);
        }
    }

    levels.into_iter().map(|l| l.unwrap_or(0)).collect()
}

fn driver_instance(netlist: &Netlist, pin: PinId) -> Option<InstanceId> {
    let net = netlist.net_of(pin)?;
    netlist.instance_of(netlist.driver_pin(net)?)
}

fn input_level(netlist: &Netlist, pin: PinId, levels: &[Option<u32>]) -> u32 {
    let Some(net) = netlist.net_of(pin) else {
        return 0;
    };
    match netlist.driver_pin(net).and_then(|d| netlist.instance_of(d)) {
        Some(drvr) => levels[drvr.index()].unwrap_or(0) + 1,
        // Driven by a top-level port (level 0), or undriven.
        None if netlist
            .net(net)
            .pins()
            .iter()
            .any(|&p| netlist.instance_of(p).is_none() && netlist.pin(p).direction.is_input()) =>
        {
            1
        }
        None => 0,
    }
}

pub fn level_driver_pins(design: &Design) -> Vec<PinId> {
    let levels = instance_levels(design);
    let levels = &levels;
    let netlist = &design.netlist;
    netlist
        .instances()
        .flat_map(|(id, _)| {
            netlist
                .output_pins(id)
                .into_iter()
                .map(move |p| (levels[id.index()], p))
        })
        .map(|(level, p)| (level, design.path_name(p), p))
        .sorted_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, _, p)| p)
        .collect()
}
