use std::collections::HashSet;

use crate::design::{load_design, save_design, Design, DesignFile};
use crate::transform::Transforms;


/// An inverter driving three clusters of buffers, with target loads derived
/// from the drive models: the buffer slew at ten times its input capacitance
/// is 30, which the inverter reaches at a load of 5.
const CLUSTERS: &str = r#"
[settings]
dbu_per_micron = 1000
cap_per_micron = 0.0

[[library.cells]]
name = "BUF_X1"
footprint = "buf"
area = 1.0
buffer = true
pins = [
    { name = "A", direction = "input", capacitance = 1.0 },
    { name = "Z", direction = "output", max_capacitance = 60.0, drive = { intrinsic_slew = 10.0, slew_per_cap = 2.0 } },
]

[[library.cells]]
name = "INV_X1"
footprint = "inv"
area = 0.8
pins = [
    { name = "A", direction = "input", capacitance = 1.0 },
    { name = "Y", direction = "output", max_capacitance = 40.0, drive = { intrinsic_slew = 5.0, slew_per_cap = 5.0 } },
]

[[ports]]
name = "in"
direction = "input"
net = "n_in"
location = { x = -5000, y = 0 }

[[instances]]
name = "u0"
cell = "INV_X1"
connections = { A = "n_in", Y = "n_out" }

[[instances]]
name = "a0"
cell = "BUF_X1"
location = { x = -10000, y = 0 }
connections = { A = "n_out" }

[[instances]]
name = "a1"
cell = "BUF_X1"
location = { x = -10000, y = 1000 }
connections = { A = "n_out" }

[[instances]]
name = "a2"
cell = "BUF_X1"
location = { x = -10000, y = 2000 }
connections = { A = "n_out" }

[[instances]]
name = "a3"
cell = "BUF_X1"
location = { x = -10000, y = 3000 }
connections = { A = "n_out" }

[[instances]]
name = "b0"
cell = "BUF_X1"
location = { x = 10000, y = 0 }
connections = { A = "n_out" }

[[instances]]
name = "b1"
cell = "BUF_X1"
location = { x = 10000, y = 1000 }
connections = { A = "n_out" }

[[instances]]
name = "b2"
cell = "BUF_X1"
location = { x = 10000, y = 2000 }
connections = { A = "n_out" }

[[instances]]
name = "c0"
cell = "BUF_X1"
location = { x = 0, y = 10000 }
connections = { A = "n_out" }

[[instances]]
name = "c1"
cell = "BUF_X1"
location = { x = 1000, y = 10000 }
connections = { A = "n_out" }

[[instances]]
name = "c2"
cell = "BUF_X1"
location = { x = 2000, y = 10000 }
connections = { A = "n_out" }
"#;

fn sinks_of(design: &Design, inst: &str) -> Vec<String> {
    let netlist = &design.netlist;
    let inst = netlist.find_instance(inst).unwrap();
    let net = netlist.net_of(netlist.output_pins(inst)[0]).unwrap();
    let mut names = netlist
        .fanout_pins(net)
        .into_iter()
        .map(|p| design.path_name(p))
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn test_clone_design_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clusters.toml");
    std::fs::write(&input, CLUSTERS).unwrap();

    let mut design = load_design(&input).unwrap();
    let u0 = design.netlist.find_instance("u0").unwrap();
    approx::assert_relative_eq!(
        design.target_load(design.cell_of(u0)),
        5.0,
        epsilon = 0.2
    );

    let mut transforms = Transforms::load_transforms();
    let args = vec!["1.4".to_string(), "false".to_string()];
    assert_eq!(
        transforms
            .run_transform("gate_clone", &mut design, &args)
            .unwrap(),
        1
    );
    assert_eq!(
        sinks_of(&design, "cloned_gate_0"),
        ["a0/A", "a1/A", "a2/A", "a3/A"]
    );
    assert_eq!(
        sinks_of(&design, "u0"),
        ["b0/A", "b1/A", "b2/A", "c0/A", "c1/A", "c2/A"]
    );
    assert!(design.netlist.find_net("n_out").is_none());

    // Both nets now fit their budget.
    assert_eq!(
        transforms
            .run_transform("gate_clone", &mut design, &args)
            .unwrap(),
        0
    );

    let output = dir.path().join("clusters.cloned.toml");
    save_design(&design, &output).unwrap();
    let reloaded = load_design(&output).unwrap();
    assert_eq!(
        DesignFile::from_design(&reloaded),
        DesignFile::from_design(&design)
    );

    let names = reloaded
        .netlist
        .nets()
        .map(|(_, n)| n.name.clone())
        .collect::<HashSet<_>>();
    assert_eq!(names.len(), reloaded.netlist.num_nets());
    assert_eq!(reloaded.netlist.num_instances(), 12);
}
