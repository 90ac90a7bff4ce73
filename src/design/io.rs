use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::{Design, DesignSettings};
use crate::library::{Library, LibraryCell, PinDirection};
use crate::netlist::{NetId, Netlist, NetlistResult, PinId, PinOwner, Point};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignFile {
    #[serde(default)]
    pub settings: DesignSettings,
    pub library: LibraryFile,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryFile {
    pub cells: Vec<LibraryCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortEntry {
    pub name: ArcStr,
    pub direction: PinDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<ArcStr>,
    #[serde(default)]
    pub location: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub name: ArcStr,
    pub cell: ArcStr,
    #[serde(default)]
    pub location: Point,
    /// Cell port name to net name.
    #[serde(default)]
    pub connections: BTreeMap<ArcStr, ArcStr>,
}

enum Format {
    Toml,
    Json,
}

fn format_of(path: &Path) -> Result<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => bail!(
            "unrecognized design file extension (expected .toml or .json): {:?}",
            path
        ),
    }
}

pub fn load_design(path: impl AsRef<Path>) -> Result<Design> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    let file: DesignFile = match format_of(path)? {
        Format::Toml => toml::from_str(&contents)?,
        Format::Json => serde_json::from_str(&contents)?,
    };
    file.into_design()
}

pub fn save_design(design: &Design, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = DesignFile::from_design(design);
    let contents = match format_of(path)? {
        Format::Toml => toml::to_string(&file)?,
        Format::Json => serde_json::to_string_pretty(&file)?,
    };
    fs::write(path, contents).with_context(|| format!("failed to write {path:?}"))?;
    Ok(())
}

impl DesignFile {
    pub fn into_design(self) -> Result<Design> {
        if self.settings.dbu_per_micron == 0 {
            bail!("dbu_per_micron must be positive");
        }
        let library = Library::from_cells(self.library.cells);
        let mut netlist = Netlist::new();

        for port in self.ports {
            let pin = netlist.create_port(port.name.clone(), port.direction, port.location)?;
            if let Some(name) = port.net.as_ref() {
                let id = net_named(&mut netlist, name)?;
                netlist.connect(id, pin)?;
            }
        }

        for entry in self.instances {
            let cell = library
                .find_cell(&entry.cell)
                .ok_or_else(|| anyhow!("instance `{}`: unknown cell `{}`", entry.name, entry.cell))?;
            let inst = netlist.create_instance(entry.name.clone(), cell, &library)?;
            netlist.set_location(inst, entry.location)?;
            for (port_name, net_name) in entry.connections.iter() {
                let port = library.cell(cell).port_index(port_name).ok_or_else(|| {
                    anyhow!(
                        "instance `{}`: cell `{}` has no pin `{}`",
                        entry.name,
                        entry.cell,
                        port_name
                    )
                })?;
                let id = net_named(&mut netlist, net_name)?;
                netlist.connect_port(id, inst, port)?;
            }
        }

        for (id, n) in netlist.nets() {
            let drivers = netlist.driver_pins(id);
            if drivers.len() > 1 {
                bail!("net `{}` has {} instance drivers", n.name, drivers.len());
            }
        }

        Ok(Design::new(netlist, library, self.settings))
    }

    pub fn from_design(design: &Design) -> Self {
        let netlist = &design.netlist;
        let library = &design.library;
        let net_name = |pin: PinId| netlist.net_of(pin).map(|n| netlist.net(n).name.clone());

        let ports = netlist
            .ports()
            .iter()
            .filter_map(|&pin| match &netlist.pin(pin).owner {
                PinOwner::Port { name, location } => Some(PortEntry {
                    name: name.clone(),
                    direction: netlist.pin(pin).direction,
                    location: *location,
                    net: net_name(pin),
                }),
                PinOwner::Instance { .. } => None,
            })
            .collect();

        let instances = netlist
            .instances()
            .map(|(_, inst)| {
                let cell = library.cell(inst.cell);
                let connections = inst
                    .pins()
                    .iter()
                    .enumerate()
                    .filter_map(|(port, &pin)| Some((cell.pins[port].name.clone(), net_name(pin)?)))
                    .collect();
                InstanceEntry {
                    name: inst.name.clone(),
                    cell: cell.name.clone(),
                    location: inst.location,
                    connections,
                }
            })
            .collect();

        Self {
            settings: design.settings.clone(),
            library: LibraryFile {
                cells: library.cells().map(|(_, c)| c.clone()).collect(),
            },
            ports,
            instances,
        }
    }
}

fn net_named(netlist: &mut Netlist, name: &ArcStr) -> NetlistResult<NetId> {
    match netlist.find_net(name) {
        Some(id) => Ok(id),
        None => netlist.create_net(name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{fanout_design, FanoutSpec};

    const SMALL: &str = r#"
[settings]
dbu_per_micron = 2000
cap_per_micron = 0.5

[[library.cells]]
name = "BUF_X1"
footprint = "buf"
area = 1.5
buffer = true
pins = [
    { name = "A", direction = "input", capacitance = 1.0 },
    { name = "Z", direction = "output", max_capacitance = 60.0, drive = { intrinsic_slew = 10.0, slew_per_cap = 2.0 } },
]

[[ports]]
name = "in"
direction = "input"
net = "n_in"

[[instances]]
name = "u1"
cell = "BUF_X1"
location = { x = 10, y = 20 }
connections = { A = "n_in", Z = "n_out" }
"#;

    #[test]
    fn test_parse_toml_design() {
        let file: DesignFile = toml::from_str(SMALL).unwrap();
        let design = file.into_design().unwrap();
        assert_eq!(design.settings.dbu_per_micron, 2000);
        assert_eq!(design.settings.cap_per_micron, 0.5);
        assert_eq!(design.netlist.num_nets(), 2);
        let u1 = design.netlist.find_instance("u1").unwrap();
        assert_eq!(design.netlist.instance(u1).location, Point::new(10, 20));
        let n_in = design.netlist.find_net("n_in").unwrap();
        assert_eq!(design.netlist.fanout_pins(n_in).len(), 1);
        assert_eq!(design.area(), 1.5);
    }

    #[test]
    fn test_unknown_cell_is_an_error() {
        let src = SMALL.replace("cell = \"BUF_X1\"", "cell = \"NOPE\"");
        let file: DesignFile = toml::from_str(&src).unwrap();
        let err = file.into_design().unwrap_err();
        assert!(err.to_string().contains("unknown cell `NOPE`"));
    }

    #[test]
    fn test_zero_dbu_per_micron_is_an_error() {
        let src = SMALL.replace("dbu_per_micron = 2000", "dbu_per_micron = 0");
        let file: DesignFile = toml::from_str(&src).unwrap();
        let err = file.into_design().unwrap_err();
        assert!(err.to_string().contains("dbu_per_micron"));
    }

    #[test]
    fn test_save_and_load_json() {
        let design = fanout_design(&FanoutSpec::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.json");
        save_design(&design, &path).unwrap();
        let loaded = load_design(&path).unwrap();
        assert_eq!(
            DesignFile::from_design(&loaded),
            DesignFile::from_design(&design)
        );
    }

    #[test]
    fn test_unknown_extension() {
        let design = fanout_design(&FanoutSpec::default());
        let dir = tempfile::tempdir().unwrap();
        assert!(save_design(&design, dir.path().join("design.def")).is_err());
    }
}
