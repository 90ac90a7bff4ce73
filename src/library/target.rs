//! Target loads: the output load at which each cell's slew reaches the
//! library-wide buffer target slew.

use log::{debug, trace};

use super::{CellId, DriveModel, Library, LibraryCell};

/// Buffers are characterized driving this multiple of their input capacitance.
const BUFFER_LOAD_FACTOR: f64 = 10.0;
/// Initial load and step of the target load search (1pF in fF).
const CAP_INIT: f64 = 1000.0;
/// Relative tolerance of the target load search.
const CAP_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetLoads {
    loads: Vec<f64>,
}

impl TargetLoads {
    pub fn compute(library: &Library) -> Self {
        let target_slew = buffer_target_slew(library);
        debug!("buffer target slew: {target_slew:.4}");
        let loads = library
            .cells()
            .map(|(_, cell)| {
                let load = cell_target_load(cell, target_slew);
                trace!("{} target load: {load:.4}", cell.name);
                load
            })
            .collect();
        Self { loads }
    }

    pub fn target_load(&self, cell: CellId) -> f64 {
        self.loads.get(cell.index()).copied().unwrap_or(0.0)
    }
}

/// Average output slew over all buffers driving `BUFFER_LOAD_FACTOR` times
/// their own input capacitance. Zero if the library has no usable buffers.
pub fn buffer_target_slew(library: &Library) -> f64 {
    let mut slew_sum = 0.0f64;
    let mut count = 0usize;

    for (_, cell) in library.cells().filter(|(_, c)| c.buffer) {
        let mut inputs = cell.input_ports();
        let mut outputs = cell.output_ports();
        let (Some((_, input)), None, Some((_, output)), None) =
            (inputs.next(), inputs.next(), outputs.next(), outputs.next())
        else {
            continue;
        };
        if let Some(drive) = output.drive {
            slew_sum += drive.slew(input.capacitance * BUFFER_LOAD_FACTOR);
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        slew_sum / count as f64
    }
}

fn cell_target_load(cell: &LibraryCell, target_slew: f64) -> f64 {
    if let Some(load) = cell.target_load {
        return load;
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for drive in cell.output_ports().filter_map(|(_, p)| p.drive) {
        sum += find_target_load(&drive, target_slew);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Finds the load at which `drive` produces `out_slew`, halving the search
/// step every time the slew overshoots.
pub fn find_target_load(drive: &DriveModel, out_slew: f64) -> f64 {
    if drive.slew_per_cap <= 0.0 || !out_slew.is_finite() {
        return 0.0;
    }
    let cap_tol = CAP_INIT * CAP_TOLERANCE;
    let mut load_cap = CAP_INIT;
    let mut cap_step = CAP_INIT;
    while cap_step > cap_tol {
        if drive.slew(load_cap) > out_slew {
            load_cap -= cap_step;
            cap_step /= 2.0;
        }
        load_cap += cap_step;
    }
    load_cap
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::library::tests::buf;

    #[test]
    fn test_find_target_load_converges() {
        let drive = DriveModel {
            intrinsic_slew: 10.0,
            slew_per_cap: 2.0,
        };
        // slew(load) == 50 at load == 20
        let load = find_target_load(&drive, 50.0);
        assert_relative_eq!(load, 20.0, epsilon = CAP_INIT * CAP_TOLERANCE * 2.0);
        assert!(drive.slew(load) <= 50.0 + 2.0 * CAP_INIT * CAP_TOLERANCE * 2.0);
    }

    #[test]
    fn test_find_target_load_large() {
        let drive = DriveModel {
            intrinsic_slew: 0.0,
            slew_per_cap: 0.01,
        };
        let load = find_target_load(&drive, 25.0);
        assert_relative_eq!(load, 2500.0, epsilon = 2.0);
    }

    #[test]
    fn test_ideal_driver_has_no_target_load() {
        let drive = DriveModel {
            intrinsic_slew: 1.0,
            slew_per_cap: 0.0,
        };
        assert_eq!(find_target_load(&drive, 10.0), 0.0);
    }

    #[test]
    fn test_buffer_target_slew() {
        // Both buffers: 10 + 2 * (1.0 * 10) = 30
        let lib = Library::from_cells([buf("BUF_X1", "buf", 60.0), buf("BUF_X2", "buf", 120.0)]);
        assert_relative_eq!(buffer_target_slew(&lib), 30.0);

        let loads = TargetLoads::compute(&lib);
        let x1 = lib.find_cell("BUF_X1").unwrap();
        // 10 + 2 * load == 30
        assert_relative_eq!(loads.target_load(x1), 10.0, epsilon = 2.0);
    }

    #[test]
    fn test_explicit_target_load_wins() {
        let mut cell = buf("BUF_X1", "buf", 60.0);
        cell.target_load = Some(7.5);
        let lib = Library::from_cells([cell]);
        let loads = TargetLoads::compute(&lib);
        assert_eq!(loads.target_load(lib.find_cell("BUF_X1").unwrap()), 7.5);
    }
}
