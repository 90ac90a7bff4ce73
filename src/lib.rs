pub use anyhow::{anyhow, Result};

pub mod cli;
pub mod config;
pub mod design;
pub mod library;
pub mod netlist;
pub mod paths;
pub mod plan;
pub mod steiner;
pub mod transform;

#[cfg(test)]
pub(crate) mod tests;
