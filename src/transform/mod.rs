//! Named netlist transforms and the registry they are run through.

use std::collections::BTreeMap;

use anyhow::anyhow;
use log::info;

use crate::design::Design;
use crate::Result;

pub mod gate_clone;

pub use gate_clone::GateCloningTransform;

/// An in-place rewrite of a [`Design`], driven by string arguments.
pub trait Transform {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Usage text for the transform's arguments.
    fn help(&self) -> &'static str;

    /// Applies the transform. Returns a transform-specific non-negative result,
    /// or -1 if `args` could not be parsed.
    fn run(&mut self, design: &mut Design, args: &[String]) -> i32;
}

/// Transforms by name. Each entry keeps its own state across runs.
#[derive(Default)]
pub struct Transforms {
    transforms: BTreeMap<&'static str, Box<dyn Transform>>,
}

impl Transforms {
    pub fn new() -> Self {
        Default::default()
    }

    /// A registry holding every built-in transform.
    pub fn load_transforms() -> Self {
        let mut transforms = Self::new();
        transforms.register(Box::new(GateCloningTransform::new()));
        transforms
    }

    /// Adds `transform`, returning any previous transform of the same name.
    pub fn register(&mut self, transform: Box<dyn Transform>) -> Option<Box<dyn Transform>> {
        self.transforms.insert(transform.name(), transform)
    }

    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.transforms.keys().copied()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Transform> {
        self.transforms.get(name).map(|t| t.as_ref())
    }

    pub fn run_transform(
        &mut self,
        name: &str,
        design: &mut Design,
        args: &[String],
    ) -> Result<i32> {
        let transform = self
            .transforms
            .get_mut(name)
            .ok_or_else(|| anyhow!("unknown transform `{name}`"))?;
        info!("running transform {name} {}", args.join(" "));
        Ok(transform.run(design, args))
    }
}
