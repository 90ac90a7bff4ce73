use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use log::info;

use crate::cli::progress::StepContext;
use crate::config::RunConfig;
use crate::design::{load_design, save_design};
use crate::paths::out_design;
use crate::transform::gate_clone::{GateCloneArgs, USAGE};
use crate::transform::Transforms;
use crate::Result;

pub const GATE_CLONE: &str = "gate_clone";

/// A validated cloning run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClonePlan {
    pub design: PathBuf,
    pub output: PathBuf,
    /// Arguments passed to the transform on every pass.
    pub args: Vec<String>,
    pub max_passes: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKey {
    GeneratePlan,
    ReadDesign,
    CloneGates,
    WriteDesign,
}

pub struct ExecutePlanParams<'a> {
    pub plan: &'a ClonePlan,
    pub ctx: Option<&'a mut StepContext>,
}

/// Clone counts of each pass that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutput {
    pub passes: Vec<usize>,
}

impl PlanOutput {
    pub fn total_clones(&self) -> usize {
        self.passes.iter().sum()
    }
}

pub fn generate_plan(
    design: &Path,
    output: Option<&Path>,
    args: &[String],
    config: &RunConfig,
) -> Result<ClonePlan> {
    let args = config.gate_clone.args(args);
    if let Err(e) = GateCloneArgs::parse(&args) {
        bail!("{e}\n{USAGE}");
    }
    if config.gate_clone.max_passes == 0 {
        bail!("at least one cloning pass is required");
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out_design(design));
    if output == design {
        bail!("refusing to overwrite the input design {design:?}");
    }

    Ok(ClonePlan {
        design: design.to_path_buf(),
        output,
        args,
        max_passes: config.gate_clone.max_passes,
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

pub fn execute_plan(params: ExecutePlanParams) -> Result<PlanOutput> {
    let ExecutePlanParams { plan, mut ctx } = params;

    let mut design = load_design(&plan.design)?;
    info!(
        "read {} instances and {} nets from {:?}",
        design.netlist.num_instances(),
        design.netlist.num_nets(),
        plan.design
    );
    try_finish_task!(ctx, TaskKey::ReadDesign);

    let mut transforms = Transforms::load_transforms();
    let mut output = PlanOutput::default();
    for pass in 1..=plan.max_passes {
        let result = transforms.run_transform(GATE_CLONE, &mut design, &plan.args)?;
        let clones = usize::try_from(result)
            .map_err(|_| anyhow!("invalid arguments to {GATE_CLONE}\n{USAGE}"))?;
        info!("pass {pass}: {clones} clones");
        output.passes.push(clones);
        if clones == 0 {
            break;
        }
    }
    try_finish_task!(ctx, TaskKey::CloneGates);

    save_design(&design, &plan.output)?;
    try_finish_task!(ctx, TaskKey::WriteDesign);

    Ok(output)
}
