use std::fs::canonicalize;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::{parse_config, RunConfig};
use crate::plan::{execute_plan, generate_plan, ExecutePlanParams, TaskKey};
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
            _             _
  __ _ __ _| |_ ___   __| |___ _ _  ___
 / _` / _` |  _/ -_) / _| / _ \ ' \/ -_)
 \__, \__,_|\__\___| \__|_\___/_||_\___|
 |___/

GATECLONE v0.1
";

/// Installs the global logger. `RUST_LOG` takes precedence over `default_filter`.
pub fn init_logging(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

pub fn run(args: Args) -> Result<()> {
    println!("{BANNER}");

    let config = match args.config.as_ref() {
        Some(path) => {
            let config_path = canonicalize(path)?;
            println!("Reading configuration file...\n");
            println!("Configuration file: {:?}", &config_path);
            parse_config(&config_path)?
        }
        None => RunConfig::default(),
    };

    let mut ctx = StepContext::new();

    let plan = ctx.check(generate_plan(
        &args.design,
        args.output.as_deref(),
        &args.args,
        &config,
    ))?;
    ctx.finish(TaskKey::GeneratePlan);

    let res = execute_plan(ExecutePlanParams {
        plan: &plan,
        ctx: Some(&mut ctx),
    });
    let output = ctx.check(res)?;

    println!("Gate cloning parameters:");
    println!("\tArguments: {}", plan.args.join(" "));
    println!("\tPasses: {}", output.passes.len());
    println!("\tGates cloned: {}", output.total_clones());
    println!("Design saved to: {:?}\n", &plan.output);

    Ok(())
}
