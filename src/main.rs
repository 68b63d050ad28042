//! Outreach allocation runner

use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use outreach::{
    cli::RunArgs,
    config::PlanConfig,
    observability,
    pipeline::Pipeline,
};

fn main() -> anyhow::Result<()> {
    let args = RunArgs::parse();

    observability::init(&args.logging)?;

    let config = match &args.config {
        Some(path) => PlanConfig::from_path(path)
            .with_context(|| format!("failed to load plan {}", path.display()))?,
        None => PlanConfig::default(),
    };

    let pipeline = Pipeline::new(config).with_lp_output(Some(args.lp_out.clone()));

    let outcome = pipeline.run(&args.input).inspect_err(|source| {
        error!(%source, input = %args.input.display(), "allocation run failed");
    })?;

    outcome
        .report(pipeline.config())
        .write_to(io::stdout().lock())?;

    Ok(())
}
