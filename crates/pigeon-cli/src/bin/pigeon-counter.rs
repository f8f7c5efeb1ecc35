//! Pigeon Counter - drive a shared counter to a target with lock-guarded jobs.

use clap::Parser;
use pigeon_cli::{count_to, init_tracing, CounterCli};
use pigeon_jobs::JobRunner;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = CounterCli::parse();
    let runner = JobRunner::new(cli.runner_config()?);

    let value = count_to(&runner, cli.target)?;

    println!("Final counter: {}", value);
    println!("{}", runner.metrics().summary());
    Ok(())
}
