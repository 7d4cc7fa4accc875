use anyhow::Context;
use clap::Parser;
use sensor_preprocessor::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("sensor-preprocessor run failed")
}
