use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use set_transformer::demo::{self, DemoOptions};
use set_transformer::setup_device;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("set-transformer failed: {:#}", err);
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Set Transformer block smoke run", long_about = None)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "IPAB block config (TOML or JSON) replacing the built-in one"
    )]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 16, help = "Batch size")]
    batch: usize,

    #[arg(long, default_value_t = 30, help = "Elements per input set")]
    set_size: usize,

    #[arg(long, default_value_t = 1, help = "Number of latent updates to chain")]
    steps: usize,

    #[arg(long, help = "Run with dropout enabled")]
    train: bool,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => demo::load_ipab_config(path)?,
        None => demo::default_ipab_config(),
    };
    let options = DemoOptions {
        batch: args.batch,
        set_size: args.set_size,
        steps: args.steps,
        train: args.train,
    };

    let device = setup_device()?;
    let report = demo::run(config, &options, &device)?;
    println!(
        "dense {:?} | ipab {:?} | latent {:?} | {} parameters",
        report.dense_output, report.block_output, report.latent, report.parameters
    );
    Ok(())
}
