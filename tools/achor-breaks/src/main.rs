use achor_breaks::cli::{init_logging, Cli};
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);
    cli.run()
}
