use anyhow::Result;
use clap::Parser;
use receipts::cli::{init_logging, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.run().await
}
