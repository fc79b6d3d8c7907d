//! dbcompare CLI entry point.

use clap::Parser;
use dbcompare_cli::Cli;

#[tokio::main]
async fn main() {
    // Credentials may live in a local .env file.
    if let Err(e) = dbcompare_cli::load_env_file(None) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(e) = dbcompare_cli::execute(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
