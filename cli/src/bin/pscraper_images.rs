use clap::Parser;
use pscraper_cli::cli::ImagesCli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = pscraper_cli::init_logging();
    let cli = ImagesCli::parse();
    pscraper_cli::run(cli.into()).await
}
