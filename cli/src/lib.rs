use libpscraper::{scrape, Cookie, ScrapeConfig, ScrapeReport, SessionContext, Target};
use owo_colors::{OwoColorize, Stream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc::channel;
use url::Url;

pub mod cli;
mod logging;
mod report;

pub use logging::init_logging;

const MAX_BUFFER_SIZE: usize = 256;

/// Arguments shared by both entry points.
#[derive(Debug)]
pub struct RunArgs {
    pub url: Url,
    pub target: Target,
    pub cookie: Option<Cookie>,
    pub workers: usize,
    pub path: Option<PathBuf>,
}

/// Runs one scrape and renders its progress. Fatal errors map to a failure
/// exit code; failed downloads are only listed.
pub async fn run(args: RunArgs) -> ExitCode {
    let session = match SessionContext::new(args.cookie) {
        Ok(s) => Arc::new(s),
        Err(e) => return fatal(&e),
    };
    let mut config = ScrapeConfig::new(args.url, args.target);
    config.workers = args.workers;
    if let Some(path) = args.path {
        config.destination_dir = path;
    }
    let destination = config.destination_dir.clone();

    println!("Extracting files from {} ...", config.page_url);
    let (tx, rx) = channel(MAX_BUFFER_SIZE);
    let renderer = tokio::spawn(report::render(rx));
    let outcome = scrape(session, config, tx).await;
    if let Err(e) = renderer.await {
        tracing::warn!("Progress renderer stopped unexpectedly : {}", e);
    }

    match outcome {
        Ok(report) => {
            summarize(&report, &destination);
            ExitCode::SUCCESS
        }
        Err(e) => fatal(&e),
    }
}

fn summarize(report: &ScrapeReport, destination: &std::path::Path) {
    if report.results.is_empty() {
        println!("No images found on the page.");
        return;
    }
    for failed in report.failures() {
        if let Err(e) = &failed.outcome {
            eprintln!(
                "{} {} : {}",
                "[Failed]".if_supports_color(Stream::Stderr, |t| t.red()),
                failed.link,
                e
            );
        }
    }
    println!(
        "{} downloaded, {} failed, saved in {}",
        report.completed(),
        report.failed(),
        destination.display()
    );
    println!(
        "{}",
        "Above files downloaded.".if_supports_color(Stream::Stdout, |t| t.green())
    );
}

fn fatal(e: &libpscraper::ScrapeError) -> ExitCode {
    tracing::error!("{}", e);
    eprintln!("{}", e.if_supports_color(Stream::Stderr, |t| t.red()));
    ExitCode::FAILURE
}
