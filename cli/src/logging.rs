use std::path::MAIN_SEPARATOR;
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILTER: &str = "libpscraper=debug,pscraper_cli=debug";

/// Logs go to an hourly rolling file in the working directory so the terminal
/// is left to the progress bars. Keep the guard alive until exit.
pub fn init_logging() -> WorkerGuard {
    let f_appender =
        tracing_appender::rolling::hourly(format!(".{}", MAIN_SEPARATOR), "pscraper.log");
    let (non_blk, guard) = tracing_appender::non_blocking(f_appender);
    tracing_subscriber::fmt()
        .with_env_filter(LOG_FILTER)
        .event_format(tracing_subscriber::fmt::format().pretty())
        .with_writer(non_blk)
        .with_ansi(false)
        .init();
    guard
}
