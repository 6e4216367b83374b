use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScrapeError {
    /// Parameter is the raw cookie argument
    #[error("invalid cookie {0:?}, expected KEY=VALUE")]
    InvalidCookie(String),
    #[error("invalid worker count {0}, at least one worker is required")]
    InvalidWorkerCount(usize),
    #[error("error building http client. {0}")]
    ClientBuild(String),
    /// `kind` is the element kind that was scanned, e.g. "files" or "images"
    #[error(
        "Of the {scanned} {kind}, none of them had {extension} as their extension. No files were downloaded."
    )]
    NoMatches {
        scanned: usize,
        kind: &'static str,
        extension: String,
    },
    #[error("error connecting to {url}. {message}")]
    NetworkError { url: String, message: String },
    #[error("server returned an error response. {url} => {status_code}")]
    ErrorStatusCode { status_code: String, url: String },
    #[error("error creating destination directory {dir}. {message}")]
    ErrorCreatingDestinationDirectory { dir: String, message: String },
    /// parameters are file path, additional error message
    #[error("{message} : {file_name}")]
    FileOperationError { file_name: String, message: String },
    #[error("download task failed. {0}")]
    TaskFailed(String),
}

impl ScrapeError {
    pub(crate) fn network(url: &str, e: reqwest::Error) -> Self {
        ScrapeError::NetworkError {
            url: url.to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn file_op(file_name: &std::path::Path, e: std::io::Error) -> Self {
        ScrapeError::FileOperationError {
            file_name: file_name.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
