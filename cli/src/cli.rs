use crate::RunArgs;
use clap::Parser;
use libpscraper::{Cookie, Target};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Downloads all files with a given extension from a web page",
    long_about = "Downloads all files with a given extension from a web page. Image extensions \
    (.jpg, .jpeg, .png) download every image on the page, anything else downloads the links \
    ending with that extension."
)]
pub struct FilesCli {
    #[arg(help = "The URL of the web page you want to download files from")]
    url: Url,
    #[arg(help = "The extension of the files to download (.jpg, .pdf etc.)")]
    extension: String,
    #[arg(
        short,
        long,
        help = "Cookie for your session ID as KEY=VALUE. (If the web page requires a log-in)"
    )]
    cookie: Option<Cookie>,
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Number of concurrent downloads. Higher values are faster but individual \
        downloads may slow down."
    )]
    threads: u16,
    #[arg(
        short,
        long,
        help = "The directory to store the files in, default is the domain of the URL"
    )]
    path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Downloads all images from a web page",
    long_about = "Downloads every image on a web page, one at a time."
)]
pub struct ImagesCli {
    #[arg(help = "The URL of the web page you want to download images from")]
    url: Url,
    #[arg(short, long, help = "Cookie for your session ID as KEY=VALUE")]
    cookie: Option<Cookie>,
    #[arg(
        short,
        long,
        help = "The directory to store the images in, default is the domain of the URL"
    )]
    path: Option<PathBuf>,
}

impl From<FilesCli> for RunArgs {
    fn from(cli: FilesCli) -> Self {
        RunArgs {
            url: cli.url,
            target: Target::Extension(cli.extension),
            cookie: cli.cookie,
            workers: usize::from(cli.threads),
            path: cli.path,
        }
    }
}

impl From<ImagesCli> for RunArgs {
    fn from(cli: ImagesCli) -> Self {
        RunArgs {
            url: cli.url,
            target: Target::Images,
            cookie: cli.cookie,
            workers: 1,
            path: cli.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_cli_defaults_to_one_worker() {
        let args: RunArgs = FilesCli::try_parse_from(["pscraper", "https://example.com/docs", ".pdf"])
            .unwrap()
            .into();
        assert_eq!(args.workers, 1);
        assert_eq!(args.target, Target::Extension(".pdf".into()));
        assert!(args.cookie.is_none());
        assert!(args.path.is_none());
    }

    #[test]
    fn files_cli_reads_all_options() {
        let args: RunArgs = FilesCli::try_parse_from([
            "pscraper",
            "https://example.com/docs",
            ".pdf",
            "--cookie",
            "sessionid=abc",
            "-t",
            "4",
            "-p",
            "downloads",
        ])
        .unwrap()
        .into();
        assert_eq!(args.workers, 4);
        assert_eq!(
            args.cookie,
            Some(Cookie {
                key: "sessionid".into(),
                value: "abc".into()
            })
        );
        assert_eq!(args.path, Some(PathBuf::from("downloads")));
    }

    #[test]
    fn zero_threads_and_bad_cookies_are_rejected() {
        assert!(FilesCli::try_parse_from(["pscraper", "https://example.com", ".pdf", "-t", "0"]).is_err());
        assert!(
            FilesCli::try_parse_from(["pscraper", "https://example.com", ".pdf", "-c", "novalue"])
                .is_err()
        );
        assert!(FilesCli::try_parse_from(["pscraper", "not a url", ".pdf"]).is_err());
    }

    #[test]
    fn images_cli_is_always_serial() {
        let args: RunArgs = ImagesCli::try_parse_from(["pscraper-images", "http://site/", "-p", "imgs"])
            .unwrap()
            .into();
        assert_eq!(args.workers, 1);
        assert_eq!(args.target, Target::Images);
        assert!(ImagesCli::try_parse_from(["pscraper-images", "http://site/", "-t", "2"]).is_err());
    }
}
