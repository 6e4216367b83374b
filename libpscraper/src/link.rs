use crate::errors::{Result, ScrapeError};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{event, instrument, Level};
use url::{ParseError, Url};

const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

lazy_static! {
    static ref IMG_SELECTOR: Selector = Selector::parse("img").expect("static img selector");
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a").expect("static anchor selector");
}

/// What a run looks for on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every image on the page, whatever its extension.
    Images,
    /// Files with the given extension, e.g. ".pdf". Image extensions
    /// (".jpg", ".jpeg", ".png") select images instead of links.
    Extension(String),
}

impl Target {
    fn scans_images(&self) -> bool {
        match self {
            Target::Images => true,
            Target::Extension(ext) => IMAGE_EXTENSIONS.contains(&ext.as_str()),
        }
    }
}

#[instrument]
/// Get the full link to a file, given a page's full url.
pub fn resolve(page_url: &Url, link: &str) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(e)
            if e == ParseError::EmptyHost
                || e == ParseError::RelativeUrlWithoutBase
                || e == ParseError::RelativeUrlWithCannotBeABaseBase =>
        {
            match page_url.join(link) {
                Ok(url) => Some(url),
                Err(e) => {
                    event!(Level::DEBUG, "Failed to join {} onto {}: {}", link, page_url, e);
                    None
                }
            }
        }
        Err(e) => {
            event!(Level::DEBUG, "Failed to get full link for {}", link);
            event!(Level::DEBUG, "{}", e);
            None
        }
    }
}

/// Everything before the first `?`, or the whole input.
pub fn truncate_at_query(url: &str) -> &str {
    match url.find('?') {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// A url is valid when it has both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Last `n` characters of `s`, or all of `s` when it is shorter.
fn tail(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Only the final 3 or 4 characters of the href are compared, so longer
/// extensions never match.
pub fn matches_extension(href: &str, extension: &str) -> bool {
    tail(href, 3) == extension || tail(href, 4) == extension
}

/// Resolves, strips the query from and validates a raw attribute value.
fn to_candidate(page_url: &Url, raw: &str) -> Option<Url> {
    let full_link = resolve(page_url, raw)?;
    let stripped = truncate_at_query(full_link.as_str());
    if !is_valid_url(stripped) {
        tracing::debug!("Dropping invalid link {} (from {})", stripped, raw);
        return None;
    }
    let candidate = Url::parse(stripped).ok()?;
    tracing::debug!("Full link for {} => {}", raw, &candidate);
    Some(candidate)
}

/// Collects the file links in `document` for `target`, in document order.
/// Duplicates are kept. Finding nothing for an extension is an error, a page
/// without images is not.
#[instrument(skip(document, page_url), fields(page_url = %page_url))]
pub fn extract(document: &Html, page_url: &Url, target: &Target) -> Result<Vec<Url>> {
    let (elements, attribute, kind): (Vec<ElementRef>, &str, &'static str) =
        if target.scans_images() {
            (document.select(&IMG_SELECTOR).collect(), "src", "images")
        } else {
            (document.select(&ANCHOR_SELECTOR).collect(), "href", "files")
        };
    let scanned = elements.len();

    let links: Vec<Url> = elements
        .iter()
        .filter_map(|element| element.value().attr(attribute))
        .filter(|value| !value.is_empty())
        .filter(|value| match target {
            Target::Extension(ext) if !target.scans_images() => matches_extension(value, ext),
            _ => true,
        })
        .filter_map(|value| to_candidate(page_url, value))
        .collect();

    tracing::debug!("{} of {} {} matched", links.len(), scanned, kind);
    match target {
        Target::Extension(ext) if links.is_empty() => Err(ScrapeError::NoMatches {
            scanned,
            kind,
            extension: ext.to_string(),
        }),
        _ => Ok(links),
    }
}

/// Parses `html` and runs [`extract`] on it.
pub fn extract_from_str(html: &str, page_url: &Url, target: &Target) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    extract(&document, page_url, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Url {
        Url::parse("http://site/").unwrap()
    }

    fn strings(links: Vec<Url>) -> Vec<String> {
        links.into_iter().map(String::from).collect()
    }

    #[test]
    fn resolve_keeps_base_for_relative_links() {
        let base = Url::parse("https://example.com/gallery/index.html").unwrap();
        let full = resolve(&base, "img/a.png").unwrap();
        assert_eq!(full.scheme(), "https");
        assert_eq!(full.host_str(), Some("example.com"));
        assert_eq!(full.as_str(), "https://example.com/gallery/img/a.png");

        let rooted = resolve(&base, "/b.png").unwrap();
        assert_eq!(rooted.as_str(), "https://example.com/b.png");
    }

    #[test]
    fn resolve_handles_scheme_relative_and_absolute_links() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert_eq!(
            resolve(&base, "//cdn.example.org/x.jpg").unwrap().as_str(),
            "https://cdn.example.org/x.jpg"
        );
        let absolute = resolve(&base, "ftp://files.example.net/doc.pdf").unwrap();
        assert_eq!(absolute.scheme(), "ftp");
        assert_eq!(absolute.host_str(), Some("files.example.net"));
    }

    #[test]
    fn truncate_at_query_drops_query_and_is_idempotent() {
        assert_eq!(truncate_at_query("http://x/y.jpg?c=1"), "http://x/y.jpg");
        assert_eq!(truncate_at_query("http://x/y.jpg"), "http://x/y.jpg");
        let once = truncate_at_query("http://x/y.jpg?c=1?d=2");
        assert_eq!(truncate_at_query(once), once);
    }

    #[test]
    fn valid_url_needs_scheme_and_host() {
        assert!(is_valid_url("http://x/y"));
        assert!(is_valid_url("ftp://host"));
        assert!(!is_valid_url("/relative/path"));
        assert!(!is_valid_url("mailto:someone@example.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn extension_match_only_looks_at_the_tail() {
        assert!(matches_extension("/docs/report.pdf", ".pdf"));
        assert!(matches_extension("/docs/report.pdf", "pdf"));
        assert!(matches_extension("pdf", "pdf"));
        assert!(!matches_extension("/docs/report.PDF", ".pdf"));
        assert!(!matches_extension("/docs/archive.tar.gz", ".tar.gz"));
        assert!(!matches_extension("/img/photo.jpeg", ".jpeg"));
        assert!(matches_extension("/ünïcödé.txt", ".txt"));
    }

    #[test]
    fn images_are_resolved_and_stripped() {
        let html = r#"<html><body>
            <img src="a.jpg">
            <img src="">
            <img src="http://cdn/b.jpg?v=2">
        </body></html>"#;
        let links = extract_from_str(html, &site(), &Target::Extension(".jpg".into())).unwrap();
        assert_eq!(strings(links), vec!["http://site/a.jpg", "http://cdn/b.jpg"]);
    }

    #[test]
    fn image_mode_ignores_extension_and_missing_src() {
        let html = r#"<img><img src="x.gif"><img src="y.png?size=large"><img src="x.gif">"#;
        let links = extract_from_str(html, &site(), &Target::Images).unwrap();
        assert_eq!(
            strings(links),
            vec!["http://site/x.gif", "http://site/y.png", "http://site/x.gif"]
        );
    }

    #[test]
    fn links_are_filtered_by_extension() {
        let html = r#"
            <a href="/files/one.pdf">one</a>
            <a>no href</a>
            <a href="two.pdf">two</a>
            <a href="three.pdf?download=1">three</a>
            <a href="notes.txt">notes</a>
            <a href="mailto:x@y.pdf">mail</a>
            <img src="ignored.pdf">
        "#;
        let base = Url::parse("https://docs.example.com/list/").unwrap();
        let links = extract_from_str(html, &base, &Target::Extension(".pdf".into())).unwrap();
        assert_eq!(
            strings(links),
            vec![
                "https://docs.example.com/files/one.pdf",
                "https://docs.example.com/list/two.pdf",
            ]
        );
    }

    #[test]
    fn no_match_reports_scanned_count() {
        let html = r#"<a href="a.txt">a</a><a href="b.txt">b</a>"#;
        let err = extract_from_str(html, &site(), &Target::Extension(".pdf".into())).unwrap_err();
        assert_eq!(
            err,
            ScrapeError::NoMatches {
                scanned: 2,
                kind: "files",
                extension: ".pdf".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Of the 2 files, none of them had .pdf as their extension. No files were downloaded."
        );
    }

    #[test]
    fn page_without_images_yields_nothing() {
        let links = extract_from_str("<p>no images</p>", &site(), &Target::Images).unwrap();
        assert!(links.is_empty());
        let links = extract_from_str(r#"<img alt="x"><img src="">"#, &site(), &Target::Images).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn image_extension_without_images_is_a_no_match() {
        let err = extract_from_str("<p>nothing</p>", &site(), &Target::Extension(".png".into()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Of the 0 images, none of them had .png as their extension. No files were downloaded."
        );
    }
}
