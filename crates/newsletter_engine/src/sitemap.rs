//! Post discovery from the publication's sitemap.

use std::collections::HashSet;

use engine_logging::{engine_info, engine_warn};
use newsletter_core::is_post_url;
use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

use crate::decode::{decode_body, DecodeError};
use crate::{FetchError, Fetcher};

pub const DEFAULT_SITEMAP_PATH: &str = "/sitemap.xml";

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("could not build sitemap url from {base} and {path}")]
    InvalidLocation { base: String, path: String },
    #[error("failed to fetch sitemap {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to decode sitemap: {0}")]
    Decode(#[from] DecodeError),
    #[error("sitemap is not valid xml: {0}")]
    Xml(String),
    #[error("document is not a sitemap (root element {0:?})")]
    NotASitemap(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>`: a list of page URLs.
    UrlSet,
    /// `<sitemapindex>`: a list of further sitemap files.
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSitemap {
    pub kind: SitemapKind,
    /// `<loc>` values in document order.
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub sitemap_url: String,
    pub kind: SitemapKind,
    pub entry_count: usize,
    /// Unique post URLs in sitemap order.
    pub post_urls: Vec<String>,
}

/// Parse a sitemap document. Both `<urlset>` and `<sitemapindex>` roots are
/// accepted; anything else is rejected.
pub fn parse_sitemap(xml: &str) -> Result<ParsedSitemap, DiscoveryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = None;
    let mut root_name = None;
    let mut root_closed = false;
    // Open elements; the root is depth 1, entries depth 2, their `<loc>` depth 3.
    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current_loc = String::new();
    let mut locations = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match depth {
                    1 => {
                        let name = String::from_utf8_lossy(name.as_ref()).into_owned();
                        kind = root_kind(&name);
                        root_name = Some(name);
                        if kind.is_none() {
                            break;
                        }
                    }
                    2 if matches!(name.as_ref(), b"url" | b"sitemap") => {
                        in_entry = true;
                        current_loc.clear();
                    }
                    // Extension children such as `<image:loc>` sit deeper and are ignored.
                    3 if in_entry && name.as_ref() == b"loc" => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) if depth == 0 => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                kind = root_kind(&name);
                root_name = Some(name);
                root_closed = true;
                break;
            }
            Ok(Event::End(_)) => {
                match depth {
                    3 => in_loc = false,
                    2 if in_entry => {
                        let loc = current_loc.trim();
                        if !loc.is_empty() {
                            locations.push(loc.to_string());
                        }
                        in_entry = false;
                    }
                    1 => {
                        root_closed = true;
                        break;
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|err| DiscoveryError::Xml(err.to_string()))?;
                current_loc.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current_loc.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(DiscoveryError::Xml(format!(
                    "at position {}: {err}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    let Some(kind) = kind else {
        return Err(DiscoveryError::NotASitemap(root_name));
    };
    if !root_closed {
        return Err(DiscoveryError::Xml(format!(
            "document ends before </{}> at position {}",
            root_name.unwrap_or_default(),
            reader.buffer_position()
        )));
    }
    Ok(ParsedSitemap { kind, locations })
}

fn root_kind(name: &str) -> Option<SitemapKind> {
    match name {
        "urlset" => Some(SitemapKind::UrlSet),
        "sitemapindex" => Some(SitemapKind::Index),
        _ => None,
    }
}

/// Keep only `/p/{slug}` URLs, dropping exact duplicates but keeping first-seen order.
pub fn select_post_urls(locations: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut posts = Vec::new();
    for loc in locations {
        if is_post_url(loc) && seen.insert(loc.as_str()) {
            posts.push(loc.clone());
        }
    }
    posts
}

pub fn sitemap_url(base_url: &Url, sitemap_path: &str) -> Result<Url, DiscoveryError> {
    let invalid = || DiscoveryError::InvalidLocation {
        base: base_url.to_string(),
        path: sitemap_path.to_string(),
    };
    if sitemap_path.starts_with("http://") || sitemap_path.starts_with("https://") {
        return Url::parse(sitemap_path).map_err(|_| invalid());
    }
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(sitemap_path.trim_start_matches('/'))
        .map_err(|_| invalid())
}

/// Fetch the sitemap and return the post URLs it lists.
///
/// A sitemap index is not followed; it is reported as a warning and yields no posts.
pub async fn discover_posts(
    fetcher: &dyn Fetcher,
    base_url: &Url,
    sitemap_path: &str,
) -> Result<Discovery, DiscoveryError> {
    let url = sitemap_url(base_url, sitemap_path)?;
    engine_info!("Fetching sitemap from {}", url);
    let output = fetcher
        .fetch(url.as_str())
        .await
        .map_err(|source| DiscoveryError::Fetch {
            url: url.to_string(),
            source,
        })?;
    let xml = decode_body(&output.bytes, output.metadata.content_type.as_deref())?;
    let parsed = parse_sitemap(&xml)?;

    let post_urls = match parsed.kind {
        SitemapKind::UrlSet => select_post_urls(&parsed.locations),
        SitemapKind::Index => {
            engine_warn!(
                "{} is a sitemap index referencing {} sitemaps; nested sitemaps are not followed",
                url,
                parsed.locations.len()
            );
            Vec::new()
        }
    };
    engine_info!(
        "Sitemap lists {} URLs, {} of them posts",
        parsed.locations.len(),
        post_urls.len()
    );

    Ok(Discovery {
        sitemap_url: url.to_string(),
        kind: parsed.kind,
        entry_count: parsed.locations.len(),
        post_urls,
    })
}
