use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use newsletter_core::{post_slug, push_unique, ImageManifest, PostRecord};
use scraper::{Html, Selector};
use url::Url;

use crate::hydration::{extract_hydration, HydrationState};
use crate::jsonld::{extract_json_ld, JsonLdArticle};

/// Marker of the element that wraps the post body in the platform's page template.
pub const CONTENT_CONTAINER_SELECTOR: &str = "div#content-blocks";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0} is not a post url")]
    NotAPostUrl(String),
    #[error("content container `{0}` not found (template change or not a post page)")]
    MissingContent(String),
    #[error("no title found")]
    MissingTitle,
    #[error(transparent)]
    Date(#[from] DateResolutionError),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DateResolutionError {
    #[error("no published date found")]
    Missing,
    #[error("published date {0:?} is not a recognised date")]
    Unparseable(String),
}

pub trait PageParser: Send + Sync {
    fn parse(&self, html: &str, url: &str) -> Result<PostRecord, ParseError>;
}

/// Parser for the newsletter platform's post template.
///
/// Every field is taken from the first source that yields a non-empty value:
/// JSON-LD, then meta tags, then the hydration blob or the `<title>` element.
#[derive(Debug, Clone)]
pub struct PostPageParser {
    content_selector: String,
}

impl Default for PostPageParser {
    fn default() -> Self {
        Self::new(CONTENT_CONTAINER_SELECTOR)
    }
}

impl PostPageParser {
    pub fn new(content_selector: impl Into<String>) -> Self {
        Self {
            content_selector: content_selector.into(),
        }
    }
}

impl PageParser for PostPageParser {
    fn parse(&self, html: &str, url: &str) -> Result<PostRecord, ParseError> {
        let slug = post_slug(url).ok_or_else(|| ParseError::NotAPostUrl(url.to_string()))?;
        let document = Html::parse_document(html);

        let content_html = Selector::parse(&self.content_selector)
            .ok()
            .and_then(|sel| document.select(&sel).next().map(|node| node.inner_html()))
            .ok_or_else(|| ParseError::MissingContent(self.content_selector.clone()))?;

        let json_ld = extract_json_ld(&document).unwrap_or_default();
        let meta = MetaTags::from_document(&document);
        let hydration = extract_hydration(&document);
        let page_title = title_element(&document);

        let title = json_ld
            .headline()
            .or_else(|| meta.get("og:title"))
            .or_else(|| page_title.clone())
            .ok_or(ParseError::MissingTitle)?;

        let description = json_ld
            .description()
            .or_else(|| meta.get("description"))
            .or_else(|| meta.get("og:description"));

        let published_date = resolve_date(&json_ld, &meta)?;

        let featured_image_url = hydration
            .as_ref()
            .and_then(HydrationState::featured_image)
            .or_else(|| json_ld.image())
            .or_else(|| meta.get("og:image"))
            .map(|raw| absolutize(&raw, url));

        let mut authors = Vec::new();
        if let Some(state) = hydration.as_ref() {
            for name in state.authors() {
                push_unique(&mut authors, &name);
            }
        }
        if authors.is_empty() {
            let publication = hydration
                .as_ref()
                .and_then(HydrationState::publication_name)
                .or_else(|| json_ld.publisher_name())
                .or_else(|| meta.get("og:site_name"))
                .or(page_title);
            if let Some(name) = publication {
                push_unique(&mut authors, &name);
            }
        }

        let mut tags = Vec::new();
        if let Some(state) = hydration.as_ref() {
            for tag in state.tags() {
                push_unique(&mut tags, &tag);
            }
        }

        Ok(PostRecord {
            url: url.to_string(),
            slug,
            title,
            description,
            published_date,
            authors,
            tags,
            featured_image_url,
            content_html,
            content_markdown: String::new(),
            local_image_paths: ImageManifest::new(),
        })
    }
}

fn resolve_date(json_ld: &JsonLdArticle, meta: &MetaTags) -> Result<NaiveDate, DateResolutionError> {
    let candidates = [
        json_ld.date_published(),
        meta.get("article:published_time"),
    ];
    let mut first_unparseable = None;
    for raw in candidates.into_iter().flatten() {
        match parse_date(&raw) {
            Some(date) => return Ok(date),
            None => {
                first_unparseable.get_or_insert(raw);
            }
        }
    }
    Err(match first_unparseable {
        Some(raw) => DateResolutionError::Unparseable(raw),
        None => DateResolutionError::Missing,
    })
}

/// Calendar date of an RFC 3339, RFC 2822, naive ISO timestamp or plain `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    let prefix = raw.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn title_element(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn absolutize(raw: &str, page_url: &str) -> String {
    if Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(raw))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// `<meta>` contents keyed by lowercased `property` or `name`; first occurrence wins.
struct MetaTags {
    values: HashMap<String, String>,
}

impl MetaTags {
    fn from_document(document: &Html) -> Self {
        let mut values = HashMap::new();
        if let Ok(selector) = Selector::parse("meta[content]") {
            for meta in document.select(&selector) {
                let element = meta.value();
                let Some(content) = element.attr("content").map(str::trim) else {
                    continue;
                };
                if content.is_empty() {
                    continue;
                }
                for key in [element.attr("property"), element.attr("name")]
                    .into_iter()
                    .flatten()
                {
                    values
                        .entry(key.trim().to_ascii_lowercase())
                        .or_insert_with(|| content.to_string());
                }
            }
        }
        Self { values }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::parse_date;
    use chrono::NaiveDate;

    #[test]
    fn accepts_common_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15T08:30:00.000Z"), expected);
        assert_eq!(parse_date("2024-01-15T08:30:00+02:00"), expected);
        assert_eq!(parse_date("Mon, 15 Jan 2024 08:30:00 +0000"), expected);
        assert_eq!(parse_date("2024-01-15T08:30:00"), expected);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }
}
