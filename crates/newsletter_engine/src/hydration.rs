//! Client-side hydration state embedded in post pages.
//!
//! The page initializes its router from a JSON object assigned to a global in an
//! inline script. That object is the only source for authors and tags, so it is
//! read on a best-effort basis: a missing or malformed blob is simply "no data".

use engine_logging::engine_debug;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

pub const HYDRATION_MARKER: &str = "window.__remixContext";

const IMAGE_KEYS: &[&str] = &["thumbnail_url", "image_url", "featured_image_url"];

/// Parsed hydration object.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrationState {
    root: Map<String, Value>,
}

/// Locate and parse the hydration blob of a parsed page.
pub fn extract_hydration(document: &Html) -> Option<HydrationState> {
    let selector = Selector::parse("script").ok()?;
    document
        .select(&selector)
        .filter(|script| script.value().attr("src").is_none())
        .map(|script| script.text().collect::<String>())
        .filter(|text| text.contains(HYDRATION_MARKER))
        .find_map(|text| parse_assignment(&text))
}

/// Parse the JSON object assigned to the hydration marker inside one script body.
pub fn parse_assignment(script: &str) -> Option<HydrationState> {
    let start = script.find(HYDRATION_MARKER)? + HYDRATION_MARKER.len();
    let rest = script[start..].trim_start();
    let payload = rest.strip_prefix('=')?.trim_start();
    if !payload.starts_with('{') {
        return None;
    }

    // Only the first value is read, so trailing `;` or further statements are fine.
    let mut values = serde_json::Deserializer::from_str(payload).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(root))) => Some(HydrationState { root }),
        Some(Ok(_)) => None,
        Some(Err(err)) => {
            engine_debug!("hydration blob did not parse: {}", err);
            None
        }
        None => None,
    }
}

impl HydrationState {
    fn loader_data(&self) -> Option<&Map<String, Value>> {
        self.root.get("state")?.get("loaderData")?.as_object()
    }

    /// Loader entry for the post route, preferring the exact `p/$slug` route.
    fn post_route(&self) -> Option<&Value> {
        let loader = self.loader_data()?;
        loader
            .iter()
            .find(|(key, _)| key.contains("p/$slug"))
            .or_else(|| loader.iter().find(|(key, _)| key.contains("p/")))
            .map(|(_, value)| value)
            .filter(|value| value.is_object())
    }

    fn post(&self) -> Option<&Value> {
        let route = self.post_route()?;
        match route.get("post") {
            Some(post) if post.is_object() => Some(post),
            _ => Some(route),
        }
    }

    /// Author names in the order the page lists them.
    pub fn authors(&self) -> Vec<String> {
        self.post()
            .and_then(|post| post.get("authors"))
            .map(|authors| named_items(authors, &["name", "display_name"]))
            .unwrap_or_default()
    }

    pub fn tags(&self) -> Vec<String> {
        self.post()
            .and_then(|post| post.get("content_tags"))
            .map(|tags| named_items(tags, &["name", "display"]))
            .unwrap_or_default()
    }

    pub fn featured_image(&self) -> Option<String> {
        let post = self.post()?;
        IMAGE_KEYS
            .iter()
            .find_map(|key| non_empty_str(post.get(*key)))
    }

    /// Display name of the publication, from the post route or the root route.
    pub fn publication_name(&self) -> Option<String> {
        let from_route = |route: &Value| non_empty_str(route.get("publication")?.get("name"));
        if let Some(name) = self.post_route().and_then(from_route) {
            return Some(name);
        }
        let loader = self.loader_data()?;
        if let Some(name) = loader.get("root").and_then(from_route) {
            return Some(name);
        }
        loader.values().find_map(from_route)
    }
}

fn named_items(value: &Value, keys: &[&str]) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.trim().to_string()),
            Value::Object(_) => keys.iter().find_map(|key| non_empty_str(item.get(*key))),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = r#"window.__remixContext = {"state":{"loaderData":{
        "root":{"publication":{"name":"Example Weekly"}},
        "routes/p/$slug":{"post":{
            "authors":[{"name":"Ada"},{"display_name":"Grace"},{"name":""}],
            "content_tags":[{"name":"rust"},{"name":"parsing"}],
            "thumbnail_url":"https://cdn.example.com/hero.png"
        }}
    }}};"#;

    #[test]
    fn reads_post_fields() {
        let state = parse_assignment(BLOB).expect("blob parses");
        assert_eq!(state.authors(), vec!["Ada", "Grace"]);
        assert_eq!(state.tags(), vec!["rust", "parsing"]);
        assert_eq!(
            state.featured_image().as_deref(),
            Some("https://cdn.example.com/hero.png")
        );
        assert_eq!(state.publication_name().as_deref(), Some("Example Weekly"));
    }

    #[test]
    fn trailing_statements_are_ignored() {
        let script = r#"window.__remixContext = {"state":{}}; window.other = 1;"#;
        assert!(parse_assignment(script).is_some());
    }

    #[test]
    fn truncated_json_is_no_data() {
        let script = r#"window.__remixContext = {"state":{"loaderData":{"#;
        assert!(parse_assignment(script).is_none());
    }

    #[test]
    fn non_object_payload_is_no_data() {
        assert!(parse_assignment("window.__remixContext = null;").is_none());
        assert!(parse_assignment("window.__remixContext.x = 1;").is_none());
    }

    #[test]
    fn missing_post_route_yields_empty_lists() {
        let state = parse_assignment(r#"window.__remixContext = {"state":{"loaderData":{}}}"#)
            .expect("blob parses");
        assert!(state.authors().is_empty());
        assert!(state.tags().is_empty());
        assert_eq!(state.publication_name(), None);
    }

    #[test]
    fn external_and_unrelated_scripts_are_skipped() {
        let html = format!(
            "<html><head><script src=\"/app.js\"></script><script>var x = 1;</script><script>{BLOB}</script></head></html>"
        );
        let doc = Html::parse_document(&html);
        let state = extract_hydration(&doc).expect("found");
        assert_eq!(state.tags(), vec!["rust", "parsing"]);
    }
}
