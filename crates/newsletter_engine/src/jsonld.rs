use scraper::{Html, Selector};
use serde_json::Value;

const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting"];

/// The article object from the page's JSON-LD, if any block parses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdArticle {
    object: serde_json::Map<String, Value>,
}

pub fn extract_json_ld(document: &Html) -> Option<JsonLdArticle> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    document.select(&selector).find_map(|script| {
        let text = script.text().collect::<String>();
        let value: Value = serde_json::from_str(text.trim()).ok()?;
        pick_article(value).map(|object| JsonLdArticle { object })
    })
}

/// Arrays and `@graph` containers are searched for an article-typed object,
/// falling back to their first object.
fn pick_article(value: Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Array(items) => pick_from(items),
        Value::Object(mut object) => match object.remove("@graph") {
            Some(Value::Array(items)) => pick_from(items),
            Some(other) => {
                object.insert("@graph".to_string(), other);
                Some(object)
            }
            None => Some(object),
        },
        _ => None,
    }
}

fn pick_from(items: Vec<Value>) -> Option<serde_json::Map<String, Value>> {
    let mut objects: Vec<_> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect();
    let position = objects
        .iter()
        .position(|object| is_article(object.get("@type")))
        .unwrap_or(0);
    if objects.is_empty() {
        None
    } else {
        Some(objects.swap_remove(position))
    }
}

fn is_article(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(kind)) => ARTICLE_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| ARTICLE_TYPES.contains(&kind)),
        _ => false,
    }
}

impl JsonLdArticle {
    fn text(&self, key: &str) -> Option<String> {
        let text = self.object.get(key)?.as_str()?.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn headline(&self) -> Option<String> {
        self.text("headline").or_else(|| self.text("name"))
    }

    pub fn description(&self) -> Option<String> {
        self.text("description")
    }

    pub fn date_published(&self) -> Option<String> {
        self.text("datePublished")
    }

    /// `image` may be a URL string, an `ImageObject`, or a list of either.
    pub fn image(&self) -> Option<String> {
        image_url(self.object.get("image")?)
    }

    pub fn publisher_name(&self) -> Option<String> {
        let name = self.object.get("publisher")?.get("name")?.as_str()?.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
        Value::Object(object) => object.get("url").and_then(image_url),
        Value::Array(items) => items.iter().find_map(image_url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(html: &str) -> Option<JsonLdArticle> {
        extract_json_ld(&Html::parse_document(html))
    }

    #[test]
    fn graph_container_is_searched_for_article() {
        let html = r#"<script type="application/ld+json">
            {"@graph":[{"@type":"WebSite","name":"Site"},{"@type":"NewsArticle","headline":"Story"}]}
        </script>"#;
        assert_eq!(article(html).unwrap().headline().as_deref(), Some("Story"));
    }

    #[test]
    fn broken_block_falls_through_to_next() {
        let html = r#"<script type="application/ld+json">{oops</script>
            <script type="application/ld+json">{"@type":"Article","headline":"Second","image":{"url":"https://cdn.example.com/i.png"}}</script>"#;
        let found = article(html).unwrap();
        assert_eq!(found.headline().as_deref(), Some("Second"));
        assert_eq!(found.image().as_deref(), Some("https://cdn.example.com/i.png"));
    }

    #[test]
    fn image_list_uses_first_entry() {
        let html = r#"<script type="application/ld+json">{"@type":["BlogPosting"],"image":["https://a/1.png","https://a/2.png"],"publisher":{"name":" Weekly "}}</script>"#;
        let found = article(html).unwrap();
        assert_eq!(found.image().as_deref(), Some("https://a/1.png"));
        assert_eq!(found.publisher_name().as_deref(), Some("Weekly"));
    }
}
