use newsletter_core::PostRecord;
use serde::Serialize;

/// YAML header written before every post body. Key order is the output order.
#[derive(Debug, Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    date: String,
    url: &'a str,
    slug: &'a str,
    description: &'a str,
    featured_image: Option<&'a str>,
    authors: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    tags: &'a [String],
}

fn is_empty(values: &&[String]) -> bool {
    values.is_empty()
}

/// `---\n{yaml}---\n\n{markdown body}` for one post.
pub fn build_markdown_document(record: &PostRecord) -> Result<String, serde_yaml::Error> {
    let frontmatter = Frontmatter {
        title: &record.title,
        date: record.published_date.format("%Y-%m-%d").to_string(),
        url: &record.url,
        slug: &record.slug,
        description: record.description.as_deref().unwrap_or_default(),
        featured_image: record.featured_image_ref(),
        authors: &record.authors,
        tags: &record.tags,
    };
    let yaml = serde_yaml::to_string(&frontmatter)?;
    Ok(format!(
        "---\n{yaml}---\n\n{body}",
        body = record.content_markdown.trim()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use newsletter_core::ImageManifest;

    fn record() -> PostRecord {
        PostRecord {
            url: "https://news.example.com/p/hello".into(),
            slug: "hello".into(),
            title: "Hello: a start".into(),
            description: None,
            published_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            authors: vec!["Ada".into()],
            tags: Vec::new(),
            featured_image_url: None,
            content_html: String::new(),
            content_markdown: "Body\n".into(),
            local_image_paths: ImageManifest::new(),
        }
    }

    #[test]
    fn empty_tags_are_omitted_and_absent_fields_written() {
        let doc = build_markdown_document(&record()).unwrap();
        assert!(doc.starts_with("---\ntitle: "));
        assert!(doc.contains("\ndescription: ''\n"));
        assert!(doc.contains("\nfeatured_image: null\n"));
        assert!(doc.contains("\nauthors:\n- Ada\n"));
        assert!(!doc.contains("tags:"));
        assert!(doc.ends_with("---\n\nBody"));
    }

    #[test]
    fn frontmatter_parses_back_as_yaml() {
        let mut record = record();
        record.tags = vec!["rust".into(), "news".into()];
        let doc = build_markdown_document(&record).unwrap();
        let yaml = doc
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("---\n"))
            .map(|(yaml, _)| yaml)
            .unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(value["title"].as_str(), Some("Hello: a start"));
        assert_eq!(value["slug"].as_str(), Some("hello"));
        assert_eq!(value["tags"][1].as_str(), Some("news"));
    }
}
