use chrono::NaiveDate;

/// One extracted newsletter post.
///
/// Created by the page parser from a single fetch, then filled in with the
/// cleaned body and rendered Markdown before it is written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    /// Absolute canonical URL; unique across a run.
    pub url: String,
    /// Path segment following `/p/`.
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub published_date: NaiveDate,
    /// Unique by name, in extraction order.
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub featured_image_url: Option<String>,
    /// Body fragment as extracted, or cleaned once the cleaner has run.
    pub content_html: String,
    pub content_markdown: String,
    /// Populated only when images are localized.
    pub local_image_paths: ImageManifest,
}

impl PostRecord {
    /// Featured image reference as it should appear in output: the local path
    /// when the image was localized, the remote URL otherwise.
    pub fn featured_image_ref(&self) -> Option<&str> {
        let remote = self.featured_image_url.as_deref()?;
        Some(self.local_image_paths.get(remote).unwrap_or(remote))
    }
}

/// Append `value` unless an equal entry is already present.
pub fn push_unique(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|v| v == value) {
        return;
    }
    values.push(value.to_string());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub remote_url: String,
    pub local_path: String,
}

/// Ordered mapping from original image URL to the relative path it was saved under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageManifest {
    entries: Vec<ImageEntry>,
}

impl ImageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mapping; the first mapping for a URL wins.
    pub fn insert(&mut self, remote_url: impl Into<String>, local_path: impl Into<String>) {
        let remote_url = remote_url.into();
        if self.get(&remote_url).is_some() {
            return;
        }
        self.entries.push(ImageEntry {
            remote_url,
            local_path: local_path.into(),
        });
    }

    pub fn get(&self, remote_url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.remote_url == remote_url)
            .map(|e| e.local_path.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_unique_keeps_first_occurrence_order() {
        let mut names = Vec::new();
        push_unique(&mut names, "Ada");
        push_unique(&mut names, " Grace ");
        push_unique(&mut names, "Ada");
        push_unique(&mut names, "   ");
        assert_eq!(names, vec!["Ada".to_string(), "Grace".to_string()]);
    }

    #[test]
    fn manifest_first_mapping_wins() {
        let mut manifest = ImageManifest::new();
        manifest.insert("https://cdn.example.com/a.jpg", "images/a.jpg");
        manifest.insert("https://cdn.example.com/a.jpg", "images/other.jpg");
        assert_eq!(manifest.len(), 1);
        assert_eq!(
            manifest.get("https://cdn.example.com/a.jpg"),
            Some("images/a.jpg")
        );
    }
}
