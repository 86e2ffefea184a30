use url::Url;

/// Slug of a post URL: the single path segment following `/p/`.
///
/// A trailing slash is accepted; deeper paths (`/p/{slug}/more`) are not posts.
pub fn post_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let mut segments: Vec<&str> = parsed.path_segments()?.collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }
    match segments.as_slice() {
        ["p", slug] if !slug.is_empty() => Some((*slug).to_string()),
        _ => None,
    }
}

pub fn is_post_url(url: &str) -> bool {
    post_slug(url).is_some()
}

/// Host name of the publication without a leading `www.`.
pub fn publication_domain(base: &Url) -> Option<String> {
    let host = base.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
