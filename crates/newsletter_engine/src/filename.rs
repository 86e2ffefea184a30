use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use url::Url;

const MAX_STEM_CHARS: usize = 80;

/// Windows-safe, deterministic post filename: `{date}-{slug}.md`.
pub fn post_filename(date: NaiveDate, slug: &str) -> String {
    let stem = sanitize_component(&format!("{}-{}", date.format("%Y-%m-%d"), slug), "post");
    format!("{stem}.md")
}

/// Deterministic local name for the `index`-th image of a post:
/// `{slug}-{index:02}-{original filename}`. The original name falls back to a
/// short hash of the URL, and a missing extension to `.jpg`.
pub fn image_filename(slug: &str, index: usize, image_url: &str) -> String {
    let original = Url::parse(image_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.trim().is_empty());

    let (stem, extension) = match original {
        Some(name) => split_extension(&name),
        None => (short_hash(image_url), None),
    };
    let stem = sanitize_component(&stem, &short_hash(image_url));
    let extension = extension
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());
    let slug = sanitize_component(slug, "post");
    format!("{slug}-{index:02}-{stem}.{extension}")
}

fn split_extension(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (name.to_string(), None),
    }
}

fn sanitize_component(input: &str, fallback: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let mut final_name: String = compacted.chars().take(MAX_STEM_CHARS).collect();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | '%' | '#' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

pub(crate) fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
