use chrono::NaiveDate;
use newsletter_core::{sort_chronologically, ImageManifest, PostRecord};
use pretty_assertions::assert_eq;

fn record(slug: &str, date: (i32, u32, u32)) -> PostRecord {
    PostRecord {
        url: format!("https://news.example.com/p/{slug}"),
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        description: None,
        published_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        authors: vec!["Example Weekly".to_string()],
        tags: Vec::new(),
        featured_image_url: None,
        content_html: String::new(),
        content_markdown: String::new(),
        local_image_paths: ImageManifest::new(),
    }
}

#[test]
fn older_post_sorts_first() {
    engine_logging::initialize_for_tests();
    let mut records = vec![record("newer", (2024, 1, 15)), record("older", (2023, 6, 1))];
    sort_chronologically(&mut records);

    let slugs: Vec<_> = records.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["older", "newer"]);
}

#[test]
fn same_day_posts_keep_discovery_order() {
    let mut records = vec![
        record("third", (2024, 3, 1)),
        record("first-of-day", (2024, 2, 1)),
        record("second-of-day", (2024, 2, 1)),
    ];
    sort_chronologically(&mut records);

    let slugs: Vec<_> = records.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["first-of-day", "second-of-day", "third"]);
}

#[test]
fn featured_image_ref_prefers_local_path() {
    let mut post = record("hero", (2024, 1, 1));
    post.featured_image_url = Some("https://cdn.example.com/hero.png".to_string());
    assert_eq!(
        post.featured_image_ref(),
        Some("https://cdn.example.com/hero.png")
    );

    post.local_image_paths
        .insert("https://cdn.example.com/hero.png", "images/hero-00-hero.png");
    assert_eq!(post.featured_image_ref(), Some("images/hero-00-hero.png"));
}
