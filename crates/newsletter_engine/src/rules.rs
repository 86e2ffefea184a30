//! Boilerplate rules. Each rule inspects one element of the parsed body and
//! names the subtree to drop, if any; the cleaner does the removing.

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Node};
use url::Url;

/// Kinds of platform boilerplate the cleaner knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    HeroImage,
    ReadTimeBadge,
    Sponsor,
    TrackingPixel,
    HiddenElement,
    SubscribeCta,
    ShareReferral,
    Footer,
    EmptyBlock,
}

impl RuleKind {
    pub const ALL: [RuleKind; 9] = [
        RuleKind::HeroImage,
        RuleKind::ReadTimeBadge,
        RuleKind::Sponsor,
        RuleKind::TrackingPixel,
        RuleKind::HiddenElement,
        RuleKind::SubscribeCta,
        RuleKind::ShareReferral,
        RuleKind::Footer,
        RuleKind::EmptyBlock,
    ];

    pub fn rule(self) -> Box<dyn BoilerplateRule> {
        match self {
            RuleKind::HeroImage => Box::new(HeroImageRule),
            RuleKind::ReadTimeBadge => Box::new(ReadTimeBadgeRule),
            RuleKind::Sponsor => Box::new(SponsorRule),
            RuleKind::TrackingPixel => Box::new(TrackingPixelRule),
            RuleKind::HiddenElement => Box::new(HiddenElementRule),
            RuleKind::SubscribeCta => Box::new(SubscribeCtaRule),
            RuleKind::ShareReferral => Box::new(ShareReferralRule),
            RuleKind::Footer => Box::new(FooterRule),
            RuleKind::EmptyBlock => Box::new(EmptyBlockRule),
        }
    }
}

/// Per-post facts some rules need.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanContext<'a> {
    pub featured_image_url: Option<&'a str>,
}

/// What a rule wants removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The subtree rooted at this node.
    Subtree(NodeId),
    /// This node and every sibling that follows it.
    FromHereOn(NodeId),
}

pub trait BoilerplateRule: Send + Sync {
    fn kind(&self) -> RuleKind;

    /// Removal target for `element`, or `None` when it is not boilerplate.
    /// Never called for the fragment root.
    fn removal_target(&self, element: ElementRef<'_>, ctx: &CleanContext<'_>) -> Option<Removal>;
}

static READ_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+\s*(min|mins|minute|minutes)\s+read|[\d.,]+\s*[km]?\s+(views?|reads))$")
        .expect("READ_TIME_RE should compile")
});
static SPONSOR_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(sponsored by|presented by|brought to you by|today.s sponsor|this (issue|newsletter|edition) is (sponsored|brought to you) by)\b")
        .expect("SPONSOR_LEAD_RE should compile")
});
static HIDDEN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden")
        .expect("HIDDEN_STYLE_RE should compile")
});
static SUBSCRIBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsubscribe\b|\bsign\s?up\b|\bjoin (now|free|for free|\d[\d,]* (readers|subscribers|others))|\bupgrade to (premium|paid|pro)\b")
        .expect("SUBSCRIBE_RE should compile")
});
static SHARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bshare (this|the|our)?\s*(post|article|issue|newsletter|email)\b|\bforward(ed)? this\b|\bread (this )?(online|in (your )?browser)\b|\brefer (a friend|\d+ friends?)\b")
        .expect("SHARE_RE should compile")
});
static FOOTER_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bunsubscribe\b|\bupdate (your )?(email )?preferences\b|\bmanage (your )?subscription\b")
        .expect("FOOTER_LINK_RE should compile")
});
static SIGN_OFF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)whenever you.re ready|\bways? (we|i) can help you\b|what did you think of (today|this)|how did you like (today|this)")
        .expect("SIGN_OFF_RE should compile")
});
static CTA_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cta[^/]*\.(png|jpe?g|gif|webp)$").expect("CTA_IMAGE_RE should compile")
});
static FOOTER_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(footer|divider)[^/]*\.(png|jpe?g|gif|webp)$")
        .expect("FOOTER_IMAGE_RE should compile")
});

const AD_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "googleadservices.com",
    "googlesyndication.com",
    "adclick.g.doubleclick.net",
    "sponsy.io",
    "passionfroot.me",
    "paved.com",
];
const TRACKING_HOST_MARKERS: &[&str] = &["pixel", "track", "beacon", "analytics", "open."];
const TRACKING_PATH_MARKERS: &[&str] = &[
    "/o/",
    "/open/",
    "/open.gif",
    "pixel.gif",
    "pixel.png",
    "/beacon",
    "/track/",
    "/track.gif",
];
const SOCIAL_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "linkedin.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
    "threads.net",
    "bsky.app",
];
const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "audio", "iframe", "svg", "object", "embed"];

/// Upper bound on the text of a wrapper a link-triggered rule may climb into.
const SHORT_BLOCK_CHARS: usize = 200;

/// Image duplicating the featured image at the top of the body.
pub struct HeroImageRule;

impl BoilerplateRule for HeroImageRule {
    fn kind(&self) -> RuleKind {
        RuleKind::HeroImage
    }

    fn removal_target(&self, element: ElementRef<'_>, ctx: &CleanContext<'_>) -> Option<Removal> {
        let featured = ctx.featured_image_url?;
        if element.value().name() != "img" {
            return None;
        }
        let src = element.value().attr("src")?;
        if !same_image(src, featured) || !is_first_image(element) {
            return None;
        }
        Some(Removal::Subtree(media_wrapper(element)))
    }
}

/// "5 min read" / "1.2k views" badges.
pub struct ReadTimeBadgeRule;

impl BoilerplateRule for ReadTimeBadgeRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ReadTimeBadge
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        if has_media(element) {
            return None;
        }
        let text = collapsed_text(element);
        if text.is_empty() || text.len() > 60 {
            return None;
        }
        let parts: Vec<&str> = text
            .split(['·', '•', '|'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        let all_badges = !parts.is_empty() && parts.iter().all(|part| READ_TIME_RE.is_match(part));
        all_badges.then(|| Removal::Subtree(element.id()))
    }
}

/// Sponsor call-outs: marked wrappers, "Sponsored by ..." blocks, ad-network links.
pub struct SponsorRule;

impl BoilerplateRule for SponsorRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Sponsor
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        let markers = attr_markers(element);
        if ["sponsor", "advert", "ad-slot", "promoted"]
            .iter()
            .any(|m| markers.contains(m))
        {
            return Some(Removal::Subtree(element.id()));
        }

        if is_top_level(element) && matches!(element.value().name(), "div" | "section" | "aside" | "table") {
            let text = collapsed_text(element);
            if SPONSOR_LEAD_RE.is_match(&text) {
                return Some(Removal::Subtree(element.id()));
            }
        }

        if element.value().name() == "a" {
            let host = element.value().attr("href").and_then(link_host)?;
            if AD_DOMAINS.iter().any(|d| host_matches(&host, d)) {
                return Some(Removal::Subtree(enclosing_block(element, 4, 600)));
            }
        }
        None
    }
}

/// Zero-size or tracking-host images.
pub struct TrackingPixelRule;

impl BoilerplateRule for TrackingPixelRule {
    fn kind(&self) -> RuleKind {
        RuleKind::TrackingPixel
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        if element.value().name() != "img" {
            return None;
        }
        let tiny = |attr: &str| {
            element
                .value()
                .attr(attr)
                .map(|v| matches!(v.trim().trim_end_matches("px"), "0" | "1"))
                .unwrap_or(false)
        };
        if tiny("width") || tiny("height") {
            return Some(Removal::Subtree(element.id()));
        }
        let src = element.value().attr("src").unwrap_or_default();
        let Ok(url) = Url::parse(src) else {
            return None;
        };
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let path = url.path().to_ascii_lowercase();
        let tracked = TRACKING_HOST_MARKERS.iter().any(|m| host.contains(m))
            || TRACKING_PATH_MARKERS.iter().any(|m| path.contains(m));
        tracked.then(|| Removal::Subtree(element.id()))
    }
}

/// Content hidden from readers (`display:none`, `hidden`).
pub struct HiddenElementRule;

impl BoilerplateRule for HiddenElementRule {
    fn kind(&self) -> RuleKind {
        RuleKind::HiddenElement
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        let value = element.value();
        let hidden = value.attr("hidden").is_some()
            || value
                .attr("style")
                .is_some_and(|style| HIDDEN_STYLE_RE.is_match(style));
        hidden.then(|| Removal::Subtree(element.id()))
    }
}

/// Subscribe buttons, sign-up forms and CTA banners.
pub struct SubscribeCtaRule;

impl BoilerplateRule for SubscribeCtaRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SubscribeCta
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        let name = element.value().name();
        let markers = attr_markers(element);
        if markers.contains("subscribe") && !markers.contains("unsubscribe") {
            return Some(Removal::Subtree(element.id()));
        }
        match name {
            "form" => {
                let has_email = element
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .any(|el| el.value().name() == "input" && el.value().attr("type") == Some("email"));
                has_email.then(|| Removal::Subtree(element.id()))
            }
            "a" | "button" => {
                let text = collapsed_text(element);
                SUBSCRIBE_RE.is_match(&text).then(|| {
                    Removal::Subtree(enclosing_block(element, 3, SHORT_BLOCK_CHARS))
                })
            }
            "img" => {
                let src = element.value().attr("src").unwrap_or_default();
                CTA_IMAGE_RE
                    .is_match(strip_query(src))
                    .then(|| Removal::Subtree(media_wrapper(element)))
            }
            _ => None,
        }
    }
}

/// Share buttons, "read online" links and referral-program blocks.
pub struct ShareReferralRule;

impl BoilerplateRule for ShareReferralRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ShareReferral
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        let markers = attr_markers(element);
        if ["share-links", "social-share", "share-buttons", "referral"]
            .iter()
            .any(|m| markers.contains(m))
        {
            return Some(Removal::Subtree(element.id()));
        }

        // Referral template placeholders that were never filled in.
        if own_text(element).contains("{{rp_") {
            return Some(Removal::Subtree(enclosing_block(element, 5, usize::MAX)));
        }

        if matches!(element.value().name(), "a" | "button") {
            let text = collapsed_text(element);
            if SHARE_RE.is_match(&text) {
                return Some(Removal::Subtree(enclosing_block(element, 3, SHORT_BLOCK_CHARS)));
            }
        }
        None
    }
}

/// Unsubscribe links, postal addresses, social icon rows and the sign-off section.
pub struct FooterRule;

impl BoilerplateRule for FooterRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Footer
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        let name = element.value().name();
        let markers = attr_markers(element);
        if name == "footer"
            || name == "address"
            || ["footer", "social-links", "social-icons"]
                .iter()
                .any(|m| markers.contains(m))
        {
            return Some(Removal::Subtree(element.id()));
        }

        if name == "a" && FOOTER_LINK_RE.is_match(&collapsed_text(element)) {
            return Some(Removal::Subtree(enclosing_block(element, 3, SHORT_BLOCK_CHARS)));
        }

        if name == "img" {
            let src = element.value().attr("src").unwrap_or_default();
            if FOOTER_IMAGE_RE.is_match(strip_query(src)) {
                return Some(Removal::Subtree(media_wrapper(element)));
            }
        }

        // Sign-offs sit in nested blocks; a top-level paragraph asking the same is content.
        if !is_top_level(element) {
            let own = own_text(element);
            if own.len() <= SHORT_BLOCK_CHARS && SIGN_OFF_RE.is_match(&own) {
                return Some(Removal::FromHereOn(section_start(element)));
            }
        }

        if is_social_row(element) {
            return Some(Removal::Subtree(element.id()));
        }
        None
    }
}

/// Paragraphs and cells left with no text and no media.
pub struct EmptyBlockRule;

impl BoilerplateRule for EmptyBlockRule {
    fn kind(&self) -> RuleKind {
        RuleKind::EmptyBlock
    }

    fn removal_target(&self, element: ElementRef<'_>, _ctx: &CleanContext<'_>) -> Option<Removal> {
        if !matches!(element.value().name(), "p" | "td") {
            return None;
        }
        let empty = collapsed_text(element).is_empty() && !has_media(element);
        empty.then(|| Removal::Subtree(element.id()))
    }
}

/// Text of the subtree with whitespace runs (including non-breaking spaces) collapsed.
pub(crate) fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the element's direct text children only.
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| String::from(&**t)))
        .collect::<String>()
}

/// Lowercased `class` and `id` values, space separated.
fn attr_markers(element: ElementRef<'_>) -> String {
    let value = element.value();
    let mut markers = String::new();
    for attr in ["class", "id"] {
        if let Some(v) = value.attr(attr) {
            markers.push_str(&v.to_ascii_lowercase());
            markers.push(' ');
        }
    }
    markers
}

fn has_media(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| MEDIA_TAGS.contains(&el.value().name()))
}

fn is_block(element: ElementRef<'_>) -> bool {
    matches!(
        element.value().name(),
        "div" | "section" | "aside" | "table" | "tbody" | "tr" | "td" | "p" | "blockquote"
    )
}

/// The fragment's `<html>` wrapper: the only element whose parent is not an element
/// (a `Fragment` node for parsed fragments, a `Document` node for documents).
pub(crate) fn is_fragment_root(element: ElementRef<'_>) -> bool {
    element
        .parent()
        .map(|parent| !parent.value().is_element())
        .unwrap_or(true)
}

fn is_top_level(element: ElementRef<'_>) -> bool {
    element
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(is_fragment_root)
}

/// Outermost ancestor that `element` opens: climb while nothing but blank text
/// precedes the current node, stopping below the fragment root.
fn section_start(element: ElementRef<'_>) -> NodeId {
    let mut current = element;
    loop {
        let opens_parent = current.prev_siblings().all(|sibling| match sibling.value() {
            Node::Element(_) => false,
            Node::Text(text) => text.trim().is_empty(),
            _ => true,
        });
        if !opens_parent {
            break;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) if !is_fragment_root(parent) => current = parent,
            _ => break,
        }
    }
    current.id()
}

/// Climb from `element` into ancestors whose text stays within `max_chars`,
/// at most `max_levels` steps and never to the fragment root.
fn enclosing_block(element: ElementRef<'_>, max_levels: usize, max_chars: usize) -> NodeId {
    let mut current = element;
    for _ in 0..max_levels {
        let Some(parent) = current.parent().and_then(ElementRef::wrap) else {
            break;
        };
        if is_fragment_root(parent) || collapsed_text(parent).len() > max_chars {
            break;
        }
        current = parent;
    }
    current.id()
}

/// The image together with wrappers that hold nothing but it.
fn media_wrapper(image: ElementRef<'_>) -> NodeId {
    let mut current = image;
    while let Some(parent) = current.parent().and_then(ElementRef::wrap) {
        if is_fragment_root(parent) || !collapsed_text(parent).is_empty() {
            break;
        }
        let media_count = parent
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| MEDIA_TAGS.contains(&el.value().name()))
            .count();
        if media_count > 1 {
            break;
        }
        current = parent;
    }
    current.id()
}

fn is_first_image(image: ElementRef<'_>) -> bool {
    let Some(root) = image.ancestors().last() else {
        return false;
    };
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "img")
        .is_some_and(|first| first.id() == image.id())
}

fn same_image(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    a == b || strip_query(a) == strip_query(b)
}

fn strip_query(src: &str) -> &str {
    src.split(['?', '#']).next().unwrap_or(src)
}

fn link_host(href: &str) -> Option<String> {
    Url::parse(href.trim())
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// A short block made only of links to social networks.
fn is_social_row(element: ElementRef<'_>) -> bool {
    if !is_block(element) {
        return false;
    }
    let links: Vec<_> = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .collect();
    if links.len() < 2 || collapsed_text(element).len() > 80 {
        return false;
    }
    links.iter().all(|link| {
        link.value()
            .attr("href")
            .and_then(link_host)
            .is_some_and(|host| SOCIAL_DOMAINS.iter().any(|d| host_matches(&host, d)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_time_pattern_matches_badges_only() {
        assert!(READ_TIME_RE.is_match("5 min read"));
        assert!(READ_TIME_RE.is_match("12 minutes read"));
        assert!(!READ_TIME_RE.is_match("12 minutes"));
        assert!(READ_TIME_RE.is_match("1.2k views"));
        assert!(!READ_TIME_RE.is_match("5 minutes of fame changed my life"));
    }

    #[test]
    fn subscribe_pattern_ignores_unsubscribe() {
        assert!(SUBSCRIBE_RE.is_match("Subscribe now"));
        assert!(SUBSCRIBE_RE.is_match("Join 12,000 readers"));
        assert!(!SUBSCRIBE_RE.is_match("Unsubscribe"));
    }

    #[test]
    fn host_matching_respects_label_boundaries() {
        assert!(host_matches("ad.doubleclick.net", "doubleclick.net"));
        assert!(host_matches("x.com", "x.com"));
        assert!(!host_matches("box.com", "x.com"));
    }
}
