use ego_tree::NodeRef;
use newsletter_core::ImageManifest;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// How image references are written.
#[derive(Debug, Clone, Copy, Default)]
pub enum ImagePolicy<'a> {
    /// Keep the original (absolutized) URL.
    #[default]
    Remote,
    /// Use the local path recorded in the manifest, the original URL otherwise.
    Localized(&'a ImageManifest),
}

/// Converts cleaned post HTML into Markdown.
///
/// Headings, emphasis, nested lists, links, block quotes, code and images are
/// kept; layout-only wrappers such as tables and divs become plain paragraphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `html`, resolving relative references against `base_url`.
    pub fn render(&self, html: &str, base_url: Option<&str>, images: ImagePolicy<'_>) -> String {
        let fragment = Html::parse_fragment(html);
        let base_url = base_url.and_then(|b| Url::parse(b).ok());
        let mut ctx = ConversionContext::new(base_url.as_ref(), images, false);

        for child in fragment.root_element().children() {
            self.visit_node(child, &mut ctx);
        }

        ctx.into_markdown()
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, ctx: &mut ConversionContext<'_>) {
        match node.value() {
            Node::Text(text) => ctx.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, ctx);
                }
            }
            _ => {
                for child in node.children() {
                    self.visit_node(child, ctx);
                }
            }
        }
    }

    fn visit_element(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        let tag = element.value().name().to_ascii_lowercase();
        match tag.as_str() {
            "a" => self.handle_anchor(element, ctx),
            "img" => self.handle_image(element, ctx),
            "br" => ctx.hard_break(),
            "hr" => {
                ctx.block_break();
                ctx.push_str("---");
                ctx.block_break();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                let text = single_line(&self.render_inline(element, ctx));
                if !text.is_empty() {
                    ctx.block_break();
                    ctx.push_str(&format!("{} {text}", "#".repeat(level)));
                    ctx.block_break();
                }
            }
            "strong" | "b" => self.wrap_inline(element, ctx, "**"),
            "em" | "i" => self.wrap_inline(element, ctx, "*"),
            "s" | "del" | "strike" => self.wrap_inline(element, ctx, "~~"),
            "code" => self.handle_inline_code(element, ctx),
            "pre" => self.handle_preformatted(element, ctx),
            "ul" => self.handle_list(element, ctx, false),
            "ol" => self.handle_list(element, ctx, true),
            "li" => {
                let body = self.render_block(element, ctx, true);
                ctx.push_block(&indent_item("- ", &body));
            }
            "blockquote" => {
                let body = self.render_block(element, ctx, false);
                if !body.is_empty() {
                    let quoted: Vec<String> = body
                        .lines()
                        .map(|line| {
                            if line.is_empty() {
                                ">".to_string()
                            } else {
                                format!("> {line}")
                            }
                        })
                        .collect();
                    ctx.push_block(&quoted.join("\n"));
                }
            }
            "p" | "div" | "section" | "article" | "header" | "footer" | "nav" | "figure"
            | "figcaption" | "table" | "thead" | "tbody" | "tr" | "td" | "th" | "address"
            | "center" | "main" | "aside" => {
                ctx.block_break();
                self.visit_children(element, ctx);
                ctx.block_break();
            }
            "script" | "style" | "noscript" | "iframe" | "template" | "head" | "title" | "meta"
            | "link" | "button" | "form" | "input" | "svg" => {}
            _ => self.visit_children(element, ctx),
        }
    }

    fn visit_children(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        for child in element.children() {
            self.visit_node(child, ctx);
        }
    }

    /// Children rendered into a fresh buffer that shares `ctx`'s settings.
    fn render_block(&self, element: ElementRef<'_>, ctx: &ConversionContext<'_>, tight: bool) -> String {
        let mut inner = ctx.child(tight);
        self.visit_children(element, &mut inner);
        inner.into_markdown()
    }

    fn render_inline(&self, element: ElementRef<'_>, ctx: &ConversionContext<'_>) -> String {
        self.render_block(element, ctx, true)
    }

    fn wrap_inline(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>, marker: &str) {
        let text = self.render_inline(element, ctx);
        if text.is_empty() {
            return;
        }
        let (leading, trailing) = surrounding_space(element);
        if leading {
            ctx.append_text(" ");
        }
        ctx.push_str(&format!("{marker}{text}{marker}"));
        if trailing {
            ctx.append_text(" ");
        }
    }

    fn handle_anchor(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        let text = single_line(&self.render_inline(element, ctx));
        let href = element
            .value()
            .attr("href")
            .and_then(|raw| resolve_url(raw, ctx.base_url));
        let (leading, trailing) = surrounding_space(element);
        if leading {
            ctx.append_text(" ");
        }
        match href {
            Some(url) if !text.is_empty() => ctx.push_str(&format!("[{text}]({url})")),
            Some(url) if url.scheme() != "mailto" => ctx.push_str(&format!("<{url}>")),
            _ => ctx.push_str(&text),
        }
        if trailing {
            ctx.append_text(" ");
        }
    }

    fn handle_image(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        let Some(src) = element
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return;
        };
        let remote = resolve_url(src, ctx.base_url)
            .map(String::from)
            .unwrap_or_else(|| src.to_string());
        let target = match ctx.images {
            ImagePolicy::Localized(manifest) => manifest.get(&remote).unwrap_or(remote.as_str()),
            ImagePolicy::Remote => remote.as_str(),
        };
        let alt = element
            .value()
            .attr("alt")
            .map(|alt| alt.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
            .replace(['[', ']'], "");
        ctx.push_str(&format!("![{alt}]({target})"));
    }

    fn handle_inline_code(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        let text: String = element.text().collect();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let fence = if text.contains('`') { "``" } else { "`" };
        ctx.push_str(&format!("{fence}{text}{fence}"));
    }

    fn handle_preformatted(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>) {
        let text: String = element.text().collect();
        let text = text.trim_start_matches('\n').trim_end();
        if text.is_empty() {
            return;
        }
        let language = element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|el| el.value().attr("class"))
            .flat_map(str::split_whitespace)
            .find_map(|class| class.strip_prefix("language-"))
            .unwrap_or_default();
        ctx.push_block(&format!("```{language}\n{text}\n```"));
    }

    fn handle_list(&self, element: ElementRef<'_>, ctx: &mut ConversionContext<'_>, ordered: bool) {
        let mut number: u32 = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let mut items: Vec<String> = Vec::new();

        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "li" => {
                    let body = self.render_block(child, ctx, true);
                    let marker = if ordered {
                        format!("{number}. ")
                    } else {
                        "- ".to_string()
                    };
                    number += 1;
                    items.push(indent_item(&marker, &body));
                }
                // A list nested directly in a list belongs to the previous item.
                "ul" | "ol" => {
                    let mut inner = ctx.child(true);
                    self.visit_element(child, &mut inner);
                    let nested = indent_lines(&inner.into_markdown(), "  ");
                    match items.last_mut() {
                        Some(last) if !nested.is_empty() => {
                            last.push('\n');
                            last.push_str(&nested);
                        }
                        None if !nested.is_empty() => items.push(nested),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        if !items.is_empty() {
            ctx.push_block(&items.join("\n"));
        }
    }
}

/// Every distinct image URL in `html`, absolutized, in document order.
///
/// Only `http(s)` sources are returned; inline `data:` images stay inline.
pub fn collect_image_sources(html: &str, base_url: Option<&str>) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let base_url = base_url.and_then(|b| Url::parse(b).ok());
    let mut sources: Vec<String> = Vec::new();
    for element in fragment.root_element().descendants().filter_map(ElementRef::wrap) {
        if element.value().name() != "img" {
            continue;
        }
        let Some(url) = element
            .value()
            .attr("src")
            .and_then(|src| resolve_url(src, base_url.as_ref()))
        else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        let url = String::from(url);
        if !sources.contains(&url) {
            sources.push(url);
        }
    }
    sources
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with('?') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

/// Whether the element's raw text starts or ends with whitespace.
fn surrounding_space(element: ElementRef<'_>) -> (bool, bool) {
    let text: String = element.text().collect();
    (
        text.starts_with(char::is_whitespace),
        text.ends_with(char::is_whitespace),
    )
}

fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `marker` before the first line, continuation lines aligned under it.
fn indent_item(marker: &str, body: &str) -> String {
    if body.is_empty() {
        return marker.trim_end().to_string();
    }
    let padding = " ".repeat(marker.chars().count());
    let mut lines = body.lines();
    let mut out = format!("{marker}{}", lines.next().unwrap_or_default());
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&padding);
            out.push_str(line);
        }
    }
    out
}

fn indent_lines(body: &str, padding: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{padding}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct ConversionContext<'a> {
    builder: String,
    base_url: Option<&'a Url>,
    images: ImagePolicy<'a>,
    /// Blocks separated by a single newline instead of a blank line.
    tight: bool,
    last_char: Option<char>,
}

impl<'a> ConversionContext<'a> {
    fn new(base_url: Option<&'a Url>, images: ImagePolicy<'a>, tight: bool) -> Self {
        Self {
            builder: String::new(),
            base_url,
            images,
            tight,
            last_char: None,
        }
    }

    fn child(&self, tight: bool) -> Self {
        Self::new(self.base_url, self.images, tight)
    }

    fn into_markdown(self) -> String {
        self.builder.trim().to_string()
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last_char, None | Some(' ') | Some('\n')) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    fn push_block(&mut self, block: &str) {
        if block.is_empty() {
            return;
        }
        self.block_break();
        self.push_str(block);
        self.block_break();
    }

    fn hard_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.builder.is_empty() && self.last_char != Some('\n') {
            self.push_char('\n');
        }
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.builder.is_empty() {
            return;
        }
        let wanted = if self.tight { 1 } else { 2 };
        let present = self.builder.chars().rev().take_while(|c| *c == '\n').count();
        for _ in present..wanted {
            self.push_char('\n');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.builder.trim_end_matches(' ').len();
        self.builder.truncate(trimmed);
        self.last_char = self.builder.chars().last();
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }
}
