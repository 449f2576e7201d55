use crate::css::CssRewriter;
use crate::fetch::Fetch;
use crate::links::{resolve_reference, LinkBuilder, Resolution};
use futures::stream::{self, StreamExt};
use lol_html::html_content::{ContentType, Element};
use lol_html::{element, rewrite_str, text, HandlerResult, RewriteStrSettings};
use shroud_types::{RewriteReport, RewriteTarget, ShroudError, ShroudResult, DEFAULT_REMOVED_ELEMENTS};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone, Debug)]
pub struct SanitizeOptions {
    /// Tag names dropped from the document together with their content.
    pub removed_elements: Vec<String>,
    /// Drop `on*` attributes from every element.
    pub strip_event_handlers: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            removed_elements: DEFAULT_REMOVED_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            strip_event_handlers: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RewrittenPage {
    pub html: String,
    pub report: RewriteReport,
}

/// What a `<link rel=stylesheet>` turns into during the rewrite pass.
#[derive(Clone, Debug)]
enum Stylesheet {
    Inline { css: String, report: RewriteReport },
    Unavailable,
    Untouched,
}

/// Upper bound on stylesheet fetches in flight for one page.
const STYLESHEET_FETCH_CONCURRENCY: usize = 8;

fn has_rel_token(el: &Element, wanted: &str) -> bool {
    el.get_attribute("rel").map_or(false, |rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case(wanted))
    })
}

/// Active stylesheets only. Alternate sheets would apply unconditionally
/// once inlined.
fn is_stylesheet_link(el: &Element) -> bool {
    has_rel_token(el, "stylesheet") && !has_rel_token(el, "alternate")
}

fn is_alternate_stylesheet(el: &Element) -> bool {
    has_rel_token(el, "stylesheet") && has_rel_token(el, "alternate")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn inline_style_element(css: &str, media: Option<&str>) -> String {
    match media.map(str::trim).filter(|m| !m.is_empty()) {
        Some(media) => format!(
            "<style media=\"{}\">{}</style>",
            escape_attribute(media),
            escape_style_text(css)
        ),
        None => format!("<style>{}</style>", escape_style_text(css)),
    }
}

/// Splits a refresh `content` value into its delay and optional target,
/// e.g. `5; url='next.html'`.
fn parse_refresh(content: &str) -> (&str, Option<&str>) {
    let Some((delay, rest)) = content.split_once([';', ',']) else {
        return (content.trim(), None);
    };

    let rest = rest.trim_start();
    let target = match rest.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("url") => {
            let after = rest[3..].trim_start();
            after.strip_prefix('=').map(str::trim_start).unwrap_or(rest)
        }
        _ => rest,
    };
    let target = target
        .trim_matches(|c: char| c == '\'' || c == '"' || c.is_ascii_whitespace());

    (delay.trim(), Some(target).filter(|t| !t.is_empty()))
}

/// Keeps inlined CSS from closing the `<style>` element early.
fn escape_style_text(css: &str) -> String {
    let lower = css.to_ascii_lowercase();
    if !lower.contains("</style") {
        return css.to_string();
    }

    let mut out = String::with_capacity(css.len() + 8);
    let mut cursor = 0;
    for (idx, _) in lower.match_indices("</style") {
        out.push_str(&css[cursor..idx]);
        out.push_str("<\\/");
        cursor = idx + 2;
    }
    out.push_str(&css[cursor..]);
    out
}

fn collect_stylesheet_hrefs(html: &str) -> ShroudResult<Vec<String>> {
    let hrefs = RefCell::new(Vec::<String>::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("link[href]", |el| {
                if is_stylesheet_link(el) {
                    if let Some(href) = el.get_attribute("href") {
                        let mut hrefs = hrefs.borrow_mut();
                        if !hrefs.contains(&href) {
                            hrefs.push(href);
                        }
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ShroudError::Parse(e.to_string()))?;

    Ok(hrefs.into_inner())
}

/// Sanitizes a parsed document and routes every outbound reference through
/// the signed endpoints.
///
/// Runs in two phases. A read-only pass collects `<link rel=stylesheet>`
/// hrefs, the stylesheets are fetched with bounded concurrency, then one rewrite pass
/// applies every element rule with the fetched CSS already at hand.
pub struct DomRewriter {
    links: LinkBuilder,
    options: SanitizeOptions,
    fetcher: Arc<dyn Fetch>,
}

impl DomRewriter {
    pub fn new(links: LinkBuilder, options: SanitizeOptions, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            links,
            options,
            fetcher,
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub async fn process(&self, base: &Url, html: &str) -> ShroudResult<RewrittenPage> {
        let hrefs = collect_stylesheet_hrefs(html)?;
        let stylesheets = self.load_stylesheets(base, hrefs).await;
        self.rewrite(base, html, &stylesheets)
    }

    async fn load_stylesheets(&self, base: &Url, hrefs: Vec<String>) -> HashMap<String, Stylesheet> {
        if hrefs.is_empty() {
            return HashMap::new();
        }
        debug!("Inlining {} stylesheet(s) for {}", hrefs.len(), base);

        let pending: Vec<_> = hrefs.iter().map(|href| self.load_stylesheet(base, href)).collect();
        let loaded: Vec<Stylesheet> = stream::iter(pending)
            .buffered(STYLESHEET_FETCH_CONCURRENCY)
            .collect()
            .await;
        hrefs.into_iter().zip(loaded).collect()
    }

    async fn load_stylesheet(&self, base: &Url, href: &str) -> Stylesheet {
        let url = match resolve_reference(base, href) {
            Resolution::Rewrite(url) => url,
            Resolution::Untouched => return Stylesheet::Untouched,
            Resolution::Executable => return Stylesheet::Unavailable,
            Resolution::Failed(reason) => {
                warn!("Dropping stylesheet with unresolvable href: {}", reason);
                return Stylesheet::Unavailable;
            }
        };

        match self.fetcher.fetch(&url).await {
            Ok(fetched) => {
                let mut report = RewriteReport::default();
                // relative url() values in a linked sheet are relative to the sheet itself
                let css = CssRewriter::new(&self.links).rewrite_with_report(
                    &fetched.url,
                    &fetched.text(),
                    &mut report,
                );
                Stylesheet::Inline { css, report }
            }
            Err(e) => {
                warn!("Dropping stylesheet {}: {}", url, e);
                Stylesheet::Unavailable
            }
        }
    }

    fn rewrite_page_link(&self, el: &mut Element, base: &Url, report: &RefCell<RewriteReport>) -> HandlerResult {
        let Some(href) = el.get_attribute("href") else {
            return Ok(());
        };

        match resolve_reference(base, &href) {
            Resolution::Rewrite(url) => {
                el.set_attribute("href", &self.links.build(RewriteTarget::PageLink, &url))?;
                report.borrow_mut().record(RewriteTarget::PageLink);
            }
            Resolution::Executable => el.remove_attribute("href"),
            Resolution::Failed(reason) => {
                warn!("Leaving unresolvable href in place: {}", reason);
                report.borrow_mut().skip();
            }
            Resolution::Untouched => {}
        }
        Ok(())
    }

    /// A refresh pointing elsewhere is routed through the proxy; one pointing
    /// at something that cannot be proxied is dropped.
    fn rewrite_refresh(&self, el: &mut Element, base: &Url, report: &RefCell<RewriteReport>) -> HandlerResult {
        let is_refresh = el
            .get_attribute("http-equiv")
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            return Ok(());
        }

        let content = el.get_attribute("content").unwrap_or_default();
        let (delay, Some(target)) = parse_refresh(&content) else {
            return Ok(());
        };

        match resolve_reference(base, target) {
            Resolution::Rewrite(url) => {
                let link = self.links.build(RewriteTarget::PageLink, &url);
                el.set_attribute("content", &format!("{};url={}", delay, link))?;
                report.borrow_mut().record(RewriteTarget::PageLink);
            }
            Resolution::Untouched if target.starts_with('#') => {}
            Resolution::Failed(reason) => {
                warn!("Dropping refresh with unresolvable target: {}", reason);
                el.remove();
                report.borrow_mut().skip();
            }
            _ => {
                el.remove();
                report.borrow_mut().elements_removed += 1;
            }
        }
        Ok(())
    }

    fn rewrite_image_source(
        &self,
        el: &mut Element,
        attr: &str,
        base: &Url,
        report: &RefCell<RewriteReport>,
    ) -> HandlerResult {
        let Some(value) = el.get_attribute(attr) else {
            return Ok(());
        };

        let rewritten = if attr == "srcset" {
            self.rewrite_srcset(base, &value, &mut report.borrow_mut())
        } else {
            self.rewrite_image_url(base, &value, &mut report.borrow_mut())
        };

        if let Some(rewritten) = rewritten {
            el.set_attribute(attr, &rewritten)?;
        }
        Ok(())
    }

    fn rewrite_image_url(&self, base: &Url, value: &str, report: &mut RewriteReport) -> Option<String> {
        match resolve_reference(base, value) {
            Resolution::Rewrite(url) => {
                report.record(RewriteTarget::Image);
                Some(self.links.build(RewriteTarget::Image, &url))
            }
            Resolution::Failed(reason) => {
                warn!("Leaving unresolvable image source in place: {}", reason);
                report.skip();
                None
            }
            Resolution::Executable => Some(String::new()),
            Resolution::Untouched => None,
        }
    }

    /// Only the first candidate URL is rewritten; the remaining fields
    /// (descriptors and later candidates) are re-appended verbatim.
    fn rewrite_srcset(&self, base: &Url, value: &str, report: &mut RewriteReport) -> Option<String> {
        let mut fields = value.split_ascii_whitespace();
        let first = fields.next()?;
        let (candidate, separator) = match first.strip_suffix(',') {
            Some(stripped) => (stripped, ","),
            None => (first, ""),
        };

        let link = self.rewrite_image_url(base, candidate, report)?;
        let tail = fields.collect::<Vec<_>>().join(" ");

        Some(if tail.is_empty() {
            format!("{}{}", link, separator)
        } else {
            format!("{}{} {}", link, separator, tail)
        })
    }

    fn sanitize_element(
        &self,
        el: &mut Element,
        removed: &HashSet<String>,
        base: &Url,
        report: &RefCell<RewriteReport>,
    ) -> HandlerResult {
        if removed.contains(&el.tag_name().to_ascii_lowercase()) {
            el.remove();
            report.borrow_mut().elements_removed += 1;
            return Ok(());
        }

        if self.options.strip_event_handlers {
            let handlers: Vec<String> = el
                .attributes()
                .iter()
                .map(|attr| attr.name())
                .filter(|name| name.starts_with("on"))
                .collect();
            for name in handlers {
                el.remove_attribute(&name);
            }
        }

        if let Some(style) = el.get_attribute("style") {
            let mut report = report.borrow_mut();
            let rewritten = CssRewriter::new(&self.links).rewrite_with_report(base, &style, &mut report);
            if rewritten != style {
                el.set_attribute("style", &rewritten)?;
            }
        }
        Ok(())
    }

    fn rewrite(
        &self,
        base: &Url,
        html: &str,
        stylesheets: &HashMap<String, Stylesheet>,
    ) -> ShroudResult<RewrittenPage> {
        let report = RefCell::new(RewriteReport::default());
        let style_text = RefCell::new(String::new());
        let removed: HashSet<String> = self
            .options
            .removed_elements
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        let css = CssRewriter::new(&self.links);

        let html = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("*", |el| self.sanitize_element(el, &removed, base, &report)),
                    element!("form", |el| {
                        el.set_attribute("disabled", "disabled")?;
                        report.borrow_mut().forms_disabled += 1;
                        Ok(())
                    }),
                    element!("a[href]", |el| self.rewrite_page_link(el, base, &report)),
                    element!("img", |el| {
                        self.rewrite_image_source(el, "src", base, &report)?;
                        self.rewrite_image_source(el, "srcset", base, &report)
                    }),
                    element!("picture > source", |el| {
                        self.rewrite_image_source(el, "src", base, &report)?;
                        self.rewrite_image_source(el, "srcset", base, &report)
                    }),
                    element!("video", |el| {
                        self.rewrite_image_source(el, "src", base, &report)?;
                        self.rewrite_image_source(el, "poster", base, &report)
                    }),
                    element!("audio", |el| self.rewrite_image_source(el, "src", base, &report)),
                    element!("video > source", |el| self.rewrite_image_source(el, "src", base, &report)),
                    element!("audio > source", |el| self.rewrite_image_source(el, "src", base, &report)),
                    element!("track", |el| self.rewrite_image_source(el, "src", base, &report)),
                    element!("input[src]", |el| self.rewrite_image_source(el, "src", base, &report)),
                    element!("area[href]", |el| self.rewrite_page_link(el, base, &report)),
                    element!("meta[http-equiv]", |el| self.rewrite_refresh(el, base, &report)),
                    element!("link[href]", |el| {
                        if is_alternate_stylesheet(el) {
                            el.remove();
                            report.borrow_mut().elements_removed += 1;
                            return Ok(());
                        }
                        if !is_stylesheet_link(el) {
                            return self.rewrite_page_link(el, base, &report);
                        }
                        let href = el.get_attribute("href").unwrap_or_default();
                        match stylesheets.get(&href) {
                            Some(Stylesheet::Inline { css, report: sheet }) => {
                                let media = el.get_attribute("media");
                                el.replace(
                                    &inline_style_element(css, media.as_deref()),
                                    ContentType::Html,
                                );
                                let mut report = report.borrow_mut();
                                report.merge(sheet);
                                report.stylesheets_inlined += 1;
                            }
                            Some(Stylesheet::Unavailable) | None => {
                                el.remove();
                                report.borrow_mut().skip();
                            }
                            Some(Stylesheet::Untouched) => {}
                        }
                        Ok(())
                    }),
                    text!("style", |chunk| {
                        style_text.borrow_mut().push_str(chunk.as_str());
                        if chunk.last_in_text_node() {
                            let original = std::mem::take(&mut *style_text.borrow_mut());
                            let mut report = report.borrow_mut();
                            let rewritten = css.rewrite_with_report(base, &original, &mut report);
                            chunk.replace(&escape_style_text(&rewritten), ContentType::Html);
                            report.style_blocks += 1;
                        } else {
                            chunk.remove();
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| ShroudError::Parse(e.to_string()))?;

        Ok(RewrittenPage {
            html,
            report: report.into_inner(),
        })
    }
}
