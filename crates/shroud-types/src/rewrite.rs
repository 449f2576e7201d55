use crate::{DEFAULT_IMAGE_PATH, DEFAULT_PROXY_PATH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of internal endpoint a rewritten reference is routed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteTarget {
    PageLink,
    Image,
    StylesheetResource,
}

impl fmt::Display for RewriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteTarget::PageLink => write!(f, "page-link"),
            RewriteTarget::Image => write!(f, "image"),
            RewriteTarget::StylesheetResource => write!(f, "stylesheet-resource"),
        }
    }
}

/// Path prefixes of the two endpoint families the generated markup points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub proxy_path: String,
    pub image_path: String,
}

impl Endpoints {
    pub fn new(proxy_path: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            proxy_path: proxy_path.into(),
            image_path: image_path.into(),
        }
    }

    pub fn prefix(&self, target: RewriteTarget) -> &str {
        match target {
            RewriteTarget::PageLink => &self.proxy_path,
            RewriteTarget::Image | RewriteTarget::StylesheetResource => &self.image_path,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_PATH, DEFAULT_IMAGE_PATH)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteReport {
    pub links: u32,
    pub images: u32,
    pub css_urls: u32,
    pub style_blocks: u32,
    pub stylesheets_inlined: u32,
    pub forms_disabled: u32,
    pub elements_removed: u32,
    pub skipped: u32,
}

impl RewriteReport {
    pub fn record(&mut self, target: RewriteTarget) {
        match target {
            RewriteTarget::PageLink => self.links += 1,
            RewriteTarget::Image => self.images += 1,
            RewriteTarget::StylesheetResource => self.css_urls += 1,
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn merge(&mut self, other: &RewriteReport) {
        self.links += other.links;
        self.images += other.images;
        self.css_urls += other.css_urls;
        self.style_blocks += other.style_blocks;
        self.stylesheets_inlined += other.stylesheets_inlined;
        self.forms_disabled += other.forms_disabled;
        self.elements_removed += other.elements_removed;
        self.skipped += other.skipped;
    }

    pub fn rewritten(&self) -> u32 {
        self.links + self.images + self.css_urls
    }
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "links={} images={} css_urls={} styles={} inlined={} forms={} removed={} skipped={}",
            self.links,
            self.images,
            self.css_urls,
            self.style_blocks,
            self.stylesheets_inlined,
            self.forms_disabled,
            self.elements_removed,
            self.skipped,
        )
    }
}
