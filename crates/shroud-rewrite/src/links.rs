use shroud_crypto::LinkSigner;
use shroud_types::{Endpoints, RewriteTarget, IMAGE_SIGNATURE_MARKER};
use url::{form_urlencoded, Url};

/// Outcome of resolving one raw attribute or CSS value against the page base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Absolute http(s) URL that must be routed through a signed endpoint.
    Rewrite(Url),
    /// Empty, `data:`, fragment-only or non-fetchable scheme. Emitted as is.
    Untouched,
    /// `javascript:` and friends.
    Executable,
    Failed(String),
}

pub fn is_data_uri(value: &str) -> bool {
    value
        .trim_start()
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("data:"))
}

pub fn resolve_reference(base: &Url, raw: &str) -> Resolution {
    let value = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    if value.is_empty() || value.starts_with('#') || is_data_uri(value) {
        return Resolution::Untouched;
    }

    match base.join(value) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Resolution::Rewrite(url),
            "javascript" | "vbscript" => Resolution::Executable,
            _ => Resolution::Untouched,
        },
        Err(e) => Resolution::Failed(format!("{}: {}", value, e)),
    }
}

/// Builds the signed internal paths embedded into rewritten markup.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
    signer: LinkSigner,
    endpoints: Endpoints,
}

impl LinkBuilder {
    pub fn new(signer: LinkSigner, endpoints: Endpoints) -> Self {
        Self { signer, endpoints }
    }

    pub fn signer(&self) -> &LinkSigner {
        &self.signer
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn build(&self, target: RewriteTarget, url: &Url) -> String {
        match target {
            RewriteTarget::PageLink => self.page_link(url),
            RewriteTarget::Image | RewriteTarget::StylesheetResource => {
                self.resource_link(target, url)
            }
        }
    }

    /// `/proxy?key=<token>&url=<absoluteURL>`
    pub fn page_link(&self, url: &Url) -> String {
        let token = self.signer.sign(url.as_str());
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("key", token.as_str())
            .append_pair("url", url.as_str())
            .finish();
        format!("{}?{}", self.endpoints.prefix(RewriteTarget::PageLink), query)
    }

    /// `/image/,s<token>/<absoluteURL>`
    ///
    /// The fragment never reaches the server, so the token covers the URL
    /// without it and the fragment is appended after the signed path.
    pub fn resource_link(&self, target: RewriteTarget, url: &Url) -> String {
        let mut signed = url.clone();
        signed.set_fragment(None);
        let token = self.signer.sign(signed.as_str());
        let link = format!(
            "{}{}{}/{}",
            self.endpoints.prefix(target),
            IMAGE_SIGNATURE_MARKER,
            token,
            signed
        );
        match url.fragment() {
            Some(fragment) => format!("{}#{}", link, fragment),
            None => link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_links;

    fn base() -> Url {
        Url::parse("https://ex.com/a/page.html").unwrap()
    }

    #[test]
    fn test_data_uri_detection() {
        assert!(is_data_uri("data:image/png;base64,AAAA"));
        assert!(is_data_uri("DATA:image/png;base64,AAAA"));
        assert!(is_data_uri("  data:text/plain,hi"));
        assert!(!is_data_uri("dat"));
        assert!(!is_data_uri("https://ex.com/data:x"));
        assert!(!is_data_uri("é"));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_reference(&base(), "foo/bar.png"),
            Resolution::Rewrite(Url::parse("https://ex.com/a/foo/bar.png").unwrap())
        );
        assert_eq!(
            resolve_reference(&base(), " /root.css "),
            Resolution::Rewrite(Url::parse("https://ex.com/root.css").unwrap())
        );
        assert_eq!(
            resolve_reference(&base(), "//cdn.ex.org/x.js"),
            Resolution::Rewrite(Url::parse("https://cdn.ex.org/x.js").unwrap())
        );
    }

    #[test]
    fn test_resolve_untouched() {
        assert_eq!(resolve_reference(&base(), ""), Resolution::Untouched);
        assert_eq!(resolve_reference(&base(), "#top"), Resolution::Untouched);
        assert_eq!(resolve_reference(&base(), "data:image/gif;base64,R0lG"), Resolution::Untouched);
        assert_eq!(resolve_reference(&base(), "mailto:me@ex.com"), Resolution::Untouched);
        assert_eq!(resolve_reference(&base(), "tel:+100"), Resolution::Untouched);
    }

    #[test]
    fn test_resolve_executable() {
        assert_eq!(resolve_reference(&base(), "javascript:alert(1)"), Resolution::Executable);
        assert_eq!(resolve_reference(&base(), "JavaScript:void(0)"), Resolution::Executable);
    }

    #[test]
    fn test_resolve_failure() {
        assert!(matches!(
            resolve_reference(&base(), "http://[::1"),
            Resolution::Failed(_)
        ));
    }

    #[test]
    fn test_page_link() {
        let links = test_links();
        let url = Url::parse("https://ex.com/a b?x=1&y=2").unwrap();
        let token = links.signer().sign(url.as_str());

        let link = links.build(RewriteTarget::PageLink, &url);
        let expected_url: String =
            form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
        assert_eq!(link, format!("/proxy?key={}&url={}", token, expected_url));
    }

    #[test]
    fn test_resource_link() {
        let links = test_links();
        let url = Url::parse("https://ex.com/a/foo/bar.png").unwrap();
        let token = links.signer().sign("https://ex.com/a/foo/bar.png");

        assert_eq!(
            links.build(RewriteTarget::Image, &url),
            format!("/image/,s{}/https://ex.com/a/foo/bar.png", token)
        );
        assert_eq!(
            links.build(RewriteTarget::StylesheetResource, &url),
            links.build(RewriteTarget::Image, &url)
        );
    }

    #[test]
    fn test_resource_link_fragment_outside_signature() {
        let links = test_links();
        let url = Url::parse("https://ex.com/icons.svg?v=2#arrow").unwrap();
        let token = links.signer().sign("https://ex.com/icons.svg?v=2");

        assert_eq!(
            links.build(RewriteTarget::Image, &url),
            format!("/image/,s{}/https://ex.com/icons.svg?v=2#arrow", token)
        );
    }

    #[test]
    fn test_custom_endpoints() {
        let links = LinkBuilder::new(
            test_links().signer().clone(),
            Endpoints::new("/p", "/img/"),
        );
        let url = Url::parse("https://ex.com/").unwrap();
        assert!(links.build(RewriteTarget::PageLink, &url).starts_with("/p?key="));
        assert!(links.build(RewriteTarget::Image, &url).starts_with("/img/,s"));
    }
}
