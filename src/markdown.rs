//! Converts Markdown document bodies into HTML. Internal links (links from one
//! source document to another, e.g. `about.md` or
//! `../_posts/2022-01-01-x.md#usage`) are rewritten to the route the target
//! document is published at.

use std::collections::HashMap;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use tracing::warn;
use url::{ParseError, Url};

/// Separates a post's summary from the rest of its body.
pub const FOLD_TAG: &str = "<!-- more -->";

const MARKDOWN_EXTENSIONS: [&str; 2] = [".md", ".markdown"];

/// Resolves links between source documents. Source names and link targets
/// are normalized by joining them onto a synthetic root URL, so `./a.md`,
/// `b/../a.md`, and `/a.md` all refer to the source `a.md`.
pub struct Links {
    root: Url,
    routes: HashMap<String, String>,
}

impl Links {
    pub fn new() -> Result<Links, ParseError> {
        Ok(Links {
            root: Url::parse("file:///")?,
            routes: HashMap::new(),
        })
    }

    /// Registers the route for the source document `source`.
    pub fn insert(&mut self, source: &str, route: &str) -> Result<(), ParseError> {
        let path = self.root.join(source)?.path().to_owned();
        self.routes.insert(path, route.to_owned());
        Ok(())
    }

    /// Returns the route for a link to `dest` found in the document `from`, or
    /// `None` if `dest` doesn't point at a known source document.
    pub fn resolve(&self, from: &str, dest: &str) -> Option<String> {
        // fragments and absolute URLs (`https:`, `mailto:`) are left alone
        if dest.starts_with('#') || Url::parse(dest).is_ok() {
            return None;
        }
        let target = self.root.join(from).ok()?.join(dest).ok()?;
        let route = self.routes.get(target.path())?;
        Some(match target.fragment() {
            Some(fragment) => format!("{}#{}", route, fragment),
            None => route.clone(),
        })
    }
}

/// Converts `markdown`, the body of the document `source`, to HTML.
pub fn to_html(markdown: &str, source: &str, links: &Links) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter { source, links };
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(
        &mut out,
        Parser::new_ext(markdown, options).map(|ev| event_converter.convert(ev)),
    );
    out
}

/// Returns the part of `html` above the [`FOLD_TAG`] and whether the fold
/// was found. Without a fold the whole body is the summary.
pub fn summary(html: &str) -> (&str, bool) {
    match html.find(FOLD_TAG) {
        Some(i) => (&html[..i], true),
        None => (html, false),
    }
}

struct EventConverter<'a> {
    source: &'a str,
    links: &'a Links,
}

impl EventConverter<'_> {
    fn convert<'b>(&self, ev: Event<'b>) -> Event<'b> {
        match ev {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: self.convert_link(dest_url),
                title,
                id,
            }),
            _ => ev,
        }
    }

    fn convert_link<'b>(&self, dest: CowStr<'b>) -> CowStr<'b> {
        match self.links.resolve(self.source, &dest) {
            Some(route) => CowStr::from(route),
            None => {
                let path = dest.split(['#', '?']).next().unwrap_or_default();
                if MARKDOWN_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
                    && Url::parse(&dest).is_err()
                {
                    warn!(source = self.source, link = %dest, "link to unknown document");
                }
                dest
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn links() -> Links {
        let mut links = Links::new().unwrap();
        links.insert("about.md", "/about/").unwrap();
        links.insert("_posts/2022-01-01-x.md", "/2022/01/01/x/").unwrap();
        links
    }

    fn fixture(wanted: Option<&str>, from: &str, dest: &str) {
        assert_eq!(wanted.map(str::to_owned), links().resolve(from, dest));
    }

    #[test]
    fn test_resolve_relative_link() {
        fixture(Some("/about/"), "_posts/2022-01-01-x.md", "../about.md");
        fixture(Some("/about/"), "contact.md", "./about.md");
        fixture(Some("/2022/01/01/x/"), "about.md", "_posts/2022-01-01-x.md");
    }

    #[test]
    fn test_resolve_root_relative_link() {
        fixture(Some("/about/"), "_posts/2022-01-01-x.md", "/about.md");
    }

    #[test]
    fn test_resolve_keeps_fragment() {
        fixture(Some("/about/#contact"), "contact.md", "about.md#contact");
    }

    #[test]
    fn test_resolve_ignores_other_links() {
        fixture(None, "about.md", "https://example.org/about.md");
        fixture(None, "about.md", "#top");
        fixture(None, "about.md", "missing.md");
        fixture(None, "about.md", "mailto:someone@example.org");
        fixture(None, "about.md", "image.png");
    }

    #[test]
    fn test_to_html() {
        let html = to_html(
            "# Retries\n\nSee [about](../about.md) and [AWS](https://aws.amazon.com).\n\n![cold start](/img/cold.png)\n",
            "_posts/2022-01-01-x.md",
            &links(),
        );
        assert!(html.contains("<h1>Retries</h1>"));
        assert!(html.contains(r#"<a href="/about/">about</a>"#));
        assert!(html.contains(r#"<a href="https://aws.amazon.com">AWS</a>"#));
        assert!(html.contains(r#"<img src="/img/cold.png" alt="cold start" />"#));
    }

    #[test]
    fn test_to_html_passes_inline_html() {
        let html = to_html("<div class=\"note\">hi</div>\n", "a.md", &links());
        assert_eq!("<div class=\"note\">hi</div>\n", html);
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            ("<p>intro</p>\n", true),
            summary("<p>intro</p>\n<!-- more -->\n<p>rest</p>\n")
        );
        assert_eq!(("<p>all</p>\n", false), summary("<p>all</p>\n"));
    }
}
