//! Conversions from the document model into [`gtmpl`] template values.
//!
//! Optional text (a page without a title, an undated document) is rendered as
//! the empty string so templates can test it with `{{if .title}}` and print it
//! unguarded. `prev` and `next` on listing pages are `nil` when absent.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use gtmpl::Value;

use crate::config::SiteConfig;
use crate::document::{Document, Kind};
use crate::frontmatter::{self, FrontMatter};
use crate::layout::Fields;
use crate::markdown;
use crate::tag::{Tag, TagIndex};

/// Tag key to the route of the tag's first listing page.
pub type TagRoutes = BTreeMap<String, String>;

fn object<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn date(date: Option<NaiveDate>) -> Value {
    match date {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => string(""),
    }
}

/// Converts an optional route into a value, `nil` when absent.
pub fn link(route: Option<&str>) -> Value {
    match route {
        Some(route) => string(route),
        None => Value::Nil,
    }
}

/// Converts a [`Tag`] into an object with fields `name`, `key`, and `url`.
pub fn tag(tag: &Tag, routes: &TagRoutes) -> Value {
    object([
        ("name", string(&tag.name)),
        ("key", string(&tag.key)),
        (
            "url",
            string(routes.get(&tag.key).map(String::as_str).unwrap_or_default()),
        ),
    ])
}

fn tags(document: &Document, routes: &TagRoutes) -> Value {
    Value::Array(document.tags.iter().map(|t| tag(t, routes)).collect())
}

fn front_matter_value(value: &frontmatter::Value) -> Value {
    match value {
        frontmatter::Value::Scalar(s) => string(s),
        frontmatter::Value::List(items) => Value::Array(items.iter().map(|s| string(s)).collect()),
    }
}

/// Converts extra front matter into a list of `{key, value}` objects ordered
/// by key. gtmpl ranges over objects in hash order, so anything a template
/// may range over has to be a list.
fn meta(front_matter: &FrontMatter) -> Value {
    Value::Array(
        front_matter
            .iter()
            .map(|(key, value)| object([("key", string(key)), ("value", front_matter_value(value))]))
            .collect(),
    )
}

// The same keys as an object, for direct lookups like `{{.extra.author}}`.
fn extra(front_matter: &FrontMatter) -> Value {
    Value::Object(
        front_matter
            .iter()
            .map(|(key, value)| (key.clone(), front_matter_value(value)))
            .collect(),
    )
}

/// Converts the site configuration and tag index into the `site` object
/// shared by every page: `title`, `url`, and `tags` (each with a `count`).
pub fn site(config: &SiteConfig, index: &TagIndex, routes: &TagRoutes) -> Value {
    let tags = index
        .iter()
        .map(|entry| {
            let mut value = tag(entry.tag, routes);
            if let Value::Object(fields) = &mut value {
                fields.insert(
                    "count".to_owned(),
                    Value::from(entry.documents.len() as u64),
                );
            }
            value
        })
        .collect();
    object([
        ("title", string(&config.title)),
        (
            "url",
            string(config.url.as_ref().map(|url| url.as_str()).unwrap_or_default()),
        ),
        ("tags", Value::Array(tags)),
    ])
}

/// Converts a document into the summary object used on listing pages:
/// `title`, `url`, `date`, `slug`, `tags`, `summary`, and `summarized`
/// (whether the summary is shorter than the body).
pub fn summary(document: &Document, route: &str, html: &str, routes: &TagRoutes) -> Value {
    let (summary, summarized) = markdown::summary(html);
    object([
        ("title", string(document.title.as_deref().unwrap_or_default())),
        ("url", string(route)),
        ("date", date(document.date)),
        ("slug", string(&document.slug)),
        ("tags", tags(document, routes)),
        ("summary", string(summary)),
        ("summarized", Value::Bool(summarized)),
    ])
}

/// Builds the fields a document's layout is rendered with. The rendered body
/// is available as both `body` and `content`.
pub fn document(
    document: &Document,
    route: &str,
    html: &str,
    routes: &TagRoutes,
    site: &Value,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        "title".to_owned(),
        string(document.title.as_deref().unwrap_or_default()),
    );
    fields.insert("tags".to_owned(), tags(document, routes));
    fields.insert("body".to_owned(), string(html));
    fields.insert("content".to_owned(), string(html));
    fields.insert("url".to_owned(), string(route));
    fields.insert("slug".to_owned(), string(&document.slug));
    fields.insert("date".to_owned(), date(document.date));
    fields.insert("layout".to_owned(), string(&document.layout));
    fields.insert(
        "kind".to_owned(),
        string(match document.kind {
            Kind::Post => "post",
            Kind::Page => "page",
        }),
    );
    fields.insert("meta".to_owned(), meta(&document.extra));
    fields.insert("extra".to_owned(), extra(&document.extra));
    fields.insert("site".to_owned(), site.clone());
    fields
}

/// One page of a paginated listing.
pub struct Listing<'a> {
    /// The tag name, or the site title for the main index.
    pub title: &'a str,

    /// The tag object for tag listings; `nil` for the main index.
    pub tag: Value,

    pub documents: Vec<Value>,
    pub route: &'a str,
    pub page: usize,
    pub total_pages: usize,
    pub prev: Option<&'a str>,
    pub next: Option<&'a str>,
}

/// Builds the fields a listing page's layout is rendered with.
pub fn listing(listing: Listing, site: &Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".to_owned(), string(listing.title));
    fields.insert("tag".to_owned(), listing.tag);
    fields.insert("documents".to_owned(), Value::Array(listing.documents));
    fields.insert("url".to_owned(), string(listing.route));
    fields.insert("page".to_owned(), Value::from(listing.page as u64));
    fields.insert(
        "total_pages".to_owned(),
        Value::from(listing.total_pages as u64),
    );
    fields.insert("prev".to_owned(), link(listing.prev));
    fields.insert("next".to_owned(), link(listing.next));
    fields.insert("body".to_owned(), string(""));
    fields.insert("content".to_owned(), string(""));
    fields.insert("site".to_owned(), site.clone());
    fields
}
