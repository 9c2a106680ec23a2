//! Resolves documents to the output paths ("routes") they are published at,
//! and guarantees that no two outputs claim the same file.
//!
//! Routes are built from permalink patterns. A pattern is an absolute path
//! whose `:name` segments are placeholders:
//!
//! * `:year`, `:month`, `:day`: the document's publish date
//! * `:slug` (or `:title`): the document's slug
//! * `:tag`: the tag key, for tag listing pages
//!
//! A route ending in `/` is written to `index.html` inside that directory.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::document::{Document, Kind};

/// The default pattern for posts.
pub const POST_PATTERN: &str = "/:year/:month/:day/:slug/";

/// The default pattern for pages.
pub const PAGE_PATTERN: &str = "/:slug/";

/// The default pattern for tag listing pages.
pub const TAG_PATTERN: &str = "/tags/:tag/";

/// Computes document routes from either their explicit permalink or the
/// pattern for their [`Kind`].
pub struct Resolver<'a> {
    post_pattern: &'a str,
    page_pattern: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(post_pattern: &'a str, page_pattern: &'a str) -> Resolver<'a> {
        Resolver {
            post_pattern,
            page_pattern,
        }
    }

    /// Returns the route for `document`.
    pub fn route(&self, document: &Document) -> Result<String> {
        let pattern = match (&document.permalink, document.kind) {
            (Some(permalink), _) => permalink.as_str(),
            (None, Kind::Post) => self.post_pattern,
            (None, Kind::Page) => self.page_pattern,
        };
        let date = document.date;
        let route = expand(pattern, |name| match name {
            "year" => date.map(|d| d.format("%Y").to_string()),
            "month" => date.map(|d| d.format("%m").to_string()),
            "day" => date.map(|d| d.format("%d").to_string()),
            "slug" | "title" => Some(document.slug.clone()),
            _ => None,
        })?;
        debug!(source = %document.source, %route, "resolved route");
        Ok(route)
    }
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Resolver::new(POST_PATTERN, PAGE_PATTERN)
    }
}

/// Expands the placeholders in `pattern` with `lookup` and validates the
/// result.
pub fn expand<F>(pattern: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !pattern.starts_with('/') {
        return Err(Error::Relative(pattern.to_owned()));
    }

    let mut route = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(i) = rest.find(|c: char| c == ':' || c == '{') {
        route.push_str(&rest[..i]);
        if rest[i..].starts_with('{') {
            return Err(Error::Unresolved {
                pattern: pattern.to_owned(),
                name: rest[i..].chars().take_while(|c| *c != '/').collect(),
            });
        }

        let after = &rest[i + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            // a lone colon isn't a placeholder
            route.push(':');
            rest = after;
            continue;
        }

        let name = &after[..len];
        match lookup(name) {
            Some(value) => route.push_str(&value),
            None => {
                return Err(Error::Unresolved {
                    pattern: pattern.to_owned(),
                    name: format!(":{}", name),
                })
            }
        }
        rest = &after[len..];
    }
    route.push_str(rest);

    if route
        .split('/')
        .any(|segment| segment == "." || segment == "..")
        || route.contains('\\')
    {
        return Err(Error::DotSegment(route));
    }
    Ok(route)
}

/// Maps a route to the file it is written to, relative to the output
/// directory. `/a/b/` and `/a/b` both map to `a/b/index.html`; a route whose
/// last segment has an extension (`/feed.xml`) maps to itself.
pub fn output_file(route: &str) -> String {
    let relative = route.trim_start_matches('/');
    let last = relative.rsplit('/').next().unwrap_or_default();
    if last.contains('.') {
        relative.to_owned()
    } else if relative.is_empty() || relative.ends_with('/') {
        format!("{}index.html", relative)
    } else {
        format!("{}/index.html", relative)
    }
}

/// Returns the route of page `number` (1-based) of a paginated listing whose
/// first page lives at `route`. Later pages live at `{route}page/{number}/`.
pub fn paginate(route: &str, number: usize) -> String {
    match number {
        0 | 1 => route.to_owned(),
        _ => match route.ends_with('/') {
            true => format!("{}page/{}/", route, number),
            false => format!("{}/page/{}/", route, number),
        },
    }
}

/// The set of resolved routes. Every route claims an output file, and
/// [`Routes::insert`] refuses a second claim on the same file.
#[derive(Debug, Default)]
pub struct Routes {
    by_file: BTreeMap<String, Entry>,
}

#[derive(Debug)]
struct Entry {
    route: String,
    owner: String,
}

impl Routes {
    /// Builds the route set from `(owner, route)` pairs, failing on the first
    /// collision.
    pub fn new<'p, I>(pairs: I) -> std::result::Result<Routes, Collision>
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let mut routes = Routes::default();
        for (owner, route) in pairs {
            routes.insert(owner, route)?;
        }
        Ok(routes)
    }

    /// Claims the output file for `route` on behalf of `owner` (a source name
    /// or a generated page label).
    pub fn insert(&mut self, owner: &str, route: &str) -> std::result::Result<(), Collision> {
        use std::collections::btree_map::Entry as MapEntry;
        match self.by_file.entry(output_file(route)) {
            MapEntry::Occupied(existing) => Err(Collision {
                route: route.to_owned(),
                first: existing.get().owner.clone(),
                second: owner.to_owned(),
            }),
            MapEntry::Vacant(slot) => {
                slot.insert(Entry {
                    route: route.to_owned(),
                    owner: owner.to_owned(),
                });
                Ok(())
            }
        }
    }

    /// Iterates over `(route, owner)` pairs ordered by output file.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_file
            .values()
            .map(|entry| (entry.route.as_str(), entry.owner.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

/// Two outputs resolved to the same file. This always aborts the build:
/// writing both would silently drop one of them.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("route `{route}` is claimed by both `{first}` and `{second}`")]
pub struct Collision {
    pub route: String,
    pub first: String,
    pub second: String,
}

/// Represents the result of expanding a permalink.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an unusable permalink.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Returned when the permalink doesn't start with `/`.
    #[error("permalink `{0}` must start with `/`")]
    Relative(String),

    /// Returned when a placeholder is unknown or has no value for the
    /// document (e.g. `:year` on an undated page).
    #[error("permalink `{pattern}` has an unresolved placeholder `{name}`")]
    Unresolved { pattern: String, name: String },

    /// Returned when the expanded route would escape its directory.
    #[error("route `{0}` must not contain `.` or `..` segments")]
    DotSegment(String),
}
