//! Exports [`Site`], which stitches together the steps that turn a set of
//! source documents into a set of rendered outputs:
//!
//! 1. Parsing front matter and building [`Document`]s
//! 2. Resolving routes, which fails the whole build on a collision
//! 3. Converting Markdown bodies to HTML
//! 4. Indexing documents by tag and applying layouts to documents
//! 5. Rendering tag listings, the main index, and the feed
//!
//! Steps 2 and 4 need the complete document set, so every document finishes
//! the preceding steps before they run. Only documents that rendered are
//! listed in step 5. Per-document failures are collected
//! into a [`Report`] (or abort the build under
//! [`FailurePolicy::FailFast`]); a route collision always aborts.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{FailurePolicy, SiteConfig};
use crate::document::{self, Document};
use crate::feed::{self, FeedConfig, FeedEntry};
use crate::frontmatter;
use crate::layout::{Fields, Layouts, RenderError};
use crate::markdown::{self, Links};
use crate::route::{self, Collision, Resolver, Routes};
use crate::source::Source;
use crate::tag::{newest_first, TagIndex};
use crate::value::{self, Listing, TagRoutes};

/// Builds the outputs of a site from its configuration and layouts.
pub struct Site<'a> {
    config: &'a SiteConfig,
    layouts: &'a Layouts,
}

/// One rendered output file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    /// The public path, e.g. `/2022/01/01/x/`.
    pub route: String,

    /// The file the route is written to, relative to the output directory.
    pub file: String,

    /// The source document, or a label for generated pages.
    pub owner: String,

    pub markup: String,
}

impl Output {
    fn new(owner: &str, route: &str, markup: String) -> Output {
        Output {
            route: route.to_owned(),
            file: route::output_file(route),
            owner: owner.to_owned(),
            markup,
        }
    }
}

/// The result of a successful (possibly partial) build.
#[derive(Debug)]
pub struct Build {
    /// Every output, ordered by file.
    pub outputs: Vec<Output>,
    pub report: Report,
}

/// Summarizes a build: every failure and every generated route.
#[derive(Debug, Default)]
pub struct Report {
    pub failures: Vec<Failure>,

    /// Sources skipped because they are marked `published: false`.
    pub drafts: Vec<String>,

    /// `(route, owner)` for every output, ordered by file.
    pub routes: Vec<(String, String)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.failures.is_empty() {
            writeln!(f, "{} failed:", plural(self.failures.len(), "document"))?;
            for failure in &self.failures {
                writeln!(f, "  {}", failure)?;
            }
        }
        if !self.drafts.is_empty() {
            writeln!(f, "skipped {}:", plural(self.drafts.len(), "draft"))?;
            for draft in &self.drafts {
                writeln!(f, "  {}", draft)?;
            }
        }
        writeln!(f, "generated {}:", plural(self.routes.len(), "route"))?;
        for (route, owner) in &self.routes {
            writeln!(f, "  {} <- {}", route, owner)?;
        }
        Ok(())
    }
}

fn plural(n: usize, noun: &str) -> String {
    match n {
        1 => format!("1 {}", noun),
        _ => format!("{} {}s", n, noun),
    }
}

/// A document or listing page that couldn't be rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub source: String,
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    fn new(source: &str, kind: FailureKind, err: impl fmt::Display) -> Failure {
        Failure {
            source: source.to_owned(),
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.kind, self.message)
    }
}

/// The kinds of per-document failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    MalformedFrontMatter,
    InvalidDocument,
    UnknownLayout,
    Template,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            FailureKind::MalformedFrontMatter => "malformed front matter",
            FailureKind::InvalidDocument => "invalid document",
            FailureKind::UnknownLayout => "unknown layout",
            FailureKind::Template => "template",
        })
    }
}

impl From<&RenderError> for FailureKind {
    fn from(err: &RenderError) -> FailureKind {
        match err {
            RenderError::UnknownLayout(_) => FailureKind::UnknownLayout,
            RenderError::Template { .. } => FailureKind::Template,
        }
    }
}

// A routed document with its Markdown body converted to HTML.
struct Rendered<'d> {
    document: &'d Document,
    route: String,
    html: String,
}

impl<'a> Site<'a> {
    pub fn new(config: &'a SiteConfig, layouts: &'a Layouts) -> Site<'a> {
        Site { config, layouts }
    }

    /// Builds every output for `sources`. Sources are processed in
    /// lexicographic order of their names regardless of the order given.
    pub fn assemble(&self, sources: &[Source]) -> Result<Build> {
        let mut report = Report::default();
        let mut sources: Vec<&Source> = sources.iter().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));

        let documents = self.documents(&sources, &mut report)?;
        let mut routes = Routes::default();
        let routed = self.route(&documents, &mut routes, &mut report)?;
        let rendered = self.bodies(routed, &mut report)?;

        // Listings and the site's tag list only link to documents that
        // produced an output. Dropping a document whose layout failed changes
        // what the others see, so render again until every one succeeds.
        let mut live: Vec<&Rendered> = rendered.iter().collect();
        let (index, tag_routes, site, mut outputs) = loop {
            let index = TagIndex::build(live.iter().map(|r| r.document));
            let tag_routes = self.tag_routes(&index)?;
            let site = value::site(self.config, &index, &tag_routes);

            let mut outputs = Vec::with_capacity(live.len() + index.len());
            let mut failures = Vec::new();
            for r in &live {
                let fields = value::document(r.document, &r.route, &r.html, &tag_routes, &site);
                match self.layouts.render(&r.document.layout, fields) {
                    Ok(markup) => outputs.push(Output::new(&r.document.source, &r.route, markup)),
                    Err(err) => failures.push(Failure::new(
                        &r.document.source,
                        FailureKind::from(&err),
                        err,
                    )),
                }
            }
            if failures.is_empty() {
                break (index, tag_routes, site, outputs);
            }
            live.retain(|r| !failures.iter().any(|f| f.source == r.document.source));
            for failure in failures {
                self.fail(&mut report, failure)?;
            }
        };

        let by_source: HashMap<&str, &Rendered> = live
            .iter()
            .map(|r| (r.document.source.as_str(), *r))
            .collect();

        for entry in index.iter() {
            let members: Vec<&Rendered> = entry
                .documents
                .iter()
                .filter_map(|d| by_source.get(d.source.as_str()).copied())
                .collect();
            let first_route = &tag_routes[&entry.tag.key];
            let pages = self.listing_pages(
                &format!("tag `{}`", entry.tag.key),
                &entry.tag.name,
                value::tag(entry.tag, &tag_routes),
                first_route,
                &members,
                &self.config.tag_layout,
                &tag_routes,
                &site,
                &mut routes,
                &mut report,
            )?;
            outputs.extend(pages);
        }

        // `live` is in discovery order, which newest_first keeps for ties
        let mut posts: Vec<&Rendered> = live.iter().copied().filter(|r| r.document.is_post()).collect();
        posts.sort_by(|a, b| newest_first(a.document, b.document));

        if let Some(layout) = &self.config.index_layout {
            let first_route = self.pattern("index_permalink", &self.config.index_permalink)?;
            let pages = self.listing_pages(
                "index",
                &self.config.title,
                gtmpl::Value::Nil,
                &first_route,
                &posts,
                layout,
                &tag_routes,
                &site,
                &mut routes,
                &mut report,
            )?;
            outputs.extend(pages);
        }

        if let Some(feed_route) = &self.config.feed {
            let feed_route = self.pattern("feed", feed_route)?;
            routes.insert("feed", &feed_route)?;
            outputs.push(Output::new("feed", &feed_route, self.feed(&feed_route, &posts)?));
        }

        outputs.sort_by(|a, b| a.file.cmp(&b.file));
        report.routes = outputs
            .iter()
            .map(|output| (output.route.clone(), output.owner.clone()))
            .collect();
        info!(
            outputs = outputs.len(),
            failures = report.failures.len(),
            tags = index.len(),
            "assembled site"
        );
        Ok(Build { outputs, report })
    }

    // Parses and builds every source, skipping drafts.
    fn documents(&self, sources: &[&Source], report: &mut Report) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(sources.len());
        for source in sources {
            let (front_matter, body) = match frontmatter::parse(&source.contents) {
                Ok(parsed) => parsed,
                Err(err) => {
                    self.fail(
                        report,
                        Failure::new(&source.name, FailureKind::MalformedFrontMatter, err),
                    )?;
                    continue;
                }
            };
            match Document::build(&source.name, front_matter, body) {
                Ok(document) if !document.published => {
                    debug!(source = %source.name, "skipping draft");
                    report.drafts.push(source.name.clone());
                }
                Ok(document) => documents.push(document),
                Err(err) => self.fail(report, invalid(&source.name, err))?,
            }
        }
        Ok(documents)
    }

    // Resolves every document's route and claims it in `routes`. Slugs must
    // be distinct among documents without an explicit permalink; the first
    // in source order keeps the slug.
    fn route<'d>(
        &self,
        documents: &'d [Document],
        routes: &mut Routes,
        report: &mut Report,
    ) -> Result<Vec<(&'d Document, String)>> {
        let resolver = Resolver::new(&self.config.permalink, &self.config.page_permalink);
        let mut slugs: HashMap<&str, &str> = HashMap::new();
        let mut routed = Vec::with_capacity(documents.len());
        for document in documents {
            if document.permalink.is_none() {
                match slugs.entry(&document.slug) {
                    Entry::Occupied(first) => {
                        let err = document::Error::DuplicateSlug {
                            slug: document.slug.clone(),
                            first: (*first.get()).to_owned(),
                        };
                        self.fail(report, invalid(&document.source, err))?;
                        continue;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(&document.source);
                    }
                }
            }
            match resolver.route(document) {
                Ok(route) => {
                    routes.insert(&document.source, &route)?;
                    routed.push((document, route));
                }
                Err(err) => self.fail(
                    report,
                    Failure::new(&document.source, FailureKind::InvalidDocument, err),
                )?,
            }
        }
        Ok(routed)
    }

    // Converts bodies to HTML, dropping documents whose layout is unknown.
    fn bodies<'d>(
        &self,
        routed: Vec<(&'d Document, String)>,
        report: &mut Report,
    ) -> Result<Vec<Rendered<'d>>> {
        let mut links = Links::new()?;
        for (document, route) in &routed {
            links.insert(&document.source, route)?;
        }

        let mut rendered = Vec::with_capacity(routed.len());
        for (document, route) in routed {
            if let Err(err) = self.layouts.check(&document.layout) {
                self.fail(
                    report,
                    Failure::new(&document.source, FailureKind::from(&err), err),
                )?;
                continue;
            }
            let html = markdown::to_html(&document.body, &document.source, &links);
            rendered.push(Rendered {
                document,
                route,
                html,
            });
        }
        Ok(rendered)
    }

    fn tag_routes(&self, index: &TagIndex) -> Result<TagRoutes> {
        let mut routes = TagRoutes::new();
        for entry in index.iter() {
            let key = &entry.tag.key;
            let route = route::expand(&self.config.tag_permalink, |name| match name {
                "tag" => Some(key.clone()),
                _ => None,
            })
            .map_err(|source| Error::Pattern {
                name: "tag_permalink",
                source,
            })?;
            routes.insert(key.clone(), route);
        }
        Ok(routes)
    }

    // Validates a placeholder-free route pattern from the configuration.
    fn pattern(&self, name: &'static str, pattern: &str) -> Result<String> {
        route::expand(pattern, |_| None).map_err(|source| Error::Pattern { name, source })
    }

    /// Renders the paginated listing of `documents` whose first page lives at
    /// `first_route`. An empty listing still gets one (empty) page.
    #[allow(clippy::too_many_arguments)]
    fn listing_pages(
        &self,
        owner: &str,
        title: &str,
        tag: gtmpl::Value,
        first_route: &str,
        documents: &[&Rendered],
        layout: &str,
        tag_routes: &TagRoutes,
        site: &gtmpl::Value,
        routes: &mut Routes,
        report: &mut Report,
    ) -> Result<Vec<Output>> {
        let page_size = self.config.paginate.0.max(1);
        let total_pages = documents.len().div_ceil(page_size).max(1);
        let page_routes: Vec<String> = (1..=total_pages)
            .map(|n| route::paginate(first_route, n))
            .collect();

        let mut outputs = Vec::with_capacity(total_pages);
        for (i, page_route) in page_routes.iter().enumerate() {
            let owner = match i {
                0 => owner.to_owned(),
                _ => format!("{} page {}", owner, i + 1),
            };
            routes.insert(&owner, page_route)?;

            let chunk = documents.iter().skip(i * page_size).take(page_size);
            let fields: Fields = value::listing(
                Listing {
                    title,
                    tag: tag.clone(),
                    documents: chunk
                        .map(|r| value::summary(r.document, &r.route, &r.html, tag_routes))
                        .collect(),
                    route: page_route,
                    page: i + 1,
                    total_pages,
                    prev: i.checked_sub(1).map(|p| page_routes[p].as_str()),
                    next: page_routes.get(i + 1).map(String::as_str),
                },
                site,
            );
            match self.layouts.render(layout, fields) {
                Ok(markup) => outputs.push(Output::new(&owner, page_route, markup)),
                Err(err) => self.fail(report, Failure::new(&owner, FailureKind::from(&err), err))?,
            }
        }
        Ok(outputs)
    }

    fn feed(&self, feed_route: &str, posts: &[&Rendered]) -> Result<String> {
        let absolute = |route: &str| -> Result<String> {
            Ok(match &self.config.url {
                Some(base) => base.join(route.trim_start_matches('/'))?.to_string(),
                None => route.to_owned(),
            })
        };

        let entries = posts
            .iter()
            .filter_map(|r| {
                let date = r.document.date?;
                Some((r, date))
            })
            .map(|(r, date)| -> Result<FeedEntry> {
                Ok(FeedEntry {
                    title: r.document.title.as_deref().unwrap_or_default(),
                    url: absolute(&r.route)?,
                    date,
                    summary: markdown::summary(&r.html).0,
                })
            })
            .collect::<Result<Vec<FeedEntry>>>()?;

        let home_page = absolute("/")?;
        let config = FeedConfig {
            title: &self.config.title,
            id: home_page.clone(),
            author: self.config.author.as_ref(),
            home_page,
            self_url: absolute(feed_route)?,
        };
        Ok(feed::render(&config, &entries)?)
    }

    fn fail(&self, report: &mut Report, failure: Failure) -> Result<()> {
        warn!(source = %failure.source, kind = %failure.kind, "{}", failure.message);
        match self.config.failure_policy {
            FailurePolicy::Collect => {
                report.failures.push(failure);
                Ok(())
            }
            FailurePolicy::FailFast => Err(Error::Aborted(failure)),
        }
    }
}

fn invalid(source: &str, err: document::Error) -> Failure {
    Failure::new(source, FailureKind::InvalidDocument, err)
}

/// The result of assembling a site.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure of the whole build.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when two outputs resolve to the same file.
    #[error(transparent)]
    RouteCollision(#[from] Collision),

    /// Returned for the first per-document failure under
    /// [`FailurePolicy::FailFast`].
    #[error("{0}")]
    Aborted(Failure),

    /// Returned when a route pattern in the configuration is invalid.
    #[error("invalid `{name}`: {source}")]
    Pattern {
        name: &'static str,
        source: route::Error,
    },

    /// Returned when the feed can't be written.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned when a URL can't be built from the site URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
