//! Loads the project configuration from `jotter.yaml`. Every key is optional:
//!
//! ```yaml
//! title: Notes on Software
//! url: https://example.org/
//! author:
//!   name: A. Writer
//! permalink: /:year/:month/:day/:slug/
//! tag_layout: tag
//! index_layout: index
//! paginate: 10
//! feed: /feed.xml
//! exclude: [README.md]
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::route;

/// The name of the project file.
pub const PROJECT_FILE: &str = "jotter.yaml";

/// What the build does with a per-document failure.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Report the failure and keep building the other documents.
    #[default]
    Collect,

    /// Abort the build on the first failure.
    FailFast,
}

/// The site author, used in the feed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct PageSize(pub usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

/// The contents of `jotter.yaml`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// The site title, available to templates as `site.title`.
    pub title: String,

    /// The absolute URL the site is served from. Used for feed links.
    pub url: Option<Url>,

    pub author: Option<Author>,

    /// The route pattern for posts without an explicit permalink.
    pub permalink: String,

    /// The route pattern for pages without an explicit permalink.
    pub page_permalink: String,

    /// The route pattern for tag listing pages; `:tag` is the tag key.
    pub tag_permalink: String,

    /// The layout for tag listing pages.
    pub tag_layout: String,

    /// The layout for the main index pages. No index is generated without
    /// one.
    pub index_layout: Option<String>,

    pub index_permalink: String,

    /// The number of documents per listing page.
    pub paginate: PageSize,

    /// The route of the Atom feed. No feed is generated without one.
    pub feed: Option<String>,

    pub layouts_directory: PathBuf,
    pub static_directory: PathBuf,
    pub output_directory: PathBuf,

    /// Source names (relative to the project root) to leave out.
    pub exclude: Vec<String>,

    pub failure_policy: FailurePolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            title: String::new(),
            url: None,
            author: None,
            permalink: route::POST_PATTERN.to_owned(),
            page_permalink: route::PAGE_PATTERN.to_owned(),
            tag_permalink: route::TAG_PATTERN.to_owned(),
            tag_layout: "tag".to_owned(),
            index_layout: None,
            index_permalink: "/".to_owned(),
            paginate: PageSize::default(),
            feed: None,
            layouts_directory: PathBuf::from("_layouts"),
            static_directory: PathBuf::from("static"),
            output_directory: PathBuf::from("_site"),
            exclude: vec!["README.md".to_owned()],
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// A loaded project: its root directory and its configuration.
#[derive(Clone, Debug)]
pub struct Project {
    pub root: PathBuf,
    pub site: SiteConfig,
}

impl Project {
    /// Finds [`PROJECT_FILE`] in `dir` or the nearest ancestor of `dir` and
    /// loads it.
    pub fn find(dir: &Path) -> Result<Project> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Project::from_file(&path);
            }
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads the project whose configuration is at `path`. The project root
    /// is the file's directory.
    pub fn from_file(path: &Path) -> Result<Project> {
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        let site: SiteConfig =
            serde_yaml::from_reader(file).map_err(|source| Error::Parse {
                path: path.to_owned(),
                source,
            })?;
        let root = match path.parent() {
            Some(root) if root.as_os_str().is_empty() => PathBuf::from("."),
            Some(root) => root.to_owned(),
            None => PathBuf::from("."),
        };
        Project::new(root, site)
    }

    /// Validates `site` and pairs it with `root`.
    pub fn new(root: PathBuf, site: SiteConfig) -> Result<Project> {
        if site.paginate.0 == 0 {
            return Err(Error::Paginate);
        }
        Ok(Project { root, site })
    }

    pub fn layouts_directory(&self) -> PathBuf {
        self.root.join(&self.site.layouts_directory)
    }

    pub fn static_directory(&self) -> PathBuf {
        self.root.join(&self.site.static_directory)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.root.join(&self.site.output_directory)
    }
}

/// The result of loading a [`Project`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the project configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or its ancestors.
    #[error("could not find `jotter.yaml` in `{}` or any parent directory", .0.display())]
    NotFound(PathBuf),

    /// Returned when the project file can't be opened.
    #[error("opening project file `{}`: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Returned when the project file isn't valid.
    #[error("loading project file `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Returned when `paginate` is zero.
    #[error("`paginate` must be greater than zero")]
    Paginate,
}
