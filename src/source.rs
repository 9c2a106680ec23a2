//! Finds the source documents of a project on disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// The directory that holds posts. It's the only `_`-prefixed directory
/// searched for documents.
pub const POSTS_DIRECTORY: &str = "_posts";

/// A source document: its name and raw contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    /// The path relative to the project root with `/` separators, e.g.
    /// `_posts/2022-01-01-x.md`.
    pub name: String,

    pub contents: String,
}

impl Source {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Source {
        Source {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Collects every Markdown file under `root`, ordered by name. Hidden
/// entries, `_`-prefixed directories other than [`POSTS_DIRECTORY`], the
/// directories in `skip`, and the source names in `exclude` are left out.
pub fn discover(root: &Path, skip: &[PathBuf], exclude: &[String]) -> Result<Vec<Source>> {
    // `root` and `skip` may mix relative and absolute forms, so compare
    // canonical paths. A skip directory that doesn't exist can't match.
    let root = fs::canonicalize(root).map_err(|source| Error::Read {
        path: root.to_owned(),
        source,
    })?;
    let skip: Vec<PathBuf> = skip
        .iter()
        .filter_map(|dir| fs::canonicalize(dir).ok())
        .collect();

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| keep(entry, &skip));

    let mut sources = Vec::new();
    for result in walker {
        let entry = result?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        // strip_prefix() shouldn't fail since `root` is always an ancestor
        // of the entries beneath it
        let relative = match entry.path().strip_prefix(&root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if exclude.iter().any(|excluded| *excluded == name) {
            debug!(source = %name, "excluded");
            continue;
        }

        let contents = fs::read_to_string(entry.path()).map_err(|source| Error::Read {
            path: entry.path().to_owned(),
            source,
        })?;
        sources.push(Source { name, contents });
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

fn keep(entry: &DirEntry, skip: &[PathBuf]) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return false;
    }
    if entry.file_type().is_dir() {
        if name.starts_with('_') && name != POSTS_DIRECTORY {
            return false;
        }
        if skip.iter().any(|dir| entry.path() == dir) {
            return false;
        }
    }
    true
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

/// The result of discovering sources.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an I/O problem while discovering sources.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for errors walking the project directory.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Returned when a source file can't be read (e.g. it isn't UTF-8).
    #[error("reading `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
