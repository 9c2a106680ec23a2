//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: discovering the sources
//! ([`crate::source`]), loading the layouts ([`crate::layout`]), assembling
//! the outputs ([`crate::site`]), and writing them along with the static
//! assets ([`crate::write`]).

use thiserror::Error;
use tracing::info;

use crate::config::Project;
use crate::layout::{self, Layouts};
use crate::site::{self, Build, Site};
use crate::source;
use crate::write::{self, Writer};

/// Whether [`build_site`] writes the result to disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Clean the output directory and write the site.
    Write,

    /// Assemble the site without touching the output directory.
    Check,
}

/// Builds the site for `project`. Per-document failures don't fail the
/// build; they're listed in the returned report, and under
/// [`Mode::Write`] the documents that did render are still written.
pub fn build_site(project: &Project, mode: Mode) -> Result<Build> {
    let output_directory = project.output_directory();
    let static_directory = project.static_directory();
    let layouts_directory = project.layouts_directory();

    let skip = [
        output_directory.clone(),
        static_directory.clone(),
        layouts_directory.clone(),
    ];
    let sources = source::discover(&project.root, &skip, &project.site.exclude)?;
    info!(sources = sources.len(), root = %project.root.display(), "discovered sources");

    let layouts = Layouts::load(&layouts_directory)?;
    let build = Site::new(&project.site, &layouts).assemble(&sources)?;

    if mode == Mode::Write {
        let writer = Writer::new(&output_directory);
        writer.clean(&project.root)?;
        writer.copy_static(&static_directory)?;
        writer.write_outputs(&build.outputs)?;
    }
    Ok(build)
}

/// The result of building a site.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Each variant is fatal: nothing is
/// written once one is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for errors discovering source documents.
    #[error(transparent)]
    Source(#[from] source::Error),

    /// Returned for errors loading the layouts.
    #[error(transparent)]
    Layout(#[from] layout::Error),

    /// Returned for fatal assembly errors, e.g. a route collision.
    #[error(transparent)]
    Site(#[from] site::Error),

    /// Returned for errors writing the site to disk.
    #[error(transparent)]
    Write(#[from] write::Error),
}
