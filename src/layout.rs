//! The layout registry. A layout is a named [`gtmpl`] template; the name is
//! the template's file stem (`_layouts/post.html` is the `post` layout).
//!
//! A layout may extend another layout by declaring it in its own front
//! matter:
//!
//! ```html
//! ---
//! layout: base
//! ---
//! <article>{{ .content }}</article>
//! ```
//!
//! Rendering with `post` then renders `post` and hands its output to `base` as
//! `content`. Inheritance chains are checked when the registry is built, so an
//! unknown parent or a cycle fails the build before any document renders.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use gtmpl::{Template, Value};
use thiserror::Error;

use crate::frontmatter;

const TEMPLATE_EXTENSION: &str = "html";

/// The data a template is executed against.
pub type Fields = HashMap<String, Value>;

struct Layout {
    parent: Option<String>,
    template: Template,
}

/// The set of layouts available to a build, looked up by name.
#[derive(Default)]
pub struct Layouts {
    layouts: BTreeMap<String, Layout>,
}

impl Layouts {
    /// Loads every `*.html` file in `dir`. A missing directory yields an
    /// empty registry.
    pub fn load(dir: &Path) -> Result<Layouts> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Layouts::default())
            }
            Err(source) => {
                return Err(Error::Io {
                    path: dir.to_owned(),
                    source,
                })
            }
        };

        let mut sources = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| Error::Io {
                    path: dir.to_owned(),
                    source,
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str())
                != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let name = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(name) => name.to_owned(),
                None => continue,
            };
            let source =
                fs::read_to_string(&path).map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
            sources.push((name, source));
        }
        Layouts::from_sources(sources)
    }

    /// Builds a registry from `(name, template source)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Layouts>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut layouts = BTreeMap::new();
        for (name, source) in sources {
            let name = name.into();
            let (front_matter, body) = frontmatter::parse(source.as_ref())
                .map_err(|e| Error::FrontMatter(name.clone(), e))?;
            let parent = front_matter
                .get("layout")
                .and_then(|value| value.as_scalar())
                .map(str::trim)
                .filter(|parent| !parent.is_empty())
                .map(str::to_owned);

            let mut template = Template::default();
            template
                .parse(body)
                .map_err(|e| Error::Parse(name.clone(), e))?;
            layouts.insert(name, Layout { parent, template });
        }

        let layouts = Layouts { layouts };
        for name in layouts.layouts.keys() {
            layouts.check_chain(name)?;
        }
        Ok(layouts)
    }

    // Walks the inheritance chain starting at `name`.
    fn check_chain(&self, name: &str) -> Result<()> {
        let mut chain = vec![name.to_owned()];
        let mut current = name;
        while let Some(parent) = self
            .layouts
            .get(current)
            .and_then(|layout| layout.parent.as_deref())
        {
            if !self.layouts.contains_key(parent) {
                return Err(Error::UnknownParent {
                    layout: current.to_owned(),
                    parent: parent.to_owned(),
                });
            }
            let seen = chain.iter().any(|n| n == parent);
            chain.push(parent.to_owned());
            if seen {
                return Err(Error::Cycle(chain));
            }
            current = parent;
        }
        Ok(())
    }

    /// Checks that `name` is a registered layout.
    pub fn check(&self, name: &str) -> std::result::Result<(), RenderError> {
        self.get(name).map(|_| ())
    }

    fn get(&self, name: &str) -> std::result::Result<&Layout, RenderError> {
        self.layouts
            .get(name)
            .ok_or_else(|| RenderError::UnknownLayout(name.to_owned()))
    }

    /// Renders `fields` with the layout `name` and then with each of its
    /// ancestors. Every ancestor sees the previous output as both `content`
    /// and `body`.
    pub fn render(
        &self,
        name: &str,
        mut fields: Fields,
    ) -> std::result::Result<String, RenderError> {
        let mut name = name;
        let mut layout = self.get(name)?;
        loop {
            let output = execute(name, &layout.template, &fields)?;
            match &layout.parent {
                None => return Ok(output),
                Some(parent) => {
                    fields.insert("body".to_owned(), Value::String(output.clone()));
                    fields.insert("content".to_owned(), Value::String(output));
                    name = parent;
                    layout = self.get(parent)?;
                }
            }
        }
    }
}

fn execute(
    name: &str,
    template: &Template,
    fields: &Fields,
) -> std::result::Result<String, RenderError> {
    let template_error = |message: String| RenderError::Template {
        layout: name.to_owned(),
        message,
    };
    let context = gtmpl::Context::from(Value::Object(fields.clone()))
        .map_err(template_error)?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context).map_err(template_error)?;
    String::from_utf8(out).map_err(|e| template_error(e.to_string()))
}

/// The result of building a [`Layouts`] registry.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an unusable layout directory. These errors are fatal for the
/// whole build.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for I/O problems while reading layout files.
    #[error("reading `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Returned when a layout's front matter is malformed.
    #[error("layout `{0}`: {1}")]
    FrontMatter(String, #[source] frontmatter::Error),

    /// Returned when a layout isn't a valid template.
    #[error("layout `{0}`: {1}")]
    Parse(String, String),

    /// Returned when a layout extends a layout that doesn't exist.
    #[error("layout `{layout}` extends unknown layout `{parent}`")]
    UnknownParent { layout: String, parent: String },

    /// Returned when layouts extend each other in a cycle.
    #[error("layout cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Represents a failure to render one page. These are reported per page and
/// don't stop the build.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Returned when the requested layout isn't registered.
    #[error("unknown layout `{0}`")]
    UnknownLayout(String),

    /// Returned when template execution fails.
    #[error("layout `{layout}`: {message}")]
    Template { layout: String, message: String },
}
