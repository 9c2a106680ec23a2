//! Defines the [`Document`] type, the in-memory model of one post or page, and
//! the logic deriving it from a source file name and its parsed front matter.

use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::frontmatter::{FrontMatter, Value};
use crate::tag::Tag;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = "YYYY-MM-DD".len();

/// Whether a document is a dated post or a stand-alone page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// A document whose file name follows the `YYYY-MM-DD-slug` convention.
    Post,

    /// Any other document, e.g. `about.md`.
    Page,
}

/// A post or page. Documents are built once per build and never mutated
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// The source path relative to the project root, with `/` separators
    /// (e.g. `_posts/2022-01-01-x.md`).
    pub source: String,

    pub kind: Kind,

    /// The name of the layout to render the document with.
    pub layout: String,

    /// Required for posts.
    pub title: Option<String>,

    /// The explicit output path, if any. May contain placeholders; see
    /// [`crate::route`].
    pub permalink: Option<String>,

    /// Distinct tags in the order they were declared.
    pub tags: Vec<Tag>,

    /// The publish date, from the `date` key or the file name.
    pub date: Option<NaiveDate>,

    pub slug: String,

    /// `false` for drafts, which are left out of the build.
    pub published: bool,

    /// Every front matter key not listed above, for templates.
    pub extra: FrontMatter,

    /// The raw Markdown body.
    pub body: String,
}

impl Document {
    /// Builds a document from its source path and the parsed
    /// `(front_matter, body)` pair. See [`crate::frontmatter::parse`].
    pub fn build(
        source: &str,
        mut front_matter: FrontMatter,
        body: &str,
    ) -> Result<Document> {
        let stem = Path::new(source)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidFileName(source.to_owned()))?;
        let (file_date, stem_slug) = split_date_prefix(stem);
        let kind = match file_date {
            Some(_) => Kind::Post,
            None => Kind::Page,
        };

        let layout =
            take_scalar(&mut front_matter, "layout")?.ok_or(Error::MissingLayout)?;
        let title = take_scalar(&mut front_matter, "title")?;
        if kind == Kind::Post && title.is_none() {
            return Err(Error::MissingTitle);
        }

        let date = match take_scalar(&mut front_matter, "date")? {
            Some(date) => Some(parse_date(&date)?),
            None => file_date,
        };

        let published = match take_scalar(&mut front_matter, "published")? {
            None => true,
            Some(published) => match published.as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(Error::InvalidPublished(published)),
            },
        };

        let slug = slug::slugify(stem_slug);
        if slug.is_empty() {
            return Err(Error::EmptySlug(source.to_owned()));
        }

        Ok(Document {
            source: source.to_owned(),
            kind,
            layout,
            title,
            permalink: take_scalar(&mut front_matter, "permalink")?,
            tags: front_matter
                .remove("tags")
                .map(|tags| Tag::parse_list(&tags))
                .unwrap_or_default(),
            date,
            slug,
            published,
            extra: front_matter,
            body: body.to_owned(),
        })
    }

    pub fn is_post(&self) -> bool {
        self.kind == Kind::Post
    }
}

// Removes `key` from the front matter. Blank values count as absent.
fn take_scalar(front_matter: &mut FrontMatter, key: &str) -> Result<Option<String>> {
    match front_matter.remove(key) {
        None => Ok(None),
        Some(Value::List(_)) => Err(Error::ExpectedScalar(key.to_owned())),
        Some(Value::Scalar(s)) => {
            let s = s.trim();
            Ok(match s.is_empty() {
                true => None,
                false => Some(s.to_owned()),
            })
        }
    }
}

// Splits `2022-01-01-hello` into the date and `hello`. Stems that don't
// follow the convention are returned whole.
fn split_date_prefix(stem: &str) -> (Option<NaiveDate>, &str) {
    let bytes = stem.as_bytes();
    let is_prefix = bytes.len() > DATE_LEN + 1
        && bytes[DATE_LEN] == b'-'
        && bytes[..DATE_LEN].iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if is_prefix {
        if let Ok(date) = NaiveDate::parse_from_str(&stem[..DATE_LEN], DATE_FORMAT) {
            return (Some(date), &stem[DATE_LEN + 1..]);
        }
    }
    (None, stem)
}

// Accepts `YYYY-MM-DD`, optionally followed by a time which is ignored.
fn parse_date(value: &str) -> Result<NaiveDate> {
    let invalid = || Error::InvalidDate(value.to_owned());
    let date = value.get(..DATE_LEN).ok_or_else(invalid)?;
    let rest = &value[DATE_LEN..];
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('T')) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid())
}

/// Represents the result of building a [`Document`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an invalid document: one whose front matter parsed but doesn't
/// describe a usable post or page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Returned when the source path has no usable file name.
    #[error("invalid file name `{0}`")]
    InvalidFileName(String),

    /// Returned when the front matter doesn't name a layout.
    #[error("missing required key `layout`")]
    MissingLayout,

    /// Returned when a post has no title.
    #[error("posts require a `title`")]
    MissingTitle,

    /// Returned when a key that takes a single value holds a list.
    #[error("`{0}` must be a single value, not a list")]
    ExpectedScalar(String),

    /// Returned when the `date` key isn't a `YYYY-MM-DD` date.
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Returned when `published` isn't a boolean.
    #[error("`published` must be `true` or `false`, found `{0}`")]
    InvalidPublished(String),

    /// Returned when no slug can be derived from the file name.
    #[error("cannot derive a slug from `{0}`")]
    EmptySlug(String),

    /// Returned when another document without a permalink already has the
    /// same slug.
    #[error("slug `{slug}` is already used by `{first}`; set a `permalink` on one of them")]
    DuplicateSlug { slug: String, first: String },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter;

    fn build(source: &str, input: &str) -> Result<Document> {
        let (front_matter, body) = frontmatter::parse(input).unwrap();
        Document::build(source, front_matter, body)
    }

    fn tag_names(document: &Document) -> Vec<&str> {
        document.tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_build_post() -> Result<()> {
        let document = build(
            "_posts/2022-01-01-x.md",
            "---\nlayout: post\ntitle: \"X\"\ntags: [Java, Logging]\n---\nHello\n",
        )?;

        assert_eq!(Kind::Post, document.kind);
        assert_eq!("post", document.layout);
        assert_eq!(Some("X".to_owned()), document.title);
        assert_eq!(None, document.permalink);
        assert_eq!(NaiveDate::from_ymd_opt(2022, 1, 1), document.date);
        assert_eq!("x", document.slug);
        assert_eq!(vec!["Java", "Logging"], tag_names(&document));
        assert!(document.published);
        assert!(document.extra.is_empty());
        assert_eq!("Hello\n", document.body);
        Ok(())
    }

    #[test]
    fn test_build_page_without_title() -> Result<()> {
        let document = build("about.md", "---\nlayout: page\npermalink: /about/\n---\n")?;
        assert_eq!(Kind::Page, document.kind);
        assert_eq!(None, document.title);
        assert_eq!(None, document.date);
        assert_eq!("about", document.slug);
        assert_eq!(Some("/about/".to_owned()), document.permalink);
        Ok(())
    }

    #[test]
    fn test_build_is_deterministic() -> Result<()> {
        let input = "---\nlayout: post\ntitle: Retries\ntags: Java, AWS\nsubtitle: backoff\n---\nbody";
        assert_eq!(
            build("2021-05-02-retries.md", input)?,
            build("2021-05-02-retries.md", input)?,
        );
        Ok(())
    }

    #[test]
    fn test_missing_layout() {
        assert_eq!(
            Err(Error::MissingLayout),
            build("2022-01-01-x.md", "---\ntitle: X\n---\n"),
        );
        assert_eq!(Err(Error::MissingLayout), build("notes.md", "no front matter"));
    }

    #[test]
    fn test_post_requires_title() {
        assert_eq!(
            Err(Error::MissingTitle),
            build("2022-01-01-x.md", "---\nlayout: post\ntitle: \"  \"\n---\n"),
        );
    }

    #[test]
    fn test_slug_from_odd_file_names() -> Result<()> {
        let document = build("2022-13-01-x.md", "---\nlayout: page\n---\n")?;
        assert_eq!(Kind::Page, document.kind);
        assert_eq!("2022-13-01-x", document.slug);

        let document = build("2022-01-01-.md", "---\nlayout: page\n---\n")?;
        assert_eq!(Kind::Page, document.kind);

        let document = build("Java Nullability.md", "---\nlayout: page\n---\n")?;
        assert_eq!("java-nullability", document.slug);
        Ok(())
    }

    #[test]
    fn test_explicit_date_overrides_file_name() -> Result<()> {
        let document = build(
            "2022-01-01-x.md",
            "---\nlayout: post\ntitle: X\ndate: 2022-02-03 10:00:00 +0100\n---\n",
        )?;
        assert_eq!(NaiveDate::from_ymd_opt(2022, 2, 3), document.date);
        assert_eq!(Kind::Post, document.kind);

        assert_eq!(
            Err(Error::InvalidDate("yesterday".to_owned())),
            build("about.md", "---\nlayout: page\ndate: yesterday\n---\n"),
        );
        Ok(())
    }

    #[test]
    fn test_drafts_and_extra_keys() -> Result<()> {
        let document = build(
            "draft.md",
            "---\nlayout: page\npublished: false\ndescription: wip\n---\n",
        )?;
        assert!(!document.published);
        assert_eq!(
            Some(&Value::Scalar("wip".to_owned())),
            document.extra.get("description"),
        );

        assert_eq!(
            Err(Error::InvalidPublished("maybe".to_owned())),
            build("draft.md", "---\nlayout: page\npublished: maybe\n---\n"),
        );
        Ok(())
    }

    #[test]
    fn test_scalar_keys_reject_lists() {
        assert_eq!(
            Err(Error::ExpectedScalar("layout".to_owned())),
            build("about.md", "---\nlayout: [a, b]\n---\n"),
        );
    }
}
