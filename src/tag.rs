//! Defines the [`Tag`] type, which represents a [`Document`] tag, and the
//! [`TagIndex`], which groups documents by tag for the tag listing pages.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::document::Document;
use crate::frontmatter::Value;

/// Represents a [`Document`] tag. Tags are identified by their `key` so e.g.,
/// `macOS` and `MacOS` resolve to the same tag; the `name` is kept for
/// display.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as it was written in the front matter.
    pub name: String,

    /// The slugified name. This can be dropped into a URL.
    pub key: String,
}

impl Tag {
    /// Creates a tag from its display name. Returns `None` if the name has no
    /// URL-safe representation (e.g., it's blank).
    pub fn new(name: &str) -> Option<Tag> {
        let name = name.trim();
        let key = slug::slugify(name);
        match key.is_empty() {
            true => None,
            false => Some(Tag {
                name: name.to_owned(),
                key,
            }),
        }
    }

    /// Normalizes a `tags` front matter value, which may be a list or a
    /// comma-separated string, into an ordered list of distinct tags. The
    /// first spelling of a tag wins.
    pub fn parse_list(value: &Value) -> Vec<Tag> {
        let names: Vec<&str> = match value {
            Value::List(items) => items.iter().map(String::as_str).collect(),
            Value::Scalar(s) => s.split(',').collect(),
        };

        let mut tags: Vec<Tag> = Vec::with_capacity(names.len());
        for tag in names.into_iter().filter_map(Tag::new) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `key` field.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for Tag {}

/// All documents carrying one tag.
#[derive(Debug)]
pub struct TagEntry<'a> {
    /// The first spelling of the tag met in discovery order.
    pub tag: &'a Tag,

    /// Newest first; see [`newest_first`].
    pub documents: Vec<&'a Document>,
}

/// Maps every tag key to the documents that carry it. Built once per build
/// from the complete document set and read-only afterwards.
#[derive(Debug, Default)]
pub struct TagIndex<'a> {
    entries: BTreeMap<String, TagEntry<'a>>,
}

impl<'a> TagIndex<'a> {
    /// Indexes `documents`, which must be given in discovery order.
    pub fn build<I>(documents: I) -> TagIndex<'a>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut entries: BTreeMap<String, TagEntry<'a>> = BTreeMap::new();
        for document in documents {
            for tag in document.tags.iter() {
                entries
                    .entry(tag.key.clone())
                    .or_insert_with(|| TagEntry {
                        tag,
                        documents: Vec::new(),
                    })
                    .documents
                    .push(document);
            }
        }

        for entry in entries.values_mut() {
            entry.documents.sort_by(|a, b| newest_first(a, b));
        }
        TagIndex { entries }
    }

    pub fn get(&self, key: &str) -> Option<&TagEntry<'a>> {
        self.entries.get(key)
    }

    /// Iterates over the entries ordered by tag key.
    pub fn iter(&self) -> impl Iterator<Item = &TagEntry<'a>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orders dated documents before undated ones, most recent first. Equal keys
/// compare equal so a stable sort keeps discovery order among them.
pub fn newest_first(a: &Document, b: &Document) -> Ordering {
    match (a.date, b.date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Result;
    use crate::frontmatter;

    fn document(source: &str, tags: &str) -> Result<Document> {
        let input = format!("---\nlayout: post\ntitle: {}\ntags: {}\n---\n", source, tags);
        let (front_matter, body) = frontmatter::parse(&input).unwrap();
        Document::build(source, front_matter, body)
    }

    fn sources<'a>(entry: &TagEntry<'a>) -> Vec<&'a str> {
        entry.documents.iter().map(|d| d.source.as_str()).collect()
    }

    #[test]
    fn test_parse_list_forms() {
        let list = Value::List(vec![" Java ".to_owned(), "".to_owned(), "AWS Lambda".to_owned()]);
        let tags = Tag::parse_list(&list);
        assert_eq!(vec!["Java", "AWS Lambda"], tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>());
        assert_eq!("aws-lambda", tags[1].key);

        let csv = Value::Scalar("Java, logging,,java".to_owned());
        let tags = Tag::parse_list(&csv);
        assert_eq!(vec!["Java", "logging"], tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_index_orders_newest_first() -> Result<()> {
        let documents = vec![
            document("2021-03-01-a.md", "[Java]")?,
            document("2022-01-01-b.md", "[Java, Logging]")?,
            document("2020-07-15-c.md", "[Logging]")?,
            document("2021-12-31-d.md", "[java]")?,
        ];
        let index = TagIndex::build(documents.iter());

        assert_eq!(2, index.len());
        let java = index.get("java").unwrap();
        assert_eq!("Java", java.tag.name);
        assert_eq!(
            vec!["2022-01-01-b.md", "2021-12-31-d.md", "2021-03-01-a.md"],
            sources(java),
        );
        let logging = index.get("logging").unwrap();
        assert_eq!(vec!["2022-01-01-b.md", "2020-07-15-c.md"], sources(logging));
        Ok(())
    }

    #[test]
    fn test_undated_documents_keep_discovery_order() -> Result<()> {
        let documents = vec![
            document("zeta.md", "[misc]")?,
            document("2019-01-01-old.md", "[misc]")?,
            document("alpha.md", "[misc]")?,
        ];
        let index = TagIndex::build(documents.iter());
        assert_eq!(
            vec!["2019-01-01-old.md", "zeta.md", "alpha.md"],
            sources(index.get("misc").unwrap()),
        );
        Ok(())
    }

    #[test]
    fn test_empty_index() {
        let index = TagIndex::build(std::iter::empty());
        assert!(index.is_empty());
        assert_eq!(0, index.iter().count());
    }
}
