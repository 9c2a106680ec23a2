//! Splits a source file into its YAML front matter and its Markdown body.
//!
//! A front matter block is opened by a `---` line at the very start of the
//! file and closed by the next `---` (or `...`) line:
//!
//! ```md
//! ---
//! layout: post
//! title: Hello, world!
//! tags: [greet]
//! ---
//! # Hello
//! ```
//!
//! The block must be a flat mapping: every value is either a scalar or a list
//! of scalars. Files without a block are valid and yield an empty
//! [`FrontMatter`].

use std::collections::BTreeMap;

use serde_yaml::Value as Yaml;
use thiserror::Error;

const FENCE: &str = "---";
const END_FENCES: [&str; 2] = ["---", "..."];

/// A front matter value. Numbers and booleans are kept in their textual form;
/// it's up to the consumer to interpret them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    /// Returns the scalar text, or `None` for lists.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }
}

/// The parsed metadata block, keyed by front matter key.
pub type FrontMatter = BTreeMap<String, Value>;

/// Parses the front matter at the head of `input` and returns it together
/// with the remaining body. The body is returned exactly as it appears after
/// the closing fence line.
pub fn parse(input: &str) -> Result<(FrontMatter, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    match split(input)? {
        None => Ok((FrontMatter::new(), input)),
        Some((yaml, body)) => {
            Ok((to_front_matter(serde_yaml::from_str(yaml)?)?, body))
        }
    }
}

// Returns the YAML text and body, or `None` if there is no opening fence.
fn split(input: &str) -> Result<Option<(&str, &str)>> {
    let (first, rest) = input.split_once('\n').unwrap_or((input, ""));
    if first.trim_end() != FENCE {
        return Ok(None);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let end = offset + line.len();
        if END_FENCES.contains(&line.trim_end()) {
            return Ok(Some((&rest[..offset], &rest[end..])));
        }
        offset = end;
    }
    Err(Error::MissingEndFence)
}

fn to_front_matter(yaml: Yaml) -> Result<FrontMatter> {
    let mapping = match yaml {
        // an empty block
        Yaml::Null => return Ok(FrontMatter::new()),
        Yaml::Mapping(mapping) => mapping,
        _ => return Err(Error::NotAMapping),
    };

    let mut front_matter = FrontMatter::new();
    for (key, value) in mapping {
        let key = match key {
            Yaml::String(key) => key,
            other => return Err(Error::InvalidKey(format!("{:?}", other))),
        };
        let value = to_value(&key, &value)?;
        front_matter.insert(key, value);
    }
    Ok(front_matter)
}

fn to_value(key: &str, value: &Yaml) -> Result<Value> {
    if let Yaml::Sequence(items) = value {
        return items
            .iter()
            .map(|item| {
                to_scalar(item).ok_or_else(|| Error::Nested(key.to_owned()))
            })
            .collect::<Result<Vec<String>>>()
            .map(Value::List);
    }
    to_scalar(value)
        .map(Value::Scalar)
        .ok_or_else(|| Error::Nested(key.to_owned()))
}

fn to_scalar(value: &Yaml) -> Option<String> {
    match value {
        Yaml::Null => Some(String::new()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// The result of a front matter parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a malformed front matter block.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the opening fence (`---`) was found but the closing one
    /// was missing.
    #[error("missing closing `---`")]
    MissingEndFence,

    /// Returned when the block isn't valid YAML, e.g. a line that isn't a
    /// `key: value` pair inside an otherwise valid mapping.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when the block is valid YAML but not a mapping.
    #[error("front matter must consist of `key: value` lines")]
    NotAMapping,

    /// Returned when a key isn't a string.
    #[error("front matter keys must be strings, found {0}")]
    InvalidKey(String),

    /// Returned when a value is a mapping or a list containing non-scalars.
    #[error("front matter key `{0}` must hold a scalar or a list of scalars")]
    Nested(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn scalar(s: &str) -> Value {
        Value::Scalar(s.to_owned())
    }

    #[test]
    fn test_parse_front_matter() -> Result<()> {
        let input = "---\nlayout: post\ntitle: \"X\"\ntags: [Java, Logging]\n---\n# Body\n";
        let (front_matter, body) = parse(input)?;

        assert_eq!(Some(&scalar("post")), front_matter.get("layout"));
        assert_eq!(Some(&scalar("X")), front_matter.get("title"));
        assert_eq!(
            Some(&Value::List(vec!["Java".to_owned(), "Logging".to_owned()])),
            front_matter.get("tags"),
        );
        assert_eq!("# Body\n", body);
        Ok(())
    }

    #[test]
    fn test_parse_without_front_matter() -> Result<()> {
        let input = "Just some text.\n\n---\n\nMore text.\n";
        let (front_matter, body) = parse(input)?;
        assert!(front_matter.is_empty());
        assert_eq!(input, body);
        Ok(())
    }

    #[test]
    fn test_parse_empty_block() -> Result<()> {
        let (front_matter, body) = parse("---\n---\nbody")?;
        assert!(front_matter.is_empty());
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_body_keeps_later_rules() -> Result<()> {
        let (_, body) = parse("---\nlayout: page\n---\nabove\n\n---\n\nbelow\n")?;
        assert_eq!("above\n\n---\n\nbelow\n", body);
        Ok(())
    }

    #[test]
    fn test_scalars_keep_text_form() -> Result<()> {
        let (front_matter, _) =
            parse("---\nweight: 3\npublished: false\nsubtitle:\n---\n")?;
        assert_eq!(Some(&scalar("3")), front_matter.get("weight"));
        assert_eq!(Some(&scalar("false")), front_matter.get("published"));
        assert_eq!(Some(&scalar("")), front_matter.get("subtitle"));
        Ok(())
    }

    #[test]
    fn test_crlf_and_bom() -> Result<()> {
        let (front_matter, body) =
            parse("\u{feff}---\r\nlayout: page\r\n---\r\nbody\r\n")?;
        assert_eq!(Some(&scalar("page")), front_matter.get("layout"));
        assert_eq!("body\r\n", body);
        Ok(())
    }

    #[test]
    fn test_dots_close_the_block() -> Result<()> {
        let (front_matter, body) = parse("---\nlayout: page\n...\nbody")?;
        assert_eq!(Some(&scalar("page")), front_matter.get("layout"));
        assert_eq!("body", body);
        Ok(())
    }

    #[test]
    fn test_missing_end_fence() {
        assert!(matches!(
            parse("---\nlayout: post\n# never closed\n"),
            Err(Error::MissingEndFence)
        ));
    }

    #[test]
    fn test_line_is_not_a_pair() {
        assert!(matches!(
            parse("---\nlayout post\n---\n"),
            Err(Error::NotAMapping)
        ));
        assert!(matches!(
            parse("---\nlayout: post\nnot a pair\n---\n"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_nested_values_are_rejected() {
        assert!(matches!(
            parse("---\nauthor:\n  name: someone\n---\n"),
            Err(Error::Nested(key)) if key == "author"
        ));
        assert!(matches!(
            parse("---\ntags: [[a, b]]\n---\n"),
            Err(Error::Nested(key)) if key == "tags"
        ));
    }
}
