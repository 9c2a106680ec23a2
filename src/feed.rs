//! Support for creating Atom feeds from a list of posts.

use atom_syndication::{
    Entry, EntryBuilder, Error as AtomError, FeedBuilder, LinkBuilder, Person,
    PersonBuilder, Text,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::config::Author;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,

    /// The feed's permanent identifier; the site URL when there is one.
    pub id: String,

    pub author: Option<&'a Author>,

    /// The URL of the site's home page.
    pub home_page: String,

    /// The URL the feed itself is served from.
    pub self_url: String,
}

/// One post in the feed.
pub struct FeedEntry<'a> {
    pub title: &'a str,

    /// The absolute URL of the post (or its route, for sites without a URL).
    pub url: String,

    pub date: NaiveDate,

    /// The post summary as HTML.
    pub summary: &'a str,
}

/// Renders the Atom feed for `entries`, which should be ordered newest first.
/// The feed's `updated` timestamp is the newest entry's date, so rebuilding an
/// unchanged site yields an identical feed.
pub fn render(config: &FeedConfig, entries: &[FeedEntry]) -> Result<String> {
    let updated = entries
        .iter()
        .map(|entry| entry.date)
        .max()
        .map(midnight)
        .unwrap_or_default();

    let feed = FeedBuilder::default()
        .title(Text::plain(config.title))
        .id(config.id.clone())
        .updated(updated)
        .authors(author_to_people(config.author))
        .links(vec![
            LinkBuilder::default()
                .href(config.home_page.clone())
                .rel("alternate")
                .build(),
            LinkBuilder::default()
                .href(config.self_url.clone())
                .rel("self")
                .build(),
        ])
        .entries(feed_entries(config, entries))
        .build();

    let bytes = feed.write_to(Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

fn feed_entries(config: &FeedConfig, entries: &[FeedEntry]) -> Vec<Entry> {
    entries
        .iter()
        .map(|entry| {
            let date = midnight(entry.date);
            EntryBuilder::default()
                .id(entry.url.clone())
                .title(Text::plain(entry.title))
                .updated(date)
                .published(Some(date))
                .authors(author_to_people(config.author))
                .links(vec![LinkBuilder::default()
                    .href(entry.url.clone())
                    .rel("alternate")
                    .build()])
                .summary(Some(Text::html(entry.summary)))
                .build()
        })
        .collect()
}

// Posts only carry a date, so entries are stamped at midnight UTC.
fn midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&naive).fixed_offset()
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![PersonBuilder::default()
            .name(author.name.clone())
            .email(author.email.clone())
            .build()],
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    #[error("writing feed: {0}")]
    Atom(#[from] AtomError),

    /// Returned when the serialized feed isn't UTF-8.
    #[error("writing feed: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_feed() -> Result<()> {
        let author = Author {
            name: "Someone".to_owned(),
            email: None,
        };
        let config = FeedConfig {
            title: "Notes",
            id: "https://example.org/".to_owned(),
            author: Some(&author),
            home_page: "https://example.org/".to_owned(),
            self_url: "https://example.org/feed.xml".to_owned(),
        };
        let entries = vec![
            FeedEntry {
                title: "Cold starts",
                url: "https://example.org/2022/03/01/cold-starts/".to_owned(),
                date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
                summary: "<p>Lambda</p>",
            },
            FeedEntry {
                title: "Retries",
                url: "https://example.org/2021/01/05/retries/".to_owned(),
                date: NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(),
                summary: "<p>Backoff</p>",
            },
        ];

        let feed = render(&config, &entries)?;
        assert!(feed.contains(">Notes</title>"));
        assert!(feed.contains("<updated>2022-03-01T00:00:00+00:00</updated>"));
        assert!(feed.contains("https://example.org/2021/01/05/retries/"));
        assert!(feed.contains("<name>Someone</name>"));
        assert_eq!(feed, render(&config, &entries)?);
        Ok(())
    }
}
