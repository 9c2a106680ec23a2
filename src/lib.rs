//! The library code for the `jotter` static site generator. A build runs
//! in three steps:
//!
//! 1. Discovering the Markdown sources on disk ([`crate::source`])
//! 2. Assembling them into rendered outputs ([`crate::site`])
//! 3. Writing the outputs and the static assets to disk ([`crate::write`])
//!
//! The second step does the real work. Each source's front matter is parsed
//! ([`crate::frontmatter`]) and checked into a [`document::Document`]; every
//! document is given a route ([`crate::route`]), and no two outputs may share
//! one. Bodies are converted from Markdown ([`crate::markdown`]), documents
//! are grouped by tag ([`crate::tag`]), and finally every document and every
//! tag listing is rendered through its layout ([`crate::layout`]).
//!
//! A document that can't be built is reported and left out; the rest of the
//! site still builds. A route collision fails the whole build.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod document;
pub mod feed;
pub mod frontmatter;
pub mod layout;
pub mod markdown;
pub mod route;
pub mod site;
pub mod source;
pub mod tag;
pub mod value;
pub mod write;
