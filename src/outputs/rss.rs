//! RSS 2.0 serialization.
//!
//! [`to_rss`] is a pure function of its [`Feed`]: no clock, network, or disk
//! access. Element order is fixed and optional fields are omitted rather than
//! written empty, so the same feed always serializes to the same bytes.
//!
//! Field descriptions: <https://www.rssboard.org/rss-specification>.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

use crate::error::ShimError;
use crate::models::{Feed, FeedItem};
use crate::utils::to_rfc822;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const CREATIVE_COMMONS_NS: &str = "http://backend.userland.com/creativeCommonsRssModule";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn xml_err(e: impl std::fmt::Display) -> ShimError {
    ShimError::Serialization(e.to_string())
}

fn write_event<'a>(writer: &mut XmlWriter, event: Event<'a>) -> Result<(), ShimError> {
    writer.write_event(event).map_err(xml_err)
}

/// Write `<name>text</name>`.
fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), ShimError> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn optional_element(
    writer: &mut XmlWriter,
    name: &str,
    text: Option<&str>,
) -> Result<(), ShimError> {
    match text {
        Some(text) => text_element(writer, name, text),
        None => Ok(()),
    }
}

fn write_item(writer: &mut XmlWriter, item: &FeedItem) -> Result<(), ShimError> {
    write_event(writer, Event::Start(BytesStart::new("item")))?;
    text_element(writer, "title", &item.title)?;
    optional_element(writer, "description", item.description.as_deref())?;
    if let Some(link) = &item.link {
        text_element(writer, "link", link)?;
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        write_event(writer, Event::Start(guid))?;
        write_event(writer, Event::Text(BytesText::new(link)))?;
        write_event(writer, Event::End(BytesEnd::new("guid")))?;
    }
    if let Some(date) = &item.published_at {
        text_element(writer, "pubDate", &to_rfc822(date))?;
    }
    write_event(writer, Event::End(BytesEnd::new("item")))
}

/// Serialize a feed to an RSS 2.0 document.
///
/// Only the first [`MAX_FEED_ITEMS`](crate::models::MAX_FEED_ITEMS) items are
/// written. The channel `pubDate` is the latest item date, and is omitted
/// when no item is dated. Output is indented with two spaces and ends with a
/// newline.
///
/// # Errors
///
/// Returns [`ShimError::Validation`] if a required field is empty, or
/// [`ShimError::Serialization`] if the XML writer fails.
pub fn to_rss(feed: &Feed) -> Result<String, ShimError> {
    feed.validate()?;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    if feed.self_url.is_some() {
        rss.push_attribute(("xmlns:atom", ATOM_NS));
    }
    if feed.copyright_url.is_some() {
        rss.push_attribute(("xmlns:creativeCommons", CREATIVE_COMMONS_NS));
    }
    write_event(&mut writer, Event::Start(rss))?;
    write_event(&mut writer, Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &feed.title)?;
    text_element(&mut writer, "description", &feed.description)?;
    text_element(&mut writer, "link", &feed.link)?;
    if let Some(self_url) = &feed.self_url {
        let mut atom_link = BytesStart::new("atom:link");
        atom_link.push_attribute(("href", self_url.as_str()));
        atom_link.push_attribute(("rel", "self"));
        atom_link.push_attribute(("type", "application/rss+xml"));
        write_event(&mut writer, Event::Empty(atom_link))?;
    }
    optional_element(&mut writer, "copyright", feed.copyright.as_deref())?;
    optional_element(
        &mut writer,
        "creativeCommons:license",
        feed.copyright_url.as_deref(),
    )?;
    optional_element(&mut writer, "docs", feed.docs.as_deref())?;
    optional_element(&mut writer, "generator", feed.generator.as_deref())?;
    optional_element(&mut writer, "language", feed.language.as_deref())?;
    text_element(&mut writer, "lastBuildDate", &to_rfc822(&feed.last_build_date))?;
    if let Some(pub_date) = feed.publish_date() {
        text_element(&mut writer, "pubDate", &to_rfc822(&pub_date))?;
    }
    text_element(&mut writer, "ttl", &feed.ttl_minutes.to_string())?;

    for item in feed.rendered_items() {
        write_item(&mut writer, item)?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("channel")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("rss")))?;

    let mut xml = String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)?;
    xml.push('\n');
    Ok(xml)
}
