use crate::config::SiteConfig;
use crate::models::Post;
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

pub const FEED_PATH: &str = "/all/rss/";

/// RSS 2.0 document for `posts`, in the order given.
pub fn rss(site: &SiteConfig, posts: &[Post]) -> Result<String> {
    let base = site.url.trim_end_matches('/');
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("rss").with_attributes([
        ("version", "2.0"),
        ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ])))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &site.title)?;
    text_element(&mut writer, "link", &format!("{}/", base))?;
    text_element(&mut writer, "description", &site.description)?;
    text_element(&mut writer, "language", &site.language)?;
    let self_link = format!("{}{}", base, FEED_PATH);
    writer.write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
        ("href", self_link.as_str()),
        ("rel", "self"),
        ("type", "application/rss+xml"),
    ])))?;
    if let Some(newest) = posts.first() {
        text_element(&mut writer, "lastBuildDate", &newest.modified_time.to_rfc2822())?;
    }

    for post in posts {
        let link = format!("{}{}", base, post.url());
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &item_title(post))?;
        text_element(&mut writer, "link", &link)?;
        text_element(&mut writer, "description", &post.excerpt)?;
        text_element(&mut writer, "author", &post.author.username)?;
        text_element(&mut writer, "category", &post.category.name)?;
        text_element(&mut writer, "pubDate", &post.created_time.to_rfc2822())?;
        writer.write_event(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(&link)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// `[Category] Title`
pub fn item_title(post: &Post) -> String {
    format!("[{}] {}", post.category.name, post.title)
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
