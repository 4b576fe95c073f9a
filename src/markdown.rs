//! Markdown generation from post data

use crate::models::PostRecord;

/// Prefix carried by every line of a note
const QUOTE: &str = "> ";

/// Rewrite each embedded newline so the continuation stays inside the blockquote
fn quote_multiline(text: &str) -> String {
    text.replace('\n', "\n> ")
}

/// Generate a blockquote-style markdown note from a post
///
/// # Arguments
/// * `record` - The post snapshot to render
///
/// # Returns
/// Header, optional body, optional images and footer, each section followed by
/// an empty `>` line except the footer, which ends the note
pub fn format_note(record: &PostRecord) -> String {
    let mut markdown = String::new();

    // Header: avatar, bold name, handle as inline code
    markdown.push_str(&format!(
        "{}![]({}) **{}** `{}`\n>\n",
        QUOTE, record.avatar_url, record.author_name, record.author_handle
    ));

    if !record.body_text.is_empty() {
        markdown.push_str(QUOTE);
        markdown.push_str(&quote_multiline(&record.body_text));
        markdown.push_str("\n>\n");
    }

    if !record.image_urls.is_empty() {
        for image_url in &record.image_urls {
            markdown.push_str(&format!("{}![]({})\n", QUOTE, image_url));
        }
        markdown.push_str(">\n");
    }

    markdown.push_str(&format!(
        "{}*{}* · [View Tweet]({})",
        QUOTE, record.timestamp_display, record.permalink
    ));

    markdown
}
