//! Post detection, trigger injection and data extraction

use chrono::{DateTime, Utc};
use markup5ever_rcdom as rcdom;
use rcdom::Handle;
use tracing::{debug, trace};

use crate::document::{Document, MutationObserver, MutationRecord};
use crate::dom::{
    attr, attr_contains, closest, create_element, find_all, find_first, has_class, has_test_id,
    inner_text, is_tag, parent_element, raw_text, with_attrs,
};
use crate::models::PostRecord;
use crate::utils::{iso_timestamp, resolve_url};

/// Marker class carried by every injected trigger control
pub const TRIGGER_CLASS: &str = "blinko-button";
pub const TRIGGER_TITLE: &str = "Save to Blinko";
pub const DEFAULT_ICON_URL: &str = "icons/icon.png";

const POST_TEST_ID: &str = "tweet";
const BOOKMARK_TEST_ID: &str = "bookmark";
const USER_NAME_TEST_ID: &str = "User-Name";
const AVATAR_TEST_ID: &str = "Tweet-User-Avatar";
const BODY_TEST_ID: &str = "tweetText";
const PHOTO_TEST_ID: &str = "tweetPhoto";
const PERMALINK_MARKER: &str = "/status/";
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Matches `article[data-testid="tweet"]`
pub fn is_post_container(handle: &Handle) -> bool {
    is_tag(handle, "article") && has_test_id(handle, POST_TEST_ID)
}

pub fn is_trigger(handle: &Handle) -> bool {
    with_attrs(handle, |attrs| has_class(attrs, TRIGGER_CLASS))
}

/// The post container a trigger control was injected into
pub fn post_for_trigger(trigger: &Handle) -> Option<Handle> {
    closest(trigger, is_post_container)
}

/// Finds posts, injects one trigger control into each, and reads post data
#[derive(Debug, Clone)]
pub struct PostExtractor {
    icon_url: String,
}

impl Default for PostExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_URL)
    }
}

impl PostExtractor {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            icon_url: icon_url.into(),
        }
    }

    /// Inject a trigger control into every post container that lacks one.
    /// Returns the number of controls injected; rescanning an unchanged page injects none.
    pub fn scan_and_inject(&self, doc: &Document) -> usize {
        let mut injected = 0;

        for post in doc.query_all(is_post_container) {
            if find_first(&post, &is_trigger).is_some() {
                continue;
            }

            // Position relative to the bookmark action, located by its stable test id
            let Some(bookmark) = find_first(&post, &|node: &Handle| {
                has_test_id(node, BOOKMARK_TEST_ID)
            }) else {
                trace!("Post without bookmark action, skipping");
                continue;
            };
            let Some(bookmark_wrapper) = parent_element(&bookmark) else {
                continue;
            };
            let Some(action_bar) = parent_element(&bookmark_wrapper) else {
                continue;
            };

            let container = self.build_trigger(&bookmark_wrapper);
            if doc.insert_before(&action_bar, container, &bookmark_wrapper) {
                injected += 1;
            }
        }

        if injected > 0 {
            debug!(injected, "Injected save controls");
        }
        injected
    }

    /// Trigger markup; the wrapper copies the bookmark wrapper's classes so layout matches
    fn build_trigger(&self, bookmark_wrapper: &Handle) -> Handle {
        let wrapper_class = attr(bookmark_wrapper, "class").unwrap_or_default();
        let container = create_element("div", &[("class", wrapper_class.as_str())]);

        let button = create_element(
            "div",
            &[
                ("class", TRIGGER_CLASS),
                ("title", TRIGGER_TITLE),
                ("role", "button"),
            ],
        );
        let icon = create_element(
            "img",
            &[
                ("src", self.icon_url.as_str()),
                ("alt", "Blinko"),
                ("style", "width: 20px; height: 20px;"),
            ],
        );

        crate::dom::append_child(&button, icon);
        crate::dom::append_child(&container, button);
        container
    }

    /// Read a post's visible data. Missing pieces fall back to defaults, never errors.
    pub fn extract(&self, post: &Handle, page_url: &str, now: DateTime<Utc>) -> PostRecord {
        extract_post(post, page_url, now)
    }
}

impl MutationObserver for PostExtractor {
    fn on_mutations(&mut self, doc: &Document, records: &[MutationRecord]) {
        if records.iter().any(|record| !record.added_nodes.is_empty()) {
            self.scan_and_inject(doc);
        }
    }
}

/// Extract structured data from one post container
pub fn extract_post(post: &Handle, page_url: &str, now: DateTime<Utc>) -> PostRecord {
    let mut record = PostRecord::default();

    // Name is the first line of the user block, handle is the first line starting with @
    record.author_name = UNKNOWN_AUTHOR.to_string();
    if let Some(user) = find_first(post, &|node: &Handle| has_test_id(node, USER_NAME_TEST_ID)) {
        let text = inner_text(&user);
        let lines: Vec<&str> = text.split('\n').collect();
        record.author_name = lines.first().copied().unwrap_or_default().to_string();
        record.author_handle = lines
            .iter()
            .find(|line| line.starts_with('@'))
            .map(|line| line.to_string())
            .unwrap_or_default();
    }

    record.avatar_url = find_first(post, &|node: &Handle| has_test_id(node, AVATAR_TEST_ID))
        .and_then(|avatar| find_first(&avatar, &|node: &Handle| is_tag(node, "img")))
        .and_then(|img| attr(&img, "src"))
        .map(|src| resolve_url(page_url, &src))
        .unwrap_or_default();

    record.body_text = find_first(post, &|node: &Handle| has_test_id(node, BODY_TEST_ID))
        .map(|body| raw_text(&body))
        .unwrap_or_default();

    let time = find_first(post, &|node: &Handle| is_tag(node, "time"));
    record.timestamp_iso = time
        .as_ref()
        .and_then(|time| attr(time, "datetime"))
        .filter(|datetime| !datetime.is_empty())
        .unwrap_or_else(|| iso_timestamp(now));
    record.timestamp_display = time
        .as_ref()
        .map(inner_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| record.timestamp_iso.clone());

    record.permalink = find_first(post, &|node: &Handle| {
        is_tag(node, "a") && with_attrs(node, |attrs| attr_contains(attrs, "href", PERMALINK_MARKER))
    })
    .and_then(|link| attr(&link, "href"))
    .map(|href| resolve_url(page_url, &href))
    .unwrap_or_else(|| page_url.to_string());

    // Photos, in page order
    for photo in find_all(post, &|node: &Handle| has_test_id(node, PHOTO_TEST_ID)) {
        for img in find_all(&photo, &|node: &Handle| is_tag(node, "img")) {
            if let Some(src) = attr(&img, "src") {
                record.image_urls.push(resolve_url(page_url, &src));
            }
        }
    }

    record
}
