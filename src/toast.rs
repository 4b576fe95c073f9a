//! On-page toast reporting the outcome of a save

use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

use crate::document::Document;
use crate::dom::{attr, create_element, inner_text, set_attr, set_text};
use crate::models::SubmissionResult;

pub const TOAST_CLASS: &str = "blinko-toast";
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
        }
    }
}

/// Owns the single toast node; it is created on first use and reused afterwards
#[derive(Default)]
pub struct Toast {
    node: Option<Handle>,
    hide_at: Option<Instant>,
}

impl Toast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message` at `now`, replacing whatever is showing and restarting the hide timer
    pub fn show(&mut self, doc: &Document, message: &str, kind: ToastKind, now: Instant) {
        let node = match &self.node {
            Some(node) => node.clone(),
            None => {
                let node = create_element("div", &[("class", TOAST_CLASS)]);
                if let Some(body) = doc.body() {
                    doc.append_child(&body, node.clone());
                }
                self.node = Some(node.clone());
                node
            }
        };

        set_text(&node, message);
        set_attr(&node, "class", &format!("{} {} show", TOAST_CLASS, kind.as_str()));
        self.hide_at = Some(now + TOAST_DURATION);
    }

    /// Toast for a worker reply; `None` is a reply that never came
    pub fn notify(&mut self, doc: &Document, result: Option<&SubmissionResult>, now: Instant) {
        let (message, kind) = match result {
            Some(result) if result.success => ("Saved to Blinko!".to_string(), ToastKind::Success),
            Some(result) => (
                format!("Failed to save to Blinko: {}", result.error_message()),
                ToastKind::Error,
            ),
            None => (
                "Failed to save to Blinko: Unknown error".to_string(),
                ToastKind::Error,
            ),
        };
        self.show(doc, &message, kind, now);
    }

    /// Advance the hide timer to `now`
    pub fn tick(&mut self, now: Instant) {
        let Some(hide_at) = self.hide_at else {
            return;
        };
        if now < hide_at {
            return;
        }
        if let Some(node) = &self.node {
            let classes = attr(node, "class").unwrap_or_default();
            let kept: Vec<&str> = classes.split_whitespace().filter(|c| *c != "show").collect();
            set_attr(node, "class", &kept.join(" "));
        }
        self.hide_at = None;
    }

    pub fn is_visible(&self) -> bool {
        self.node
            .as_ref()
            .and_then(|node| attr(node, "class"))
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == "show"))
    }

    pub fn text(&self) -> Option<String> {
        self.node.as_ref().map(inner_text)
    }

    pub fn kind(&self) -> Option<ToastKind> {
        let classes = attr(self.node.as_ref()?, "class")?;
        classes.split_whitespace().find_map(|class| match class {
            "success" => Some(ToastKind::Success),
            "error" => Some(ToastKind::Error),
            _ => None,
        })
    }
}
