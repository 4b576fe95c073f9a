//! A parsed page that reports its own mutations to an observer

use std::cell::RefCell;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom as rcdom;
use rcdom::{Handle, RcDom};
use tracing::trace;

use crate::dom::{self, find_all, find_first, is_tag};

/// One change to the tree: nodes added under `target`
pub struct MutationRecord {
    pub target: Handle,
    pub added_nodes: Vec<Handle>,
}

/// Receives batches of mutation records, one batch at a time
pub trait MutationObserver {
    fn on_mutations(&mut self, doc: &Document, records: &[MutationRecord]);
}

pub struct Document {
    dom: RcDom,
    url: String,
    pending: RefCell<Vec<MutationRecord>>,
}

impl Document {
    /// Parse a full HTML page loaded from `url`
    pub fn parse(html: &str, url: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        Self {
            dom,
            url: url.to_string(),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    pub fn body(&self) -> Option<Handle> {
        find_first(&self.dom.document, &|node: &Handle| is_tag(node, "body"))
    }

    pub fn query_first<F>(&self, pred: F) -> Option<Handle>
    where
        F: Fn(&Handle) -> bool,
    {
        find_first(&self.dom.document, &pred)
    }

    pub fn query_all<F>(&self, pred: F) -> Vec<Handle>
    where
        F: Fn(&Handle) -> bool,
    {
        find_all(&self.dom.document, &pred)
    }

    pub fn append_child(&self, parent: &Handle, child: Handle) {
        dom::append_child(parent, child.clone());
        self.record(parent, vec![child]);
    }

    /// Insert `child` before `reference` under `parent`; false if `reference` is not a child
    pub fn insert_before(&self, parent: &Handle, child: Handle, reference: &Handle) -> bool {
        if !dom::insert_before(parent, child.clone(), reference) {
            return false;
        }
        self.record(parent, vec![child]);
        true
    }

    /// Parse an HTML fragment and append its nodes to `parent`, as infinite scroll does
    pub fn append_html(&self, parent: &Handle, html: &str) -> Vec<Handle> {
        let fragment = parse_document(RcDom::default(), Default::default()).one(html);
        let Some(fragment_body) = find_first(&fragment.document, &|node: &Handle| {
            is_tag(node, "body")
        }) else {
            return Vec::new();
        };

        let added: Vec<Handle> = fragment_body.children.borrow_mut().drain(..).collect();
        for node in &added {
            dom::append_child(parent, node.clone());
        }
        if !added.is_empty() {
            self.record(parent, added.clone());
        }
        added
    }

    fn record(&self, target: &Handle, added_nodes: Vec<Handle>) {
        self.pending.borrow_mut().push(MutationRecord {
            target: target.clone(),
            added_nodes,
        });
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Hand queued records to `observer` until the tree is quiet.
    /// Mutations the observer performs while handling a batch form the next batch.
    pub fn deliver_mutations(&self, observer: &mut dyn MutationObserver) {
        loop {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            trace!(records = batch.len(), "Delivering mutation batch");
            observer.on_mutations(self, &batch);
        }
    }
}
