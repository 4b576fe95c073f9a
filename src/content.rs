//! Page-side orchestration: watch the page, handle clicks on injected controls

use std::cell::{Ref, RefCell};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use markup5ever_rcdom::Handle;
use tracing::{info, warn};

use crate::background::{Message, MessageSender};
use crate::document::Document;
use crate::error::{ClipError, Result};
use crate::extractor::{is_trigger, post_for_trigger, PostExtractor};
use crate::markdown::format_note;
use crate::models::SubmissionResult;
use crate::settings::SettingsStore;
use crate::toast::Toast;

pub struct ContentScript {
    doc: Document,
    extractor: PostExtractor,
    toast: RefCell<Toast>,
    settings: Arc<dyn SettingsStore>,
    sender: MessageSender,
    alerts: RefCell<Vec<String>>,
}

impl ContentScript {
    /// Attach to a loaded page: inject controls into the posts already present
    pub fn start(
        doc: Document,
        extractor: PostExtractor,
        settings: Arc<dyn SettingsStore>,
        sender: MessageSender,
    ) -> Self {
        let mut script = Self {
            doc,
            extractor,
            toast: RefCell::new(Toast::new()),
            settings,
            sender,
            alerts: RefCell::new(Vec::new()),
        };

        let injected = script.extractor.scan_and_inject(&script.doc);
        info!(url = %script.doc.url(), injected, "Content script attached");
        script.process_mutations();
        script
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// React to everything that changed in the page since the last call
    pub fn process_mutations(&mut self) {
        self.doc.deliver_mutations(&mut self.extractor);
    }

    /// Injected controls in document order
    pub fn triggers(&self) -> Vec<Handle> {
        self.doc.query_all(is_trigger)
    }

    pub fn toast(&self) -> Ref<'_, Toast> {
        self.toast.borrow()
    }

    /// Advance the toast's hide timer to `now`
    pub fn tick(&self, now: Instant) {
        self.toast.borrow_mut().tick(now);
    }

    /// Alerts raised so far (missing settings)
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    /// Handle a click on an injected control.
    ///
    /// # Errors
    ///
    /// `MissingSettings` (after raising an alert) when the connection is not
    /// configured; nothing is extracted or sent in that case. HTTP and network
    /// failures are not errors here: they come back in the result and the toast.
    ///
    /// Several clicks may be in flight at once. Each reply updates the toast as it arrives.
    pub async fn click(&self, trigger: &Handle) -> Result<SubmissionResult> {
        let message = self.prepare(trigger)?;
        let reply = self.sender.send_message(message).await;

        self.toast
            .borrow_mut()
            .notify(&self.doc, reply.as_ref(), Instant::now());
        Ok(reply.unwrap_or_else(|| SubmissionResult::failure("Unknown error")))
    }

    /// Settings check, extraction and formatting for one click
    fn prepare(&self, trigger: &Handle) -> Result<Message> {
        let settings = self.settings.get()?;
        if let Err(e) = settings.validate() {
            warn!("Save requested before Blinko was configured");
            self.alerts.borrow_mut().push(e.to_string());
            return Err(e);
        }

        let post = post_for_trigger(trigger).ok_or(ClipError::DetachedTrigger)?;
        let record = self.extractor.extract(&post, self.doc.url(), Utc::now());
        info!(
            author = %record.author_handle,
            permalink = %record.permalink,
            images = record.image_urls.len(),
            "Saving post to Blinko"
        );

        Ok(Message::SaveToBlinko {
            content: format_note(&record),
            base_url: settings.base_url,
            token: settings.token,
        })
    }
}
