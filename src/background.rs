//! Background worker: the privileged side of the page/worker message channel.
//!
//! The page sends one [`Message`] and awaits exactly one reply. Every request
//! is handled in its own task, so a slow upsert never holds up the next click.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::client::BlinkoClient;
use crate::models::SubmissionResult;

/// Requests the page may send to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Message {
    SaveToBlinko {
        content: String,
        #[serde(rename = "baseUrl")]
        base_url: String,
        token: String,
    },
}

struct Envelope {
    message: Message,
    reply: oneshot::Sender<SubmissionResult>,
}

/// Page-side handle for messaging the worker
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MessageSender {
    /// Send one request and wait for its reply.
    /// `None` means the worker went away without answering.
    pub async fn send_message(&self, message: Message) -> Option<SubmissionResult> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Envelope { message, reply }).is_err() {
            warn!("Background worker is not running");
            return None;
        }
        rx.await.ok()
    }
}

pub struct BackgroundWorker;

impl BackgroundWorker {
    /// Start the worker on the current tokio runtime
    pub fn spawn(client: BlinkoClient) -> MessageSender {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let client = client.clone();
                tokio::spawn(async move {
                    let result = handle_message(&client, envelope.message).await;
                    if envelope.reply.send(result).is_err() {
                        debug!("Requester dropped before the reply arrived");
                    }
                });
            }
            debug!("Background worker stopped");
        });

        MessageSender { tx }
    }
}

async fn handle_message(client: &BlinkoClient, message: Message) -> SubmissionResult {
    match message {
        Message::SaveToBlinko {
            content,
            base_url,
            token,
        } => client.save(&content, &base_url, &token).await,
    }
}
