//! Companion Worker - serialized background request processing
//!
//! Submissions are queued and handled one at a time in submission order,
//! so each request sees the replies to every earlier message and replies
//! never land out of order. The frame loop only enqueues; it never waits
//! on the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::services::companion::{
    CompanionBridge, CompanionEvent, EventSubscription, ReplyOutcome,
};
use crate::services::conversation_store::SessionContext;

struct Submission {
    id: Uuid,
    message: String,
    cancel: CancellationToken,
    reply: oneshot::Sender<ReplyOutcome>,
}

/// Where an unfinished request is in the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Queued,
    Running,
}

#[derive(Clone, Default)]
struct RequestTable(Arc<Mutex<HashMap<Uuid, RequestState>>>);

impl RequestTable {
    // Every update is a single map operation, so a poisoned lock still holds a valid table.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, RequestState>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, id: Uuid, state: RequestState) {
        self.lock().insert(id, state);
    }

    fn finish(&self, id: Uuid) {
        self.lock().remove(&id);
    }

    fn get(&self, id: Uuid) -> Option<RequestState> {
        self.lock().get(&id).copied()
    }
}

/// Cloneable handle for submitting messages to a running bridge
#[derive(Clone)]
pub struct BridgeHandle {
    queue: mpsc::UnboundedSender<Submission>,
    events: broadcast::Sender<CompanionEvent>,
    session: SessionContext,
    requests: RequestTable,
}

impl BridgeHandle {
    /// Queue a player message; blank input is ignored
    pub fn submit(&self, message: &str) -> Option<RequestTicket> {
        if message.trim().is_empty() {
            return None;
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (reply, outcome) = oneshot::channel();

        let submission = Submission {
            id,
            message: message.to_string(),
            cancel: cancel.clone(),
            reply,
        };
        self.requests.set(id, RequestState::Queued);
        if self.queue.send(submission).is_err() {
            self.requests.finish(id);
            warn!("Companion worker has stopped; message dropped");
            return None;
        }

        debug!(request_id = %id, "Queued companion message");
        Some(RequestTicket {
            id,
            cancel,
            outcome,
        })
    }

    /// Register for request lifecycle events
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.events.subscribe())
    }

    /// Conversation store the worker records into
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// State of a submitted request; `None` once it has finished
    pub fn request_state(&self, id: Uuid) -> Option<RequestState> {
        self.requests.get(id)
    }
}

/// A queued request that can be cancelled or awaited
pub struct RequestTicket {
    id: Uuid,
    cancel: CancellationToken,
    outcome: oneshot::Receiver<ReplyOutcome>,
}

impl RequestTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abandon the request; a `RequestCompleted` event still follows
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the request to finish
    pub async fn outcome(self) -> Result<ReplyOutcome, DomainError> {
        self.outcome
            .await
            .map_err(|_| DomainError::ChannelClosed("companion worker stopped".to_string()))
    }
}

impl CompanionBridge {
    /// Start the worker (runs in background until every handle is dropped)
    pub fn start(self) -> (BridgeHandle, JoinHandle<()>) {
        let (queue, rx) = mpsc::unbounded_channel();
        let requests = RequestTable::default();
        let handle = BridgeHandle {
            queue,
            events: self.event_sender(),
            session: self.session().clone(),
            requests: requests.clone(),
        };
        let task = tokio::spawn(async move {
            self.run(rx, requests).await;
        });
        (handle, task)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<Submission>, requests: RequestTable) {
        info!(model = %self.config().model, "Companion worker started");

        while let Some(submission) = rx.recv().await {
            requests.set(submission.id, RequestState::Running);
            let outcome = self
                .send_with_id(submission.id, &submission.message, &submission.cancel)
                .await;
            // Finished before the ticket resolves, so awaiting a ticket means it is gone
            requests.finish(submission.id);
            if let Some(outcome) = outcome {
                // The ticket may have been dropped; that is not an error
                let _ = submission.reply.send(outcome);
            }
        }

        info!("Companion worker stopped");
    }
}
