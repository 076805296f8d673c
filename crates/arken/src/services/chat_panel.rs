//! Chat Panel - transcript view and input box
//!
//! Holds what the chat window shows. The player's own line is echoed as soon
//! as it is submitted; everything the companion says arrives through the
//! bridge's events, which the panel drains once per frame. If the panel falls
//! so far behind that events were dropped, it rebuilds the transcript from the
//! conversation store instead.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::Speaker;
use crate::services::companion::{CompanionEvent, EventSubscription};
use crate::services::companion_worker::{BridgeHandle, RequestState, RequestTicket};

pub const THINKING_LINE: &str = "Companion is thinking...";

/// Vertical scroll position over the transcript, in lines from the bottom
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollView {
    lines_from_bottom: usize,
}

impl ScrollView {
    pub fn scroll_up(&mut self, lines: usize, content_len: usize) {
        self.lines_from_bottom = (self.lines_from_bottom + lines).min(content_len);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.lines_from_bottom = self.lines_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.lines_from_bottom = 0;
    }

    pub fn is_at_bottom(&self) -> bool {
        self.lines_from_bottom == 0
    }

    pub fn lines_from_bottom(&self) -> usize {
        self.lines_from_bottom
    }
}

struct PendingRequest {
    id: Uuid,
    message: String,
    cancel: CancellationToken,
}

/// Chat window state
#[derive(Default)]
pub struct ChatPanel {
    lines: Vec<String>,
    input: String,
    scroll: ScrollView,
    bridge: Option<BridgeHandle>,
    events: Option<EventSubscription>,
    /// Submission order
    in_flight: Vec<PendingRequest>,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to a running bridge, replacing any previous one
    pub fn attach(&mut self, bridge: BridgeHandle) {
        if self.bridge.is_some() {
            self.detach();
        }
        self.events = Some(bridge.subscribe());
        self.bridge = Some(bridge);
        debug!("Chat panel attached");
    }

    /// Drop the bridge and its event subscription
    pub fn detach(&mut self) {
        self.events = None;
        self.bridge = None;
        self.in_flight.clear();
        debug!("Chat panel detached");
    }

    pub fn is_attached(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines visible in a window `rows` tall at the current scroll position
    pub fn visible_lines(&self, rows: usize) -> &[String] {
        let end = self.lines.len().saturating_sub(self.scroll.lines_from_bottom());
        let start = end.saturating_sub(rows);
        &self.lines[start..end]
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn scroll(&self) -> &ScrollView {
        &self.scroll
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll.scroll_up(lines, self.lines.len());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll.scroll_down(lines);
    }

    /// Whether a request submitted from this panel is still running
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Send the input box contents
    ///
    /// Blank input does nothing. Without a bridge the input is kept and a
    /// warning is logged.
    pub fn submit(&mut self) -> Option<RequestTicket> {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return None;
        }

        let Some(bridge) = &self.bridge else {
            warn!("Chat panel has no companion bridge; message not sent");
            return None;
        };

        let ticket = bridge.submit(&message);
        self.input.clear();
        self.push_line(format!("{}: {}", Speaker::Player, message));

        match ticket {
            Some(ticket) => {
                self.in_flight.push(PendingRequest {
                    id: ticket.id(),
                    message,
                    cancel: ticket.cancellation_token(),
                });
                Some(ticket)
            }
            None => {
                warn!("Companion bridge rejected the message");
                None
            }
        }
    }

    /// Abandon every request this panel is waiting on
    pub fn cancel_pending(&mut self) {
        for request in &self.in_flight {
            request.cancel.cancel();
        }
    }

    /// Apply all events queued since the last poll
    pub fn poll_events(&mut self) -> usize {
        let Some(subscription) = self.events.as_mut() else {
            return 0;
        };
        let events = subscription.drain();
        let lagged = subscription.take_lagged();

        let count = events.len();
        if lagged > 0 {
            self.resync(lagged, events);
        } else {
            for event in events {
                self.apply(event);
            }
        }
        count
    }

    /// Wait for one event and apply it; `None` when detached or the bridge stopped
    pub async fn next_event(&mut self) -> Option<CompanionEvent> {
        let subscription = self.events.as_mut()?;
        let event = subscription.recv().await?;
        let lagged = subscription.take_lagged();

        if lagged > 0 {
            self.resync(lagged, vec![event.clone()]);
        } else {
            self.apply(event.clone());
        }
        Some(event)
    }

    /// Empty the transcript view
    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll.scroll_to_bottom();
    }

    fn apply(&mut self, event: CompanionEvent) {
        match event {
            CompanionEvent::RequestStarted { .. } => {
                self.push_line(THINKING_LINE.to_string());
            }
            CompanionEvent::ReplyReceived { text, .. } => {
                self.push_line(format!("{}: {}", Speaker::Companion, text));
            }
            CompanionEvent::RequestCompleted { id } => {
                self.in_flight.retain(|request| request.id != id);
                self.scroll.scroll_to_bottom();
            }
        }
    }

    /// Rebuild the transcript after missed events
    ///
    /// The conversation store holds every line the bridge recorded. Requests
    /// it has finished are dropped; queued ones keep their echoed line.
    /// `received` is only used for completions, since the store already
    /// holds any reply it carries.
    fn resync(&mut self, lagged: u64, received: Vec<CompanionEvent>) {
        for event in received {
            if let CompanionEvent::RequestCompleted { id } = event {
                self.in_flight.retain(|request| request.id != id);
            }
        }
        let Some(bridge) = &self.bridge else {
            return;
        };

        let mut running = false;
        let mut queued = Vec::new();
        self.in_flight.retain(|request| match bridge.request_state(request.id) {
            Some(RequestState::Running) => {
                running = true;
                true
            }
            Some(RequestState::Queued) => {
                queued.push(format!("{}: {}", Speaker::Player, request.message));
                true
            }
            None => false,
        });

        let mut lines: Vec<String> = bridge
            .session()
            .snapshot()
            .iter()
            .map(|entry| entry.transcript_line())
            .collect();
        if running {
            lines.push(THINKING_LINE.to_string());
        }
        lines.extend(queued);

        warn!(
            lagged,
            lines = lines.len(),
            in_flight = self.in_flight.len(),
            "Chat panel missed events; transcript rebuilt from the conversation store"
        );
        self.lines = lines;
        self.scroll.scroll_to_bottom();
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(line);
        self.scroll.scroll_to_bottom();
    }
}
