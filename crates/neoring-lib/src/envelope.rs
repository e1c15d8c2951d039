//! Action envelopes: classified, fixed-size units of work.
//!
//! An [`Envelope`] is a plain value: a resolved [`ActionKind`], an inline
//! payload buffer, and the event's reported length. The listener builds one
//! per inbound event, copies it into a queue slot, and reuses its own copy.
//! Workers consume their copy and clear it. Nothing is heap-allocated.

use crate::handlers::{self, Handler, HandlerContext};
use crate::queue::QueueLane;
use crate::transport::Inbound;

/// Payload buffer capacity, in bytes.
pub const SUBSCRIPTION_DATA_LEN: usize = 100;

/// Which handler an envelope resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Report the current color.
    Query,
    /// Set or fade to a new color.
    Command,
}

impl ActionKind {
    pub fn handler(self) -> Handler {
        match self {
            ActionKind::Query => handlers::get_color,
            ActionKind::Command => handlers::set_color,
        }
    }

    /// Queries are cheap reads and go to the fast lane; commands to the slow lane.
    pub fn lane(self) -> QueueLane {
        match self {
            ActionKind::Query => QueueLane::Fast,
            ActionKind::Command => QueueLane::Slow,
        }
    }
}

/// A unit of work. Either empty (`action == None`, `length == 0`, zeroed
/// buffer) or populated (`action == Some(_)`).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    action: Option<ActionKind>,
    data: [u8; SUBSCRIPTION_DATA_LEN],
    length: u16,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::empty()
    }
}

impl Envelope {
    pub const fn empty() -> Self {
        Envelope {
            action: None,
            data: [0; SUBSCRIPTION_DATA_LEN],
            length: 0,
        }
    }

    /// Build a populated envelope, or an empty one if `kind` is unresolved
    /// or the payload does not fit.
    pub fn new(kind: Option<ActionKind>, payload: &[u8]) -> Self {
        let mut env = Self::empty();
        env.populate(kind, payload);
        env
    }

    pub fn clear(&mut self) {
        self.action = None;
        self.data.fill(0);
        self.length = 0;
    }

    /// Clear, then fill from `payload`.
    ///
    /// Oversized payloads leave the envelope empty rather than acting on
    /// partial data. At most `SUBSCRIPTION_DATA_LEN - 1` bytes are copied so
    /// the buffer always ends in a NUL; `length` is the event's length.
    pub fn populate(&mut self, kind: Option<ActionKind>, payload: &[u8]) {
        self.clear();
        let Some(kind) = kind else {
            return;
        };
        if payload.len() > SUBSCRIPTION_DATA_LEN {
            return;
        }
        let copied = payload.len().min(SUBSCRIPTION_DATA_LEN - 1);
        self.data[..copied].copy_from_slice(&payload[..copied]);
        self.length = payload.len() as u16;
        self.action = Some(kind);
    }

    pub fn action(&self) -> Option<ActionKind> {
        self.action
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }

    pub fn len(&self) -> u16 {
        self.length
    }

    /// The copied payload bytes.
    pub fn payload(&self) -> &[u8] {
        let end = (self.length as usize).min(SUBSCRIPTION_DATA_LEN - 1);
        &self.data[..end]
    }

    /// The whole buffer, including trailing zeroes.
    pub fn buffer(&self) -> &[u8; SUBSCRIPTION_DATA_LEN] {
        &self.data
    }

    /// Run the resolved handler. Empty envelopes do nothing.
    pub fn dispatch(&self, ctx: &HandlerContext) {
        if let Some(kind) = self.action {
            (kind.handler())(ctx, self.payload(), self.length);
        }
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("action", &self.action)
            .field("length", &self.length)
            .field("payload", &String::from_utf8_lossy(self.payload()))
            .finish()
    }
}

/// Fixed topic → action mapping.
#[derive(Debug, Clone)]
pub struct Router {
    query_topic: String,
    command_topic: String,
}

impl Router {
    pub fn new(query_topic: impl Into<String>, command_topic: impl Into<String>) -> Self {
        Router {
            query_topic: query_topic.into(),
            command_topic: command_topic.into(),
        }
    }

    pub fn topics(&self) -> [&str; 2] {
        [&self.query_topic, &self.command_topic]
    }

    pub fn classify(&self, event: &Inbound) -> Option<ActionKind> {
        if event.topic == self.query_topic {
            Some(ActionKind::Query)
        } else if event.topic == self.command_topic {
            Some(ActionKind::Command)
        } else {
            None
        }
    }

    pub fn build_envelope(&self, event: &Inbound) -> Envelope {
        Envelope::new(self.classify(event), &event.payload)
    }
}
