use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde::Serialize;
use weather_chat_transport::Role;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a message within the process.
///
/// Ids are handed out in creation order, so a later message always has a
/// greater id than an earlier one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
pub struct MessageId(u64);

impl MessageId {
    #[inline]
    fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// A message in the conversation.
///
/// The content of a message is append-only while it is streaming. Once
/// settled, a message never streams again and its content is frozen.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    streaming: bool,
    error: bool,
    created_at: DateTime<Local>,
}

/// A change applied to a single message in place.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Appends a text fragment. Ignored once the message is settled.
    AppendText(String),
    /// Marks the message as no longer streaming.
    MarkSettled,
    /// Settles the message as failed. If nothing was received yet, the
    /// given text becomes the content and the error flag is raised;
    /// otherwise the partial content is kept as is.
    MarkError(String),
}

impl Message {
    /// Creates a settled user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, text.into(), false)
    }

    /// Creates an empty, streaming assistant message that will receive
    /// the reply.
    #[inline]
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, String::new(), true)
    }

    fn new(role: Role, content: String, streaming: bool) -> Self {
        Self {
            id: MessageId::next(),
            role,
            content,
            streaming,
            error: false,
            created_at: Local::now(),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns who wrote this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text received so far.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns `true` while the reply is still arriving.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Returns `true` if the content is a failure notice rather than a
    /// reply.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Returns when this message was created.
    #[inline]
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Applies `mutation`, returning whether the message changed.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::AppendText(text) => {
                if !self.streaming {
                    warn!("dropping text for settled message {}", self.id);
                    return false;
                }
                if text.is_empty() {
                    return false;
                }
                self.content.push_str(&text);
                true
            }
            Mutation::MarkSettled => {
                std::mem::replace(&mut self.streaming, false)
            }
            Mutation::MarkError(text) => {
                if !self.streaming {
                    return false;
                }
                self.streaming = false;
                if self.content.is_empty() {
                    self.content = text;
                    self.error = true;
                }
                true
            }
        }
    }
}
