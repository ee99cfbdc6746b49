mod builder;

use std::error::Error;
use std::fmt;

use tracing::Instrument;
use weather_chat_transport::{ChatRequest, ChatTransport, ChatTurn, ModelParams};

use crate::config::SessionConfig;
use crate::conversation::ConversationStore;
use crate::message::Message;
use crate::session::{SessionHandle, StreamSession};
pub use builder::SessionControllerBuilder;

/// Why [`SessionController::submit`] refused a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitError {
    /// The text was empty or whitespace only.
    EmptyInput,
    /// A reply is still streaming. Cancel it first.
    Busy,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => "nothing to send".fmt(f),
            Self::Busy => "a reply is still in progress".fmt(f),
        }
    }
}

impl Error for SubmitError {}

/// Runs the request/reply cycle of one conversation.
///
/// At most one session is active at a time. A new message is refused
/// while a reply is still streaming; the old reply is only ever stopped
/// by an explicit [`cancel_active`](Self::cancel_active) or
/// [`clear_conversation`](Self::clear_conversation).
///
/// Dropping the controller cancels the active session.
pub struct SessionController<T> {
    transport: T,
    store: ConversationStore,
    thread_id: String,
    params: ModelParams,
    session_config: SessionConfig,
    active: Option<SessionHandle>,
}

impl<T: ChatTransport> SessionController<T> {
    fn from_builder(builder: SessionControllerBuilder<T>) -> Self {
        let SessionControllerBuilder {
            transport,
            store,
            thread_id,
            params,
            session_config,
        } = builder;
        Self {
            transport,
            store: store.unwrap_or_default(),
            thread_id: thread_id.unwrap_or_else(default_thread_id),
            params,
            session_config,
            active: None,
        }
    }

    /// Sends `text` as a new user message and starts streaming the
    /// reply into a fresh assistant message.
    ///
    /// The reply is received on a task spawned onto the current tokio
    /// runtime, so this must be called from within one.
    pub fn submit(&mut self, text: &str) -> Result<SessionHandle, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        self.release_finished();
        if let Some(active) = &self.active {
            debug!("refusing to send while {} is active", active.message_id());
            return Err(SubmitError::Busy);
        }

        let mut messages = self.store.history();
        messages.push(ChatTurn::user(text));
        let request = ChatRequest {
            messages,
            thread_id: self.thread_id.clone(),
            params: self.params,
        };

        self.store.append(Message::user(text));
        let message_id = self.store.append(Message::placeholder());
        let open = self.transport.open(&request);
        let (session, handle) = StreamSession::new(
            open,
            self.store.clone(),
            message_id,
            self.session_config.clone(),
        );
        tokio::spawn(
            session
                .run()
                .instrument(debug_span!("session", message_id = %message_id)),
        );

        self.active = Some(handle.clone());
        Ok(handle)
    }

    /// Cancels the active session, if any. Returns whether a running
    /// session was stopped.
    pub fn cancel_active(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel()
    }

    /// Cancels the active session and removes every message.
    pub fn clear_conversation(&mut self) {
        self.cancel_active();
        self.store.clear();
    }
}

impl<T> SessionController<T> {
    /// Returns the conversation this controller writes into.
    #[inline]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Returns the thread id sent with every request.
    #[inline]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Returns the session that is still receiving its reply.
    #[inline]
    pub fn active_session(&self) -> Option<&SessionHandle> {
        self.active.as_ref().filter(|active| !active.is_terminal())
    }

    /// Returns `true` while a reply is being received.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.active_session().is_some()
    }

    fn release_finished(&mut self) {
        if self.active.as_ref().is_some_and(SessionHandle::is_terminal) {
            self.active = None;
        }
    }
}

impl<T> Drop for SessionController<T> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
    }
}

impl<T> fmt::Debug for SessionController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("store", &self.store)
            .field("thread_id", &self.thread_id)
            .field("params", &self.params)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

fn default_thread_id() -> String {
    format!("thread-{}", chrono::Local::now().timestamp_millis())
}
