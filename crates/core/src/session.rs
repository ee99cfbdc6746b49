//! Ingesting one streamed reply.

#[cfg(test)]
mod tests;

use std::fmt;
use std::future::poll_fn;
use std::ops::ControlFlow;
use std::pin::pin;
use std::sync::Arc;

use tokio::select;
use tokio::sync::watch;
use weather_chat_transport::ChunkStream;

use crate::config::SessionConfig;
use crate::conversation::ConversationStore;
use crate::event::{StreamEvent, interpret_record};
use crate::frame::FrameDecoder;
use crate::message::{MessageId, Mutation};

/// Why a session failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request was refused or never delivered; no body arrived.
    TransportRejected,
    /// Reading the body failed after it had started.
    StreamRead,
    /// A single line of the body exceeded the configured bound.
    FrameTooLarge,
}

/// The lifecycle stage of a session.
///
/// `Completed`, `Failed` and `Cancelled` are terminal: once a session
/// reaches one of them it never moves again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// The request is out, nothing has arrived yet.
    #[default]
    Opening,
    /// Chunks are arriving.
    Streaming,
    /// The reply ended normally.
    Completed,
    /// The reply could not be received.
    Failed(FailureKind),
    /// The user cancelled the reply.
    Cancelled,
}

impl SessionStatus {
    /// Returns `true` for the terminal stages.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => "opening".fmt(f),
            Self::Streaming => "streaming".fmt(f),
            Self::Completed => "completed".fmt(f),
            Self::Failed(kind) => write!(f, "failed ({kind:?})"),
            Self::Cancelled => "cancelled".fmt(f),
        }
    }
}

/// State shared between a session and its handles.
///
/// Every write to the target message happens while the status is locked,
/// and only while the status is not terminal. A transition can therefore
/// never interleave with a half-applied event.
struct Shared {
    status: watch::Sender<SessionStatus>,
    store: ConversationStore,
    message_id: MessageId,
}

impl Shared {
    #[inline]
    fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Applies `mutation` if the session is still live. Returns `false`
    /// once the session is over.
    fn apply(&self, mutation: Mutation) -> bool {
        let mut live = false;
        self.status.send_if_modified(|status| {
            if status.is_terminal() {
                return false;
            }
            live = true;
            self.store.update(self.message_id, mutation);
            false
        });
        live
    }

    fn start_streaming(&self) {
        self.status.send_if_modified(|status| {
            if *status != SessionStatus::Opening {
                return false;
            }
            *status = SessionStatus::Streaming;
            true
        });
    }

    /// Moves to `terminal` and applies `mutation` in the same step.
    /// Returns `false` if the session was already over.
    fn finish(&self, terminal: SessionStatus, mutation: Mutation) -> bool {
        debug_assert!(terminal.is_terminal());
        let finished = self.status.send_if_modified(|status| {
            if status.is_terminal() {
                return false;
            }
            self.store.update(self.message_id, mutation);
            *status = terminal;
            true
        });
        if finished {
            debug!("{} is {terminal}", self.message_id);
        }
        finished
    }

    #[inline]
    fn fail(&self, kind: FailureKind, text: &str) -> bool {
        self.finish(
            SessionStatus::Failed(kind),
            Mutation::MarkError(text.to_owned()),
        )
    }
}

/// A handle to a running session.
///
/// Handles are cheap to clone. They let the owner watch the session and
/// cancel it.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Returns the id of the message the session writes into.
    #[inline]
    pub fn message_id(&self) -> MessageId {
        self.shared.message_id
    }

    /// Returns the current status.
    #[inline]
    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Returns `true` if the session is over.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Cancels the session.
    ///
    /// When this returns, the message keeps whatever text it had, is no
    /// longer streaming, and will not receive any more text, even if more
    /// of the body is already buffered. The in-flight read is abandoned
    /// the next time the session wakes up.
    ///
    /// Cancelling a session that is already over does nothing. Returns
    /// whether this call was the one that ended the session.
    pub fn cancel(&self) -> bool {
        self.shared
            .finish(SessionStatus::Cancelled, Mutation::MarkSettled)
    }

    /// Waits until the session is over and returns how it ended.
    pub async fn finished(&self) -> SessionStatus {
        let mut status_rx = self.shared.status.subscribe();
        match status_rx.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            // The sender lives in `self`, so it can't be closed.
            Err(_) => self.status(),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("message_id", &self.shared.message_id)
            .field("status", &self.status())
            .finish()
    }
}

/// One attempt to stream a reply into a message.
///
/// `F` is the pending `open` call of a transport. Nothing happens until
/// [`run`](Self::run) is awaited, and there is exactly one place where
/// the session waits: for the next chunk (or, before that, for the body
/// to start).
pub struct StreamSession<F> {
    shared: Arc<Shared>,
    open: F,
    config: SessionConfig,
}

impl<F> StreamSession<F> {
    /// Creates a session that streams into the message `message_id` of
    /// `store`, together with a handle to it.
    pub fn new(
        open: F,
        store: ConversationStore,
        message_id: MessageId,
        config: SessionConfig,
    ) -> (Self, SessionHandle) {
        let (status, _) = watch::channel(SessionStatus::Opening);
        let shared = Arc::new(Shared {
            status,
            store,
            message_id,
        });
        let handle = SessionHandle {
            shared: Arc::clone(&shared),
        };
        let session = Self {
            shared,
            open,
            config,
        };
        (session, handle)
    }

    /// Drives the session to a terminal status and returns it.
    pub async fn run<S>(self) -> SessionStatus
    where
        F: Future<Output = Result<S, S::Error>>,
        S: ChunkStream,
    {
        let Self {
            shared,
            open,
            config,
        } = self;
        let mut status_rx = shared.status.subscribe();

        trace!("opening");
        let opened = select! {
            biased;

            _ = cancelled(&mut status_rx) => None,
            opened = open => Some(opened),
        };
        let stream = match opened {
            Some(Ok(stream)) => stream,
            Some(Err(err)) => {
                warn!("request failed: {err}");
                shared.fail(
                    FailureKind::TransportRejected,
                    &config.connect_failure_text,
                );
                return shared.status();
            }
            None => return shared.status(),
        };

        let mut stream = pin!(stream);
        let mut decoder = FrameDecoder::new(config.max_line_len);
        loop {
            let chunk = select! {
                biased;

                _ = cancelled(&mut status_rx) => break,
                chunk = poll_fn(|cx| stream.as_mut().poll_next_chunk(cx)) => {
                    chunk
                }
            };

            match chunk {
                Ok(Some(bytes)) => {
                    trace!("got {} bytes", bytes.len());
                    shared.start_streaming();
                    decoder.push(&bytes);
                    if ingest(&shared, &mut decoder, &config).is_break() {
                        break;
                    }
                }
                Ok(None) => {
                    if let Some(rest) = decoder.finish() {
                        debug!(
                            "dropping {} bytes of unterminated line",
                            rest.len()
                        );
                    }
                    shared.finish(
                        SessionStatus::Completed,
                        Mutation::MarkSettled,
                    );
                    break;
                }
                Err(err) => {
                    warn!("reading reply failed: {err}");
                    shared.fail(
                        FailureKind::StreamRead,
                        &config.stream_failure_text,
                    );
                    break;
                }
            }
        }

        shared.status()
    }
}

/// Applies every complete record in `decoder`, in order. Breaks once the
/// session is over.
fn ingest(
    shared: &Shared,
    decoder: &mut FrameDecoder,
    config: &SessionConfig,
) -> ControlFlow<()> {
    loop {
        let record = match decoder.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => return ControlFlow::Continue(()),
            Err(err) => {
                warn!("{err}");
                shared.fail(
                    FailureKind::FrameTooLarge,
                    &config.stream_failure_text,
                );
                return ControlFlow::Break(());
            }
        };

        let Some(event) = interpret_record(record) else {
            continue;
        };
        trace!("got event: {event:?}");
        match event {
            StreamEvent::Delta(text) => {
                if !shared.apply(Mutation::AppendText(text)) {
                    return ControlFlow::Break(());
                }
            }
            StreamEvent::Done => {
                shared.finish(SessionStatus::Completed, Mutation::MarkSettled);
                return ControlFlow::Break(());
            }
            StreamEvent::Unparseable(payload) => {
                warn!("dropping unparseable payload: {payload:?}");
            }
        }
    }
}

/// Resolves once the session has been cancelled.
async fn cancelled(status_rx: &mut watch::Receiver<SessionStatus>) {
    // The session holds the sender, so the channel stays open.
    let _ = status_rx
        .wait_for(|status| *status == SessionStatus::Cancelled)
        .await;
}
