//! A local scripted transport for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{Sleep, sleep};
use weather_chat_transport::{
    ChatRequest, ChatTransport, ChunkStream, ErrorKind, TransportError,
};

use preset::Body;
pub use preset::*;

/// Error type for [`TestTransport`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl TransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The body of a scripted response.
pub struct TestChunkStream {
    body: Body,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
    stalled: bool,
    finished: bool,
}

impl TestChunkStream {
    fn next_preset(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<PresetChunk>> {
        match &mut self.body {
            Body::Chunks(chunks) => {
                if chunks.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(chunks.remove(0)))
                }
            }
            Body::Manual(rx) => rx.poll_recv(cx),
        }
    }
}

impl ChunkStream for TestChunkStream {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.get_mut();
        if this.finished {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }
        if this.stalled {
            return Poll::Pending;
        }

        if let Some(delay) = this.delay {
            let sleep =
                this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
        }

        match ready!(this.next_preset(cx)) {
            Some(PresetChunk::Stall) => {
                // Keep stalling on every later poll, too.
                this.stalled = true;
                Poll::Pending
            }
            Some(PresetChunk::Data(bytes)) => {
                this.sleep = None;
                Poll::Ready(Ok(Some(bytes)))
            }
            Some(PresetChunk::Fail) => {
                this.finished = true;
                Poll::Ready(Err(Error::new(
                    "connection reset",
                    ErrorKind::Interrupted,
                )))
            }
            None => {
                this.finished = true;
                Poll::Ready(Ok(None))
            }
        }
    }
}

/// A local scripted transport for testing purpose.
///
/// Every call to `open` consumes the next [`PresetResponse`] in the
/// script, in the order they were added. If the script runs out, the
/// request fails with [`ErrorKind::Other`]. Requests are recorded so
/// tests can check what the caller sent.
///
/// # Note
///
/// This type is not optimized for production use. You should only use
/// it for testing.
#[derive(Clone, Default)]
pub struct TestTransport {
    script: Arc<Mutex<VecDeque<PresetResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    open_delay: Option<Duration>,
    chunk_delay: Option<Duration>,
}

impl TestTransport {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(preset);
    }

    /// Delays resolving every `open` call by `duration`.
    #[inline]
    pub fn set_open_delay(&mut self, duration: Duration) {
        self.open_delay = Some(duration);
    }

    /// Delays every chunk by `duration`.
    #[inline]
    pub fn set_chunk_delay(&mut self, duration: Duration) {
        self.chunk_delay = Some(duration);
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Debug for TestTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestTransport")
            .field("open_delay", &self.open_delay)
            .field("chunk_delay", &self.chunk_delay)
            .finish_non_exhaustive()
    }
}

impl ChatTransport for TestTransport {
    type Error = crate::Error;
    type Stream = TestChunkStream;

    fn open(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());
        let preset = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let chunk_delay = self.chunk_delay;
        let result = match preset {
            None => Err(Error::new("script exhausted", ErrorKind::Other)),
            Some(PresetResponse {
                rejection: Some(status),
                ..
            }) => Err(Error::new(
                format!("HTTP status {status}"),
                ErrorKind::Rejected,
            )),
            Some(PresetResponse { body, .. }) => Ok(TestChunkStream {
                body,
                delay: chunk_delay,
                sleep: None,
                stalled: false,
                finished: false,
            }),
        };

        let open_delay = self.open_delay;
        async move {
            if let Some(delay) = open_delay {
                sleep(delay).await;
            }
            result
        }
    }
}
