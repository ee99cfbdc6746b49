use bytes::Bytes;
use tokio::sync::mpsc;

/// One step of a preset body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PresetChunk {
    /// Delivers the bytes as one chunk.
    Data(Bytes),
    /// Fails the read with an interrupted error.
    Fail,
    /// Never resolves, like a server that stopped talking.
    Stall,
}

impl PresetChunk {
    /// Creates a data chunk from a static string.
    #[inline]
    pub fn text(text: &'static str) -> Self {
        Self::Data(Bytes::from_static(text.as_bytes()))
    }
}

#[derive(Debug)]
pub(crate) enum Body {
    Chunks(Vec<PresetChunk>),
    Manual(mpsc::UnboundedReceiver<PresetChunk>),
}

/// The preset response to one `open` call.
#[derive(Debug)]
pub struct PresetResponse {
    pub(crate) body: Body,
    pub(crate) rejection: Option<u16>,
}

impl PresetResponse {
    /// Creates a response that delivers the specified chunks and then
    /// closes the body.
    #[inline]
    pub fn with_chunks(chunks: impl Into<Vec<PresetChunk>>) -> Self {
        Self {
            body: Body::Chunks(chunks.into()),
            rejection: None,
        }
    }

    /// Creates a response whose request is refused with `status`.
    #[inline]
    pub fn rejected(status: u16) -> Self {
        Self {
            body: Body::Chunks(vec![]),
            rejection: Some(status),
        }
    }

    /// Creates a response whose body is fed by hand through the returned
    /// [`ChunkFeeder`]. The body closes once the feeder is dropped.
    #[inline]
    pub fn manual() -> (Self, ChunkFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let resp = Self {
            body: Body::Manual(rx),
            rejection: None,
        };
        (resp, ChunkFeeder { tx })
    }
}

/// Feeds chunks into a [`PresetResponse::manual`] body.
#[derive(Clone, Debug)]
pub struct ChunkFeeder {
    tx: mpsc::UnboundedSender<PresetChunk>,
}

impl ChunkFeeder {
    /// Pushes a text chunk. Returns `false` if the body was dropped.
    #[inline]
    pub fn send_text(&self, text: &str) -> bool {
        self.send(PresetChunk::Data(Bytes::copy_from_slice(text.as_bytes())))
    }

    /// Pushes an arbitrary chunk. Returns `false` if the body was
    /// dropped.
    #[inline]
    pub fn send(&self, chunk: PresetChunk) -> bool {
        self.tx.send(chunk).is_ok()
    }

    /// Returns `true` if the stream reading this body has been dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
