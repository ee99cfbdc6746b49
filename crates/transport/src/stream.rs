use std::pin::Pin;
use std::task::{self, Poll};

use bytes::Bytes;

use crate::error::TransportError;

/// The body of an accepted request, delivered as raw chunks.
///
/// Chunk boundaries carry no meaning: a chunk may be empty, hold several
/// lines, or end in the middle of a line (or of a UTF-8 sequence).
pub trait ChunkStream: Send + 'static {
    /// The error type that may be returned while reading.
    type Error: TransportError;

    /// Attempts to pull out the next chunk of the body.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means that no chunk is available yet. The
    ///   current task will be notified when one may be ready.
    /// - `Poll::Ready(Ok(Some(chunk)))` delivers the next chunk in
    ///   arrival order.
    /// - `Poll::Ready(Ok(None))` means the body has been closed by the
    ///   remote side.
    /// - `Poll::Ready(Err(error))` means reading the body failed.
    ///
    /// Calling this method after completion should always return `None`.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>>;
}
