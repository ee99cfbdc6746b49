use crate::error::TransportError;
use crate::request::ChatRequest;
use crate::stream::ChunkStream;

/// A type that delivers chat requests to a remote agent.
///
/// Once the transport is created, it should behave like a stateless
/// object. It can still have internal state (a connection pool, say),
/// but callers should not rely on it.
///
/// There is no explicit cancel method. Dropping the future returned by
/// [`ChatTransport::open`], or the stream it resolved to, tells the
/// transport to abandon the request.
pub trait ChatTransport: Send + Sync {
    /// The error type that may be returned by the transport.
    type Error: TransportError;

    /// The body stream type for this transport.
    type Stream: ChunkStream<Error = Self::Error>;

    /// Sends a request and waits until the body starts.
    ///
    /// An error resolved by this future means the request never produced
    /// a body (it was rejected or could not be delivered). Failures that
    /// happen later are reported by the stream instead.
    fn open(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static;
}
