use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use pin_project_lite::pin_project;
use reqwest::Response;
use weather_chat_transport::{ChunkStream, ErrorKind};

use crate::Error;

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextChunk = Result<(Option<Bytes>, Response), Error>;

pin_project! {
    /// The body of an accepted Mastra stream request.
    pub struct HttpChunkStream {
        next_chunk_fut: Option<PinnedFuture<NextChunk>>,
    }
}

impl HttpChunkStream {
    #[inline]
    pub(crate) fn from_response(response: Response) -> Self {
        Self {
            next_chunk_fut: Some(Box::pin(next_chunk(response))),
        }
    }
}

impl ChunkStream for HttpChunkStream {
    type Error = Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.project();
        let Some(next_chunk_fut) = this.next_chunk_fut else {
            return Poll::Ready(Ok(None));
        };
        match ready!(next_chunk_fut.as_mut().poll(cx)) {
            Ok((Some(chunk), response)) => {
                // The response is handed back so the next read owns it.
                *this.next_chunk_fut = Some(Box::pin(next_chunk(response)));
                Poll::Ready(Ok(Some(chunk)))
            }
            Ok((None, _)) => {
                *this.next_chunk_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_chunk_fut = None;
                Poll::Ready(Err(err))
            }
        }
    }
}

async fn next_chunk(mut response: Response) -> NextChunk {
    match response.chunk().await {
        Ok(chunk) => {
            if let Some(chunk) = &chunk {
                trace!("got {} bytes", chunk.len());
            }
            Ok((chunk, response))
        }
        Err(err) => Err(Error::new(format!("{err}"), ErrorKind::Interrupted)),
    }
}
