//! A transport for the Mastra agent streaming endpoint.

#[macro_use]
extern crate tracing;

mod config;
mod proto;
mod stream;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, header};
use weather_chat_transport::{
    ChatRequest, ChatTransport, ErrorKind, TransportError,
};

pub use config::{MastraConfig, MastraConfigBuilder};
pub use stream::HttpChunkStream;

/// Error type for [`MastraTransport`].
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

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_status() {
            ErrorKind::Rejected
        } else {
            ErrorKind::Unreachable
        };
        Self::new(format!("{err}"), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl TransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Transport that posts chat requests to a Mastra agent.
#[derive(Clone, Debug)]
pub struct MastraTransport {
    client: Client,
    config: Arc<MastraConfig>,
}

impl MastraTransport {
    /// Creates a new `MastraTransport` with the given configuration.
    #[inline]
    pub fn new(config: MastraConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the endpoint requests are posted to.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl ChatTransport for MastraTransport {
    type Error = Error;
    type Stream = HttpChunkStream;

    fn open(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header(header::ACCEPT, "*/*")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(api_key) = &self.config.api_key {
            builder = builder
                .header(header::AUTHORIZATION, format!("Bearer {api_key}"));
        }
        for (name, value) in &self.config.headers {
            builder = builder.header(name, value);
        }
        let resp_fut = builder.json(&body).send();
        debug!(
            "posting {} turns to {}",
            req.messages.len(),
            self.config.endpoint
        );

        async move {
            let resp = resp_fut
                .await
                .and_then(Response::error_for_status)
                .map_err(Error::from_reqwest)?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                // Agents sometimes omit the header; the body is still
                // line-framed.
                warn!("unexpected content type: {content_type:?}");
            }

            Ok(HttpChunkStream::from_response(resp))
        }
    }
}
