//! The contract between the chat core and whatever carries its requests.
//!
//! A transport takes a [`ChatRequest`] and hands back a stream of raw
//! body chunks. The core never looks at sockets, status codes or
//! headers; it only relies on the guarantees spelled out on
//! [`ChatTransport`] and [`ChunkStream`].
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod request;
mod stream;
mod transport;

pub use error::*;
pub use request::*;
pub use stream::*;
pub use transport::*;
