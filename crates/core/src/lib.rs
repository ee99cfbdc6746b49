//! Incremental ingestion of streamed chat replies.
//!
//! A [`SessionController`] turns each submitted message into a
//! [`StreamSession`]: the request goes out through a
//! [`ChatTransport`](weather_chat_transport::ChatTransport), the body is
//! split into records by a [`FrameDecoder`](frame::FrameDecoder), each
//! record is classified by [`interpret_record`](event::interpret_record),
//! and every text fragment is appended, exactly once and in order, to a
//! placeholder message in the [`ConversationStore`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod controller;
pub mod conversation;
pub mod event;
pub mod frame;
mod message;
mod session;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionControllerBuilder, SubmitError};
pub use conversation::ConversationStore;
pub use message::{Message, MessageId, Mutation};
pub use session::{FailureKind, SessionHandle, SessionStatus, StreamSession};
pub use weather_chat_transport::{ModelParams, Role};
