//! Turning records into application events.

use serde::Deserialize;
use serde_json::Value;

use crate::frame::FramedRecord;

/// An application-level event of a reply stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StreamEvent {
    /// A fragment of reply text.
    Delta(String),
    /// The server announced the end of the reply.
    Done,
    /// A data payload that carried nothing usable.
    Unparseable(String),
}

// The envelope is the chunk format of OpenAI-compatible chat completion
// streams. Every field is optional so that role-only or finish chunks
// still parse.

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Classifies a record.
///
/// Returns `None` for records that are not events at all: non-data lines
/// and envelopes without any text in them. This never fails; a payload
/// that is neither a valid envelope nor plausible plain text comes back
/// as [`StreamEvent::Unparseable`].
pub fn interpret_record(record: FramedRecord) -> Option<StreamEvent> {
    let payload = match record {
        FramedRecord::Sentinel => return Some(StreamEvent::Done),
        FramedRecord::Ignored(_) => return None,
        FramedRecord::Data(payload) => payload,
    };

    match serde_json::from_str::<Value>(&payload) {
        Ok(value) => {
            let envelope = serde_json::from_value::<Envelope>(value).ok()?;
            let content = envelope.choices.into_iter().next()?.delta?.content?;
            if content.is_empty() {
                return None;
            }
            Some(StreamEvent::Delta(content))
        }
        // Some servers send bare text instead of the envelope. Take it
        // as is, unless it looks like a broken envelope.
        Err(_) if !payload.trim().is_empty() && !payload.starts_with('{') => {
            Some(StreamEvent::Delta(payload))
        }
        Err(_) => Some(StreamEvent::Unparseable(payload)),
    }
}
