use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Text generated by the remote agent.
    Assistant,
}

/// One prior turn of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The author of this turn.
    pub role: Role,
    /// The complete text of this turn.
    pub content: String,
}

impl ChatTurn {
    /// Creates a user turn.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling and execution parameters forwarded to the remote agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// How many times the agent may retry a failed step on its side.
    pub max_retries: u32,
    /// The maximum number of reasoning or tool steps per reply.
    pub max_steps: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-sampling probability.
    pub top_p: f32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_steps: 5,
            temperature: 0.5,
            top_p: 1.0,
        }
    }
}

/// A request to be sent through a transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The conversation so far, oldest first, ending with the newest
    /// user turn.
    pub messages: Vec<ChatTurn>,
    /// A caller-chosen token correlating requests of one conversation.
    pub thread_id: String,
    /// Model parameters.
    pub params: ModelParams,
}
