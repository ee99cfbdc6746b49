use serde::Serialize;
use serde_json::{Map, Value};
use weather_chat_transport::{ChatRequest, ChatTurn};

use crate::MastraConfig;

/// The body of a `POST …/stream` request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest<'a> {
    messages: &'a [ChatTurn],
    run_id: &'a str,
    max_retries: u32,
    max_steps: u32,
    temperature: f32,
    top_p: f32,
    runtime_context: Map<String, Value>,
    thread_id: &'a str,
    resource_id: &'a str,
}

#[inline]
pub fn create_request<'a>(
    req: &'a ChatRequest,
    config: &'a MastraConfig,
) -> StreamRequest<'a> {
    StreamRequest {
        messages: &req.messages,
        run_id: &config.run_id,
        max_retries: req.params.max_retries,
        max_steps: req.params.max_steps,
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        runtime_context: Map::new(),
        thread_id: &req.thread_id,
        resource_id: &config.resource_id,
    }
}
