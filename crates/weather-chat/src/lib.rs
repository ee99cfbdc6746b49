//! A terminal client for chatting with a weather agent.
//!
//! The crate includes a CLI tool for using in the terminal. The pieces it
//! is built from are exported so other front ends can reuse them.

#![deny(missing_docs)]

pub mod render;

/// Prompts offered while the conversation is empty.
pub const SUGGESTED_QUERIES: [&str; 6] = [
    "What's the weather in London?",
    "Will it rain tomorrow in New York?",
    "Weather forecast for Paris",
    "Temperature in Tokyo today",
    "Is it sunny in Mumbai?",
    "Weather conditions in Sydney",
];

/// Returns the suggested query numbered `input`, counting from 1.
pub fn pick_suggestion(input: &str) -> Option<&'static str> {
    let index = input.trim().parse::<usize>().ok()?;
    SUGGESTED_QUERIES.get(index.checked_sub(1)?).copied()
}

/// Re-exports of [`weather_chat_core`] crate.
pub mod core {
    pub use weather_chat_core::*;
}
