//! Incremental printing of streamed replies.

use weather_chat_core::Message;

/// Formats the local time a message was created, as `HH:MM`.
#[inline]
pub fn format_time(message: &Message) -> String {
    message.created_at().format("%H:%M").to_string()
}

/// Tracks how much of a growing message has already been printed.
///
/// Streamed content only ever grows at the end, so each call to
/// [`advance`](Self::advance) hands back just the new suffix.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeltaPrinter {
    printed: usize,
}

impl DeltaPrinter {
    /// Creates a printer that has printed nothing yet.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the part of `content` not printed yet and marks all of it
    /// as printed.
    ///
    /// If `content` no longer extends what was printed before (it was
    /// replaced or shrank), the whole text is returned again.
    pub fn advance<'a>(&mut self, content: &'a str) -> &'a str {
        let delta = content.get(self.printed..).unwrap_or(content);
        self.printed = content.len();
        delta
    }

    /// Returns `true` once anything has been printed.
    #[inline]
    pub fn has_printed(&self) -> bool {
        self.printed > 0
    }
}
