use crate::frame::DEFAULT_MAX_LINE_LEN;

/// Settings for each [`StreamSession`](crate::StreamSession).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionConfig {
    pub(crate) max_line_len: usize,
    pub(crate) connect_failure_text: String,
    pub(crate) stream_failure_text: String,
}

impl SessionConfig {
    /// Sets the longest line, in bytes, the session buffers before it
    /// gives up on the stream.
    #[inline]
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Sets the text shown when the request is refused before any reply
    /// arrived.
    #[inline]
    pub fn with_connect_failure_text<S: Into<String>>(
        mut self,
        text: S,
    ) -> Self {
        self.connect_failure_text = text.into();
        self
    }

    /// Sets the text shown when the reply breaks off before any text
    /// arrived.
    #[inline]
    pub fn with_stream_failure_text<S: Into<String>>(
        mut self,
        text: S,
    ) -> Self {
        self.stream_failure_text = text.into();
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            connect_failure_text:
                "Sorry, I'm having trouble connecting. Please try again."
                    .to_owned(),
            stream_failure_text: "Sorry, I encountered an error.".to_owned(),
        }
    }
}
