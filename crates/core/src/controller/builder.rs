use weather_chat_transport::{ChatTransport, ModelParams};

use super::SessionController;
use crate::config::SessionConfig;
use crate::conversation::ConversationStore;

/// [`SessionController`] builder.
pub struct SessionControllerBuilder<T> {
    pub(crate) transport: T,
    pub(crate) store: Option<ConversationStore>,
    pub(crate) thread_id: Option<String>,
    pub(crate) params: ModelParams,
    pub(crate) session_config: SessionConfig,
}

impl<T: ChatTransport> SessionControllerBuilder<T> {
    /// Creates a new builder with the specified transport.
    #[inline]
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            store: None,
            thread_id: None,
            params: ModelParams::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Writes into an existing conversation instead of a new one.
    #[inline]
    pub fn with_store(mut self, store: ConversationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the thread id sent with every request. Defaults to one
    /// derived from the current time.
    #[inline]
    pub fn with_thread_id<S: Into<String>>(mut self, thread_id: S) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Sets the model parameters sent with every request.
    #[inline]
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the configuration for every session.
    #[inline]
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the controller.
    #[inline]
    pub fn build(self) -> SessionController<T> {
        SessionController::from_builder(self)
    }
}
