use std::fmt::Debug;

/// Builder for [`MastraConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MastraConfigBuilder {
    endpoint: String,
    resource_id: Option<String>,
    run_id: Option<String>,
    api_key: Option<String>,
    headers: Vec<(String, String)>,
}

impl MastraConfigBuilder {
    /// Creates a builder for the agent stream endpoint at `endpoint`,
    /// e.g. `https://host/api/agents/weatherAgent/stream`.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource_id: None,
            run_id: None,
            api_key: None,
            headers: vec![(
                "x-mastra-dev-playground".to_owned(),
                "true".to_owned(),
            )],
        }
    }

    /// Sets the resource id the agent files the thread under.
    #[inline]
    pub fn with_resource_id<S: Into<String>>(mut self, resource_id: S) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Sets the run id reported to the agent.
    #[inline]
    pub fn with_run_id<S: Into<String>>(mut self, run_id: S) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Sets a bearer token for deployments that require one.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Adds an extra header to every request.
    #[inline]
    pub fn with_header<K: Into<String>, V: Into<String>>(
        mut self,
        name: K,
        value: V,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> MastraConfig {
        MastraConfig {
            endpoint: self.endpoint,
            resource_id: self
                .resource_id
                .unwrap_or_else(|| "weatherAgent".to_string()),
            run_id: self.run_id.unwrap_or_else(|| "weatherAgent".to_string()),
            api_key: self.api_key,
            headers: self.headers,
        }
    }
}

impl Debug for MastraConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastraConfigBuilder")
            .field("endpoint", &self.endpoint)
            .field("resource_id", &self.resource_id)
            .field("run_id", &self.run_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("headers", &self.headers)
            .finish()
    }
}

/// Configuration for the Mastra agent transport.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MastraConfig {
    pub(crate) endpoint: String,
    pub(crate) resource_id: String,
    pub(crate) run_id: String,
    pub(crate) api_key: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
}

impl Debug for MastraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastraConfig")
            .field("endpoint", &self.endpoint)
            .field("resource_id", &self.resource_id)
            .field("run_id", &self.run_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("headers", &self.headers)
            .finish()
    }
}
