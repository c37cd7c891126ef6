use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse};

/// Bounds every oracle call of the wrapped provider.
///
/// The capability methods use their default implementations, so the bound
/// applies to classification, summary and fact-check alike.
pub struct TimeoutProvider {
    inner: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl LlmProvider for TimeoutProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        tokio::time::timeout(self.timeout, self.inner.generate(request))
            .await
            .with_context(|| format!("LLM call timed out after {:?}", self.timeout))?
    }
}
