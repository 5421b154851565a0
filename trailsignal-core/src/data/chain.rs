//! Ordered fallback across providers.

use super::provider::{CandleProvider, DataError, FetchResult};
use crate::domain::Timeframe;

/// Tries each provider in turn; the first success wins.
pub struct ProviderChain {
    providers: Vec<Box<dyn CandleProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn CandleProvider>>) -> Self {
        Self { providers }
    }

    pub fn push(&mut self, provider: Box<dyn CandleProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl CandleProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<FetchResult, DataError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            if !provider.is_available() {
                tracing::debug!(provider = provider.name(), "skipping unavailable provider");
                failures.push((provider.name().to_string(), "unavailable".to_string()));
                continue;
            }
            match provider.fetch(symbol, timeframe, limit) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        %symbol,
                        %timeframe,
                        error = %e,
                        "provider failed, trying next"
                    );
                    failures.push((provider.name().to_string(), e.to_string()));
                }
            }
        }
        Err(DataError::AllProvidersFailed(failures))
    }

    fn is_available(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }
}
