//! Fixed voucher and provider catalog
//!
//! Serves offline rendering and tests. Loaded from JSON of the form
//! `{"vouchers": [...], "providers": [...]}`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, UpstreamError};

use super::{Provider, ProviderDirectory, UpstreamResult, VoucherDirectory, VoucherSummary};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub vouchers: Vec<VoucherSummary>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    /// When set, every lookup fails with this message
    #[serde(skip)]
    failure: Option<String>,
    #[serde(skip)]
    voucher_batches: AtomicUsize,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn with_voucher(mut self, voucher: VoucherSummary) -> Self {
        self.vouchers.push(voucher);
        self
    }

    pub fn with_provider(mut self, id: impl Into<String>, business_name: impl Into<String>) -> Self {
        self.providers.push(Provider {
            id: id.into(),
            business_name: business_name.into(),
        });
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of `get_vouchers_by_ids` calls served so far
    pub fn voucher_batches(&self) -> usize {
        self.voucher_batches.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> UpstreamResult<()> {
        match &self.failure {
            Some(message) => Err(UpstreamError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VoucherDirectory for StaticCatalog {
    async fn get_vouchers_by_ids(
        &self,
        ids: &[String],
    ) -> UpstreamResult<HashMap<String, VoucherSummary>> {
        self.voucher_batches.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(self
            .vouchers
            .iter()
            .filter(|voucher| ids.contains(&voucher.id))
            .map(|voucher| (voucher.id.clone(), voucher.clone()))
            .collect())
    }
}

#[async_trait]
impl ProviderDirectory for StaticCatalog {
    async fn get_provider(&self, id: &str) -> UpstreamResult<Provider> {
        self.check_failure()?;
        self.providers
            .iter()
            .find(|provider| provider.id == id)
            .cloned()
            .ok_or_else(|| UpstreamError::new(format!("Provider {id} not found")))
    }
}
