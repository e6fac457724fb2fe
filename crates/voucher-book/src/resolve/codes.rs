//! Local short-code and asset services
//!
//! Short codes are 8 symbols of the Crockford base32 alphabet taken from a
//! SHA-256 digest of `secret:voucher_id:sequence`. QR payloads point at
//! `{base_url}/r/{short_code}`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use crate::error::UpstreamError;

use super::{AssetFetcher, CodeService, QrRequest, ShortCode, UpstreamResult};

/// Crockford base32: no I, L, O or U
const CODE_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const SHORT_CODE_LEN: usize = 8;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

// =============================================================================
// Code Service
// =============================================================================

pub struct LocalCodeService {
    secret: String,
    base_url: String,
    validity: Option<Duration>,
    sequence: AtomicU64,
}

impl LocalCodeService {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            validity: None,
            sequence: AtomicU64::new(0),
        }
    }

    /// Codes expire this long after they are issued
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = Some(validity);
        self
    }

    fn derive_code(&self, voucher_id: &str, sequence: u64) -> String {
        let digest = Sha256::digest(format!("{}:{voucher_id}:{sequence}", self.secret));
        digest
            .iter()
            .take(SHORT_CODE_LEN)
            .map(|byte| char::from(CODE_ALPHABET[usize::from(byte % 32)]))
            .collect()
    }
}

/// Checksum printed next to a short code
pub fn code_checksum(short_code: &str) -> String {
    sha256_hex(short_code.as_bytes())[..4].to_uppercase()
}

/// Whether `code` only uses symbols of the short-code alphabet
pub fn is_valid_short_code(code: &str) -> bool {
    code.len() == SHORT_CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[async_trait]
impl CodeService for LocalCodeService {
    async fn generate_short_code(&self, voucher_id: &str) -> UpstreamResult<ShortCode> {
        if voucher_id.is_empty() {
            return Err(UpstreamError::new("Cannot issue a code for an empty voucher id"));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let short_code = self.derive_code(voucher_id, sequence);
        Ok(ShortCode {
            checksum: code_checksum(&short_code),
            short_code,
            expires_at: self.validity.map(|validity| Utc::now() + validity),
        })
    }

    async fn generate_batch_qr_payloads(
        &self,
        requests: &[QrRequest],
    ) -> UpstreamResult<HashMap<String, String>> {
        requests
            .iter()
            .map(|request| {
                if !is_valid_short_code(&request.short_code) {
                    return Err(UpstreamError::new(format!(
                        "Invalid short code '{}' for voucher {}",
                        request.short_code, request.voucher_id
                    )));
                }
                Ok((
                    request.key.clone(),
                    format!("{}/r/{}", self.base_url, request.short_code),
                ))
            })
            .collect()
    }
}

// =============================================================================
// Asset Fetcher
// =============================================================================

/// Reads assets from local paths and `file://` URLs
#[derive(Debug, Clone, Default)]
pub struct FileAssetFetcher {
    /// Relative paths resolve against this directory
    root: Option<PathBuf>,
}

impl FileAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve_path(&self, url: &str) -> UpstreamResult<PathBuf> {
        if url.contains("://") && !url.starts_with("file://") {
            return Err(UpstreamError::new(format!("Unsupported asset URL: {url}")));
        }
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        })
    }
}

#[async_trait]
impl AssetFetcher for FileAssetFetcher {
    async fn fetch(&self, url: &str) -> UpstreamResult<Vec<u8>> {
        let path = self.resolve_path(url)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| UpstreamError::new(format!("Failed to read {}: {e}", path.display())))
    }
}
