//! Upstream collaborators of the content resolver

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_LOCALE;
use crate::error::UpstreamError;

pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

// =============================================================================
// Upstream Records
// =============================================================================

/// Text keyed by locale, e.g. `{"en": "Free coffee", "es": "Café gratis"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), text.into());
        Self(map)
    }

    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.0.insert(locale.into(), text.into());
        self
    }

    /// Text in `locale`, falling back to the default locale, then to any
    /// available translation.
    pub fn pick(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .or_else(|| self.0.get(DEFAULT_LOCALE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|text| text.trim().is_empty())
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::new(DEFAULT_LOCALE, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    BuyOneGetOne,
    FreeItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: DiscountType,
    #[serde(default)]
    pub value: f64,
    /// ISO 4217 code for fixed amounts
    #[serde(default)]
    pub currency: Option<String>,
}

impl Discount {
    pub fn percentage(value: f64) -> Self {
        Self {
            kind: DiscountType::Percentage,
            value,
            currency: None,
        }
    }

    pub fn fixed(value: f64, currency: impl Into<String>) -> Self {
        Self {
            kind: DiscountType::FixedAmount,
            value,
            currency: Some(currency.into()),
        }
    }

    /// Printed discount line
    pub fn label(&self) -> String {
        match self.kind {
            DiscountType::Percentage if self.value.fract() == 0.0 => {
                format!("{:.0}% off", self.value)
            }
            DiscountType::Percentage => format!("{}% off", self.value),
            DiscountType::FixedAmount => {
                let amount = format!("{:.2}", self.value);
                match self.currency.as_deref() {
                    Some("EUR") => format!("\u{20ac}{amount} off"),
                    Some("USD") => format!("${amount} off"),
                    Some("GBP") => format!("\u{a3}{amount} off"),
                    Some(code) => format!("{amount} {code} off"),
                    None => format!("{amount} off"),
                }
            }
            DiscountType::BuyOneGetOne => "Buy one, get one free".to_string(),
            DiscountType::FreeItem => "Free item".to_string(),
        }
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Voucher record as returned by the voucher directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherSummary {
    pub id: String,
    pub provider_id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub discount: Discount,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub business_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCode {
    pub short_code: String,
    pub checksum: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One entry of a batch QR payload request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrRequest {
    /// Caller-chosen key the payload is returned under
    pub key: String,
    pub voucher_id: String,
    pub short_code: String,
}

// =============================================================================
// Collaborator Traits
// =============================================================================

#[async_trait]
pub trait VoucherDirectory: Send + Sync {
    /// Vouchers keyed by id. Unknown ids are simply absent from the map.
    async fn get_vouchers_by_ids(
        &self,
        ids: &[String],
    ) -> UpstreamResult<HashMap<String, VoucherSummary>>;
}

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn get_provider(&self, id: &str) -> UpstreamResult<Provider>;
}

#[async_trait]
pub trait CodeService: Send + Sync {
    async fn generate_short_code(&self, voucher_id: &str) -> UpstreamResult<ShortCode>;

    /// QR payloads keyed by `QrRequest::key`
    async fn generate_batch_qr_payloads(
        &self,
        requests: &[QrRequest],
    ) -> UpstreamResult<HashMap<String, String>>;
}

/// Fetches image bytes for IMAGE and AD placements
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> UpstreamResult<Vec<u8>>;
}

/// The upstream services a generation run talks to
#[derive(Clone)]
pub struct ContentServices {
    pub vouchers: Arc<dyn VoucherDirectory>,
    pub providers: Arc<dyn ProviderDirectory>,
    pub codes: Arc<dyn CodeService>,
    pub assets: Arc<dyn AssetFetcher>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_fallback_order() {
        let text = LocalizedText::new("es", "Café gratis").with("en", "Free coffee");
        assert_eq!(text.pick("es"), Some("Café gratis"));
        assert_eq!(text.pick("fr"), Some("Free coffee"));

        let only_german = LocalizedText::new("de", "Gratis Kaffee");
        assert_eq!(only_german.pick("fr"), Some("Gratis Kaffee"));
        assert_eq!(LocalizedText::default().pick("en"), None);
    }

    #[test]
    fn discount_labels() {
        assert_eq!(Discount::percentage(20.0).label(), "20% off");
        assert_eq!(Discount::percentage(12.5).label(), "12.5% off");
        assert_eq!(Discount::fixed(5.0, "EUR").label(), "\u{20ac}5.00 off");
        assert_eq!(Discount::fixed(3.0, "CHF").label(), "3.00 CHF off");
        let bogo = Discount {
            kind: DiscountType::BuyOneGetOne,
            value: 0.0,
            currency: None,
        };
        assert_eq!(bogo.label(), "Buy one, get one free");
    }

    #[test]
    fn voucher_summary_from_json() {
        let summary: VoucherSummary = serde_json::from_str(
            r#"{
                "id": "v-1",
                "provider_id": "p-1",
                "title": {"en": "Free coffee", "es": "Café gratis"},
                "discount": {"type": "PERCENTAGE", "value": 15}
            }"#,
        )
        .unwrap();
        assert_eq!(summary.title.pick("es"), Some("Café gratis"));
        assert!(summary.description.is_empty());
        assert_eq!(summary.discount.label(), "15% off");
    }
}
