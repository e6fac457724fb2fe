use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use log::{debug, warn};

use crate::error::ResolveError;
use crate::types::{ContentKind, PlacementContent};

use super::{ContentServices, Provider, QrRequest, ShortCode, UpstreamResult};

// =============================================================================
// Resolved Content
// =============================================================================

/// Image bytes, or the reason they could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Loaded(Vec<u8>),
    Unavailable { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVoucher {
    pub voucher_id: String,
    pub title: String,
    pub description: Option<String>,
    pub discount: String,
    pub provider_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub short_code: String,
    pub checksum: String,
    /// `None` when the code service returned no payload for this placement
    pub qr_payload: Option<String>,
}

/// Final content of one placement
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBlock {
    Voucher(ResolvedVoucher),
    Image {
        asset: Asset,
        caption: Option<String>,
    },
    Ad {
        title: String,
        description: Option<String>,
        image: Option<Asset>,
    },
    Sponsored {
        title: String,
        description: Option<String>,
        provider_name: String,
    },
}

impl ResolvedBlock {
    pub fn kind(&self) -> ContentKind {
        match self {
            ResolvedBlock::Voucher(_) => ContentKind::Voucher,
            ResolvedBlock::Image { .. } => ContentKind::Image,
            ResolvedBlock::Ad { .. } => ContentKind::Ad,
            ResolvedBlock::Sponsored { .. } => ContentKind::Sponsored,
        }
    }

    /// Whether the block prints anything besides a warning box
    pub fn has_content(&self) -> bool {
        match self {
            ResolvedBlock::Voucher(_) | ResolvedBlock::Sponsored { .. } => true,
            ResolvedBlock::Image { asset, .. } => matches!(asset, Asset::Loaded(_)),
            ResolvedBlock::Ad { title, image, .. } => {
                !title.trim().is_empty() || matches!(image, Some(Asset::Loaded(_)))
            }
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve every placement's content. The output is aligned with `contents`.
///
/// Voucher records, sponsor names and short codes are fetched concurrently,
/// each as a single batch. Image fetches run alongside; a failed fetch
/// becomes [`Asset::Unavailable`], and only fails the run when the book
/// has no voucher and nothing else left to print.
pub async fn resolve_content(
    services: &ContentServices,
    contents: &[PlacementContent],
    locale: &str,
) -> Result<Vec<ResolvedBlock>, ResolveError> {
    if contents.is_empty() {
        return Err(ResolveError::NoVouchers);
    }

    let voucher_slots: Vec<(usize, &str)> = contents
        .iter()
        .enumerate()
        .filter_map(|(index, content)| match content {
            PlacementContent::Voucher { voucher_id } => Some((index, voucher_id.as_str())),
            _ => None,
        })
        .collect();
    let voucher_ids = distinct(voucher_slots.iter().map(|(_, id)| *id));
    let sponsor_ids = distinct(contents.iter().filter_map(|content| match content {
        PlacementContent::Sponsored { provider_id, .. } => Some(provider_id.as_str()),
        _ => None,
    }));
    let asset_urls = distinct(contents.iter().filter_map(|content| match content {
        PlacementContent::Image { image_url, .. } => Some(image_url.as_str()),
        PlacementContent::Ad { image_url, .. } => image_url.as_deref(),
        _ => None,
    }));

    debug!(
        "Resolving {} placements: {} vouchers, {} sponsors, {} assets",
        contents.len(),
        voucher_ids.len(),
        sponsor_ids.len(),
        asset_urls.len()
    );

    let vouchers = async {
        if voucher_ids.is_empty() {
            Ok(HashMap::new())
        } else {
            services.vouchers.get_vouchers_by_ids(&voucher_ids).await
        }
    };
    let lookups = async {
        tokio::try_join!(
            vouchers,
            fetch_providers(services, &sponsor_ids),
            issue_codes(services, &voucher_slots)
        )
    };
    let (lookups, assets) = tokio::join!(lookups, fetch_assets(services, &asset_urls));
    let (vouchers, mut providers, (mut codes, mut payloads)) = lookups?;

    let missing: Vec<String> = voucher_ids
        .iter()
        .filter(|id| !vouchers.contains_key(*id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ResolveError::MissingVouchers(missing));
    }

    // Names of voucher issuers are nice to have; a failed lookup drops the line.
    let mut issuer_ids = distinct(
        vouchers
            .values()
            .map(|voucher| voucher.provider_id.as_str())
            .filter(|id| !providers.contains_key(*id)),
    );
    issuer_ids.sort();
    let issuers = join_all(issuer_ids.iter().map(|id| services.providers.get_provider(id))).await;
    for (id, result) in issuer_ids.iter().zip(issuers) {
        match result {
            Ok(provider) => {
                providers.insert(id.clone(), provider);
            }
            Err(err) => warn!("Provider lookup for {id} failed: {err}"),
        }
    }

    let mut blocks = Vec::with_capacity(contents.len());
    for (index, content) in contents.iter().enumerate() {
        let block = match content {
            PlacementContent::Voucher { voucher_id } => {
                let summary = vouchers
                    .get(voucher_id)
                    .ok_or_else(|| ResolveError::MissingVouchers(vec![voucher_id.clone()]))?;
                let code = codes.remove(&index).ok_or_else(|| {
                    ResolveError::Upstream(format!("No short code issued for voucher {voucher_id}"))
                })?;
                let title = summary
                    .title
                    .pick(locale)
                    .unwrap_or(summary.id.as_str())
                    .to_string();
                let description = summary
                    .description
                    .pick(locale)
                    .filter(|text| !text.trim().is_empty())
                    .map(str::to_string);

                ResolvedBlock::Voucher(ResolvedVoucher {
                    voucher_id: voucher_id.clone(),
                    title,
                    description,
                    discount: summary.discount.label(),
                    provider_name: providers
                        .get(&summary.provider_id)
                        .map(|p| p.business_name.clone()),
                    expires_at: summary.expires_at.or(code.expires_at),
                    qr_payload: payloads.remove(&qr_key(index)),
                    short_code: code.short_code,
                    checksum: code.checksum,
                })
            }
            PlacementContent::Image { image_url, caption } => ResolvedBlock::Image {
                asset: asset_for(&assets, image_url),
                caption: caption.clone(),
            },
            PlacementContent::Ad {
                title,
                description,
                image_url,
            } => ResolvedBlock::Ad {
                title: title.clone(),
                description: description.clone(),
                image: image_url.as_deref().map(|url| asset_for(&assets, url)),
            },
            PlacementContent::Sponsored {
                provider_id,
                title,
                description,
            } => ResolvedBlock::Sponsored {
                title: title.clone(),
                description: description.clone(),
                provider_name: providers
                    .get(provider_id)
                    .map(|p| p.business_name.clone())
                    .unwrap_or_else(|| provider_id.clone()),
            },
        };
        blocks.push(block);
    }

    if voucher_ids.is_empty() && !blocks.iter().any(ResolvedBlock::has_content) {
        return Err(ResolveError::NoVouchers);
    }

    Ok(blocks)
}

fn qr_key(index: usize) -> String {
    format!("placement-{index}")
}

/// Distinct ids in first-seen order
fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

fn asset_for(assets: &HashMap<String, Asset>, url: &str) -> Asset {
    assets.get(url).cloned().unwrap_or_else(|| Asset::Unavailable {
        url: url.to_string(),
        reason: "not fetched".to_string(),
    })
}

async fn fetch_providers(
    services: &ContentServices,
    ids: &[String],
) -> UpstreamResult<HashMap<String, Provider>> {
    let providers = try_join_all(ids.iter().map(|id| services.providers.get_provider(id))).await?;
    Ok(ids.iter().cloned().zip(providers).collect())
}

/// One short code per voucher placement, then one batch QR call
async fn issue_codes(
    services: &ContentServices,
    slots: &[(usize, &str)],
) -> UpstreamResult<(HashMap<usize, ShortCode>, HashMap<String, String>)> {
    if slots.is_empty() {
        return Ok((HashMap::new(), HashMap::new()));
    }

    let codes = try_join_all(
        slots
            .iter()
            .map(|(_, voucher_id)| services.codes.generate_short_code(voucher_id)),
    )
    .await?;

    let requests: Vec<QrRequest> = slots
        .iter()
        .zip(&codes)
        .map(|((index, voucher_id), code)| QrRequest {
            key: qr_key(*index),
            voucher_id: voucher_id.to_string(),
            short_code: code.short_code.clone(),
        })
        .collect();
    let payloads = services.codes.generate_batch_qr_payloads(&requests).await?;

    let codes = slots.iter().map(|(index, _)| *index).zip(codes).collect();
    Ok((codes, payloads))
}

async fn fetch_assets(services: &ContentServices, urls: &[String]) -> HashMap<String, Asset> {
    let fetched = join_all(urls.iter().map(|url| async move {
        let asset = match services.assets.fetch(url).await {
            Ok(bytes) => Asset::Loaded(bytes),
            Err(err) => {
                warn!("Asset {url} unavailable: {err}");
                Asset::Unavailable {
                    url: url.clone(),
                    reason: err.to_string(),
                }
            }
        };
        (url.clone(), asset)
    }))
    .await;
    fetched.into_iter().collect()
}
