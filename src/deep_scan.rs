use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{RecommendationApi, VariantDetail};
use crate::config::ScanConfig;
use crate::models::{Item, Variant, VariantMap};

/// Extra variants detail-fetched beyond `max_variants_scanned`. The limit is
/// checked after the per-variant counter is bumped, so a cap of N scans N + 1.
pub const VARIANT_SCAN_OVERSHOOT: usize = 1;

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub item: Item,
    /// False when the item was hidden and no network activity happened.
    pub scanned: bool,
    pub variants_detailed: usize,
    pub remote_failures: usize,
}

pub struct DeepScanWorker {
    api: Arc<dyn RecommendationApi>,
    max_variants_scanned: usize,
    inner_scan_delay: Duration,
}

impl DeepScanWorker {
    pub fn new(api: Arc<dyn RecommendationApi>, config: &ScanConfig) -> Self {
        Self {
            api,
            max_variants_scanned: config.max_variants_scanned,
            inner_scan_delay: config.inner_scan_delay(),
        }
    }

    pub fn variant_scan_limit(&self) -> usize {
        self.max_variants_scanned + VARIANT_SCAN_OVERSHOOT
    }

    /// Refreshes `item.variants` from the remote API. Never fails: remote
    /// errors leave the affected data unset.
    pub async fn scan(&self, mut item: Item) -> ScanOutcome {
        if item.hidden {
            info!("Skipping deep scan of hidden item {}", item.item_key);
            metrics::counter!("vineyard_scans_skipped_hidden_total").increment(1);
            return ScanOutcome {
                item,
                scanned: false,
                variants_detailed: 0,
                remote_failures: 0,
            };
        }

        info!("Deep scanning item {}", item.item_key);
        let mut remote_failures = 0;

        let mut variants: VariantMap = if item.has_variant_family {
            match self.api.variations(&item.session_recommendation_id).await {
                Ok(variations) => variations
                    .into_iter()
                    .map(|v| (v.asin, Variant::with_dimensions(v.dimensions)))
                    .collect(),
                Err(e) => {
                    warn!("Variant discovery failed for {}: {}", item.item_key, e);
                    remote_failures += 1;
                    VariantMap::new()
                }
            }
        } else {
            let mut own = VariantMap::new();
            own.insert(item.item_key.clone(), Variant::default());
            own
        };

        let to_scan: Vec<String> = variants
            .keys()
            .take(self.variant_scan_limit())
            .cloned()
            .collect();

        let mut variants_detailed = 0;
        for (index, variant_id) in to_scan.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inner_scan_delay).await;
            }

            debug!("Fetching variant {} of {}", variant_id, item.item_key);
            match self
                .api
                .variant_detail(&item.session_recommendation_id, variant_id)
                .await
            {
                Ok(detail) => {
                    if let Some(variant) = variants.get_mut(variant_id) {
                        apply_detail(variant, detail);
                        variants_detailed += 1;
                    }
                }
                Err(e) => {
                    warn!("Variant detail failed for {} / {}: {}", item.item_key, variant_id, e);
                    remote_failures += 1;
                }
            }
        }

        if remote_failures > 0 {
            metrics::counter!("vineyard_remote_failures_total").increment(remote_failures as u64);
        }
        metrics::counter!("vineyard_scans_total").increment(1);

        item.variants = variants;
        item.last_scan_date = Some(Utc::now());

        ScanOutcome {
            item,
            scanned: true,
            variants_detailed,
            remote_failures,
        }
    }
}

fn apply_detail(variant: &mut Variant, detail: VariantDetail) {
    variant.contributors = detail.by_line_contributors;
    variant.limited_quantity = detail.limited_quantity;
    variant.catalog_size = detail.catalog_size;
    variant.tax_value = detail.tax_value;
    variant.tax_currency = detail.tax_currency;
}
