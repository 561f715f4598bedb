use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::RecommendationApi;
use crate::catalog::CatalogStore;
use crate::config::AppConfig;
use crate::deep_scan::DeepScanWorker;
use crate::feedback::FeedbackHandler;
use crate::models::{Item, ItemDescriptor};
use crate::render::{ElementHandle, Renderer};
use crate::scan_queue::ScanQueue;
use crate::staleness::{ScanDecision, StalenessPolicy};
use crate::utils::error::Result;

/// Tally of one page visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitSummary {
    pub discovered: usize,
    pub created: usize,
    pub queued: usize,
    pub rendered_cached: usize,
    pub skipped_invalid: usize,
}

/// Wires the catalog, staleness policy, scan queue and feedback handler for
/// one running instance.
pub struct ScanOrchestrator {
    catalog: Arc<dyn CatalogStore>,
    renderer: Arc<dyn Renderer>,
    policy: StalenessPolicy,
    queue: ScanQueue,
    feedback: FeedbackHandler,
}

impl ScanOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        api: Arc<dyn RecommendationApi>,
        renderer: Arc<dyn Renderer>,
        config: &AppConfig,
    ) -> Self {
        let worker = DeepScanWorker::new(api, &config.scan);
        let queue = ScanQueue::new(worker, Arc::clone(&catalog), Arc::clone(&renderer), &config.scan);
        let feedback = FeedbackHandler::new(Arc::clone(&catalog), queue.clone(), Arc::clone(&renderer));

        Self {
            catalog,
            renderer,
            policy: StalenessPolicy::from_config(&config.scan),
            queue,
            feedback,
        }
    }

    pub fn queue(&self) -> &ScanQueue {
        &self.queue
    }

    pub fn feedback(&self) -> &FeedbackHandler {
        &self.feedback
    }

    /// Create-if-absent. An existing record keeps every field except the
    /// session recommendation id, which is refreshed for this visit. Returns
    /// the record and whether it was newly created.
    pub async fn reconcile(&self, descriptor: ItemDescriptor) -> Result<(Item, bool)> {
        match self.catalog.get(&descriptor.item_key).await? {
            Some(mut item) => {
                if item.session_recommendation_id != descriptor.session_recommendation_id {
                    item.session_recommendation_id = descriptor.session_recommendation_id;
                    self.catalog.upsert(&item).await?;
                }
                Ok((item, false))
            }
            None => {
                let item = Item::discovered(descriptor, Utc::now());
                self.catalog.upsert(&item).await?;
                info!("Discovered new item {}", item.item_key);
                metrics::counter!("vineyard_items_discovered_total").increment(1);
                Ok((item, true))
            }
        }
    }

    /// Handles every descriptor found on one visit of the listing page.
    /// Invalid descriptors are skipped; a storage failure aborts the visit.
    pub async fn visit_page(&self, descriptors: Vec<ItemDescriptor>) -> Result<VisitSummary> {
        let mut summary = VisitSummary {
            discovered: descriptors.len(),
            ..VisitSummary::default()
        };

        for descriptor in descriptors {
            if let Err(e) = descriptor.check() {
                warn!("Skipping descriptor: {}", e);
                summary.skipped_invalid += 1;
                continue;
            }

            let (item, created) = self.reconcile(descriptor).await?;
            if created {
                summary.created += 1;
            }

            let handle = ElementHandle::for_item(&item);
            let queued = self.queue.contains(&item.item_key);
            match self.policy.decide(&item, Utc::now(), queued) {
                ScanDecision::Enqueue => {
                    self.renderer.render_loading(&handle, &item);
                    self.queue.enqueue(item);
                    summary.queued += 1;
                }
                ScanDecision::RenderCached => {
                    debug!("Rendering {} from cache", item.item_key);
                    self.renderer.render(&handle, &item);
                    summary.rendered_cached += 1;
                }
            }
        }

        info!(
            "Page visit: {} items, {} new, {} queued, {} cached, {} invalid",
            summary.discovered, summary.created, summary.queued, summary.rendered_cached, summary.skipped_invalid
        );
        Ok(summary)
    }
}
