//! User classification actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::models::Item;
use crate::render::{ElementHandle, Renderer};
use crate::scan_queue::ScanQueue;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackAction {
    Interested,
    NotInterested,
    Hidden,
}

impl FeedbackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackAction::Interested => "interested",
            FeedbackAction::NotInterested => "not-interested",
            FeedbackAction::Hidden => "hidden",
        }
    }
}

impl FromStr for FeedbackAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interested" | "interesting" => Ok(FeedbackAction::Interested),
            "not-interested" | "not_interested" | "notinterested" | "uninterested" => {
                Ok(FeedbackAction::NotInterested)
            }
            "hidden" | "hide" | "trash" => Ok(FeedbackAction::Hidden),
            _ => Err(AppError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies classification actions to cataloged items and re-renders them.
///
/// Every action is a read, mutate, full upsert, render sequence. Unknown
/// item keys are a no-op and yield `Ok(None)`. Storage failures are returned
/// to the caller and nothing is rendered.
#[derive(Clone)]
pub struct FeedbackHandler {
    catalog: Arc<dyn CatalogStore>,
    queue: ScanQueue,
    renderer: Arc<dyn Renderer>,
}

impl FeedbackHandler {
    pub fn new(catalog: Arc<dyn CatalogStore>, queue: ScanQueue, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            catalog,
            queue,
            renderer,
        }
    }

    pub async fn dispatch(&self, action: FeedbackAction, item_key: &str) -> Result<Option<Item>> {
        match action {
            FeedbackAction::Interested => self.mark_interested(item_key).await,
            FeedbackAction::NotInterested => self.mark_not_interested(item_key).await,
            FeedbackAction::Hidden => self.mark_hidden(item_key).await,
        }
    }

    pub async fn mark_interested(&self, item_key: &str) -> Result<Option<Item>> {
        self.apply(item_key, FeedbackAction::Interested, Item::toggle_interested)
            .await
    }

    pub async fn mark_not_interested(&self, item_key: &str) -> Result<Option<Item>> {
        self.apply(item_key, FeedbackAction::NotInterested, Item::toggle_not_interested)
            .await
    }

    /// Toggles `hidden` and drops any still-pending scan of the item.
    pub async fn mark_hidden(&self, item_key: &str) -> Result<Option<Item>> {
        let updated = self
            .apply(item_key, FeedbackAction::Hidden, Item::toggle_hidden)
            .await?;
        self.queue.remove(item_key);
        Ok(updated)
    }

    async fn apply(
        &self,
        item_key: &str,
        action: FeedbackAction,
        mutate: fn(&mut Item),
    ) -> Result<Option<Item>> {
        let Some(mut item) = self.catalog.get(item_key).await? else {
            info!("Ignoring {} for unknown item {}", action, item_key);
            return Ok(None);
        };

        mutate(&mut item);
        // A hidden item never carries an interest classification
        if item.hidden {
            item.interested = None;
        }

        self.catalog.upsert(&item).await?;
        info!(
            "Marked {} as {} (hidden: {}, interested: {:?})",
            item_key, action, item.hidden, item.interested
        );

        self.renderer.render(&ElementHandle::for_item(&item), &item);
        Ok(Some(item))
    }
}
