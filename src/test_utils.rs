//! Shared fixtures for unit tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use tokio::time::Instant;

use crate::api::{RecommendationApi, VariantDetail, Variation};
use crate::catalog::{CatalogStore, MemoryCatalog};
use crate::models::{Item, ItemDescriptor, Variant};
use crate::render::{ElementHandle, Renderer};
use crate::utils::error::{AppError, Result};

pub fn sample_descriptor() -> ItemDescriptor {
    ItemDescriptor {
        item_key: "B0TEST0001".to_string(),
        marketplace_id: "ATVPDKIKX0DER".to_string(),
        session_recommendation_id: "ATVPDKIKX0DER#B0TEST0001".to_string(),
        product_name: "Stainless Water Bottle".to_string(),
        image_url: "https://images.example.com/bottle.jpg".to_string(),
        initial_recommendation_type: "VENDOR_TARGETED".to_string(),
        has_variant_family: false,
        deep_key: "B0TEST0001".to_string(),
    }
}

pub fn descriptor_for(item_key: &str) -> ItemDescriptor {
    ItemDescriptor {
        item_key: item_key.to_string(),
        session_recommendation_id: format!("ATVPDKIKX0DER#{}", item_key),
        deep_key: item_key.to_string(),
        ..sample_descriptor()
    }
}

/// An item found a day ago and never scanned.
pub fn sample_item() -> Item {
    Item::discovered(sample_descriptor(), Utc::now() - Duration::days(1))
}

pub fn item_for(item_key: &str) -> Item {
    Item::discovered(descriptor_for(item_key), Utc::now() - Duration::days(1))
}

pub fn priced_variant(tax_value: f64) -> Variant {
    Variant {
        dimensions: Some(json!({"color": "Blue"})),
        contributors: Some(vec![json!("Acme")]),
        limited_quantity: Some(false),
        catalog_size: Some(12.0),
        tax_value: Some(tax_value),
        tax_currency: Some("USD".to_string()),
    }
}

/// Scripted stand-in for the recommendations API. Records every call and the
/// highest number of calls that were ever in flight at once.
pub struct FakeApi {
    families: HashMap<String, Vec<Variation>>,
    fail_discovery: bool,
    call_delay: StdDuration,
    calls: Mutex<Vec<(String, Instant)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            fail_discovery: false,
            call_delay: StdDuration::ZERO,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_call_delay(mut self, delay: StdDuration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn with_family(mut self, recommendation_id: &str, variant_ids: &[&str]) -> Self {
        let variations = variant_ids
            .iter()
            .map(|id| Variation {
                asin: id.to_string(),
                dimensions: None,
            })
            .collect();
        self.families.insert(recommendation_id.to_string(), variations);
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: String) {
        self.calls.lock().unwrap().push((call, Instant::now()));
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(self.call_delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecommendationApi for FakeApi {
    async fn variations(&self, recommendation_id: &str) -> Result<Vec<Variation>> {
        self.enter(format!("variations:{}", recommendation_id)).await;
        if self.fail_discovery {
            return Err(AppError::RemoteStatus {
                endpoint: format!("/vine/api/recommendations/{}", recommendation_id),
                status: 500,
            });
        }
        Ok(self.families.get(recommendation_id).cloned().unwrap_or_default())
    }

    async fn variant_detail(&self, recommendation_id: &str, variant_id: &str) -> Result<VariantDetail> {
        self.enter(format!("detail:{}:{}", recommendation_id, variant_id)).await;
        Ok(VariantDetail {
            tax_value: Some(9.99),
            tax_currency: Some("USD".to_string()),
            ..VariantDetail::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Loading,
    Full,
}

#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<(RenderKind, ElementHandle, Item)>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(RenderKind, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _, item)| (*kind, item.item_key.clone()))
            .collect()
    }

    pub fn last_render_of(&self, item_key: &str) -> Option<Item> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(kind, _, item)| *kind == RenderKind::Full && item.item_key == item_key)
            .map(|(_, _, item)| item.clone())
    }
}

impl Renderer for RecordingRenderer {
    fn render_loading(&self, handle: &ElementHandle, item: &Item) {
        self.calls
            .lock()
            .unwrap()
            .push((RenderKind::Loading, handle.clone(), item.clone()));
    }

    fn render(&self, handle: &ElementHandle, item: &Item) {
        self.calls
            .lock()
            .unwrap()
            .push((RenderKind::Full, handle.clone(), item.clone()));
    }
}

/// In-memory catalog whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyCatalog {
    inner: MemoryCatalog,
    fail_upserts: AtomicBool,
}

impl FlakyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogStore for FlakyCatalog {
    async fn get(&self, item_key: &str) -> Result<Option<Item>> {
        self.inner.get(item_key).await
    }

    async fn upsert(&self, item: &Item) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.upsert(item).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Item>> {
        self.inner.list_recent(limit).await
    }
}
