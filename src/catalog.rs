//! Durable item catalog.
//!
//! Records are keyed by item key and only ever replaced whole: callers read,
//! modify and [`CatalogStore::upsert`] the full record. Records are never
//! deleted; hiding an item is a field on the record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;

use crate::config::DatabaseConfig;
use crate::models::Item;
use crate::utils::error::{AppError, Result};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, item_key: &str) -> Result<Option<Item>>;

    /// Full replace of the record stored under `item.item_key`.
    async fn upsert(&self, item: &Item) -> Result<()>;

    /// Most recently found items first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Item>>;
}

#[derive(Debug, FromRow)]
struct ItemRow {
    item_key: String,
    found_date: DateTime<Utc>,
    marketplace_id: String,
    product_name: String,
    image_url: String,
    initial_recommendation_type: String,
    session_recommendation_id: String,
    has_variant_family: bool,
    deep_key: String,
    last_scan_date: Option<DateTime<Utc>>,
    hidden: bool,
    interested: Option<bool>,
    variants_json: String,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self> {
        Ok(Item {
            item_key: row.item_key,
            found_date: row.found_date,
            marketplace_id: row.marketplace_id,
            product_name: row.product_name,
            image_url: row.image_url,
            initial_recommendation_type: row.initial_recommendation_type,
            session_recommendation_id: row.session_recommendation_id,
            has_variant_family: row.has_variant_family,
            deep_key: row.deep_key,
            last_scan_date: row.last_scan_date,
            variants: serde_json::from_str(&row.variants_json)?,
            hidden: row.hidden,
            interested: row.interested,
        })
    }
}

const SELECT_ITEM: &str = "SELECT item_key, found_date, marketplace_id, product_name, image_url, \
     initial_recommendation_type, session_recommendation_id, has_variant_family, deep_key, \
     last_scan_date, hidden, interested, variants_json FROM items";

/// SQLite-backed catalog. The schema is created by the embedded migrations.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn get(&self, item_key: &str) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{} WHERE item_key = ?", SELECT_ITEM))
            .bind(item_key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }

    async fn upsert(&self, item: &Item) -> Result<()> {
        let variants_json = serde_json::to_string(&item.variants)?;

        sqlx::query(
            r#"
            INSERT INTO items (
                item_key, found_date, marketplace_id, product_name, image_url,
                initial_recommendation_type, session_recommendation_id, has_variant_family,
                deep_key, last_scan_date, hidden, interested, variants_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_key) DO UPDATE SET
                found_date = excluded.found_date,
                marketplace_id = excluded.marketplace_id,
                product_name = excluded.product_name,
                image_url = excluded.image_url,
                initial_recommendation_type = excluded.initial_recommendation_type,
                session_recommendation_id = excluded.session_recommendation_id,
                has_variant_family = excluded.has_variant_family,
                deep_key = excluded.deep_key,
                last_scan_date = excluded.last_scan_date,
                hidden = excluded.hidden,
                interested = excluded.interested,
                variants_json = excluded.variants_json
            "#,
        )
        .bind(&item.item_key)
        .bind(item.found_date)
        .bind(&item.marketplace_id)
        .bind(&item.product_name)
        .bind(&item.image_url)
        .bind(&item.initial_recommendation_type)
        .bind(&item.session_recommendation_id)
        .bind(item.has_variant_family)
        .bind(&item.deep_key)
        .bind(item.last_scan_date)
        .bind(item.hidden)
        .bind(item.interested)
        .bind(variants_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> =
            sqlx::query_as(&format!("{} ORDER BY found_date DESC LIMIT ?", SELECT_ITEM))
                .bind(i64::try_from(limit).unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Item::try_from).collect()
    }
}

/// In-process catalog for tests and dry runs. Not durable.
#[derive(Default)]
pub struct MemoryCatalog {
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get(&self, item_key: &str) -> Result<Option<Item>> {
        Ok(self.items.read().await.get(item_key).cloned())
    }

    async fn upsert(&self, item: &Item) -> Result<()> {
        self.items
            .write()
            .await
            .insert(item.item_key.clone(), item.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Item>> {
        let items = self.items.read().await;
        let mut recent: Vec<Item> = items.values().cloned().collect();
        recent.sort_by(|a, b| b.found_date.cmp(&a.found_date));
        recent.truncate(limit);
        Ok(recent)
    }
}
