//! Visual state of cataloged items.
//!
//! The core never touches page structure. It hands an [`ElementHandle`] and
//! the item record to a [`Renderer`]; [`ItemView`] derives everything a
//! renderer needs to draw (dimming, highlight, price range, variant count).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::config::RenderConfig;
use crate::models::Item;

/// Identifies the listed element an item is drawn into. Listing elements are
/// addressed by the session recommendation id of the current page visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn for_item(item: &Item) -> Self {
        Self(item.session_recommendation_id.clone())
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives visual updates. Both calls replace whatever was previously drawn
/// for the handle.
pub trait Renderer: Send + Sync {
    fn render_loading(&self, handle: &ElementHandle, item: &Item);
    fn render(&self, handle: &ElementHandle, item: &Item);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Interested,
    NotInterested,
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceLabel {
    /// No variants populated yet.
    NotScanned,
    /// Variants exist but no detail fetch returned a price.
    Unavailable,
    Single { value: f64 },
    Range { low: f64, high: f64 },
}

impl PriceLabel {
    pub fn for_item(item: &Item) -> Self {
        if item.variants.is_empty() {
            return PriceLabel::NotScanned;
        }

        let mut prices = item.variants.values().filter_map(|v| v.tax_value);
        let Some(first) = prices.next() else {
            return PriceLabel::Unavailable;
        };
        let (low, high) = prices.fold((first, first), |(low, high), p| (low.min(p), high.max(p)));

        if low == high {
            PriceLabel::Single { value: low }
        } else {
            PriceLabel::Range { low, high }
        }
    }
}

impl fmt::Display for PriceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceLabel::NotScanned => write!(f, "Not Scanned"),
            PriceLabel::Unavailable => write!(f, "Price unavailable"),
            PriceLabel::Single { value } => write!(f, "${}", value),
            PriceLabel::Range { low, high } => write!(f, "${} - ${}", low, high),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub item_key: String,
    pub product_name: String,
    pub loading: bool,
    pub opacity: f32,
    pub highlight: Option<Highlight>,
    pub price: PriceLabel,
    pub variant_count: usize,
    pub interested_active: bool,
    pub not_interested_active: bool,
    pub hidden_active: bool,
}

impl ItemView {
    pub fn build(item: &Item, now: DateTime<Utc>, config: &RenderConfig, loading: bool) -> Self {
        let highlight = match item.interested {
            Some(true) => Some(Highlight::Interested),
            Some(false) => Some(Highlight::NotInterested),
            None if !item.hidden && now - item.found_date < config.new_period() => {
                Some(Highlight::New)
            }
            None => None,
        };

        Self {
            item_key: item.item_key.clone(),
            product_name: item.product_name.clone(),
            loading,
            opacity: if item.hidden { config.hidden_opacity } else { 1.0 },
            highlight,
            price: PriceLabel::for_item(item),
            variant_count: item.variants.len(),
            interested_active: item.interested == Some(true),
            not_interested_active: item.interested == Some(false),
            hidden_active: item.hidden,
        }
    }
}

impl fmt::Display for ItemView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loading {
            return write!(f, "[{}] {} | Loading ...", self.item_key, self.product_name);
        }

        write!(
            f,
            "[{}] {} | {} | {} variants",
            self.item_key, self.product_name, self.price, self.variant_count
        )?;
        match self.highlight {
            Some(Highlight::Interested) => write!(f, " | interested")?,
            Some(Highlight::NotInterested) => write!(f, " | not interested")?,
            Some(Highlight::New) => write!(f, " | new")?,
            None => {}
        }
        if self.hidden_active {
            write!(f, " | hidden")?;
        }
        Ok(())
    }
}

/// Writes one line per render to stdout.
pub struct ConsoleRenderer {
    config: RenderConfig,
}

impl ConsoleRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl Renderer for ConsoleRenderer {
    fn render_loading(&self, _handle: &ElementHandle, item: &Item) {
        println!("{}", ItemView::build(item, Utc::now(), &self.config, true));
    }

    fn render(&self, _handle: &ElementHandle, item: &Item) {
        println!("{}", ItemView::build(item, Utc::now(), &self.config, false));
    }
}
