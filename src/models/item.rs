use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ItemDescriptor, VariantMap};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_key: String,
    pub found_date: DateTime<Utc>,
    pub marketplace_id: String,
    pub product_name: String,
    pub image_url: String,
    pub initial_recommendation_type: String,

    // Only meaningful within the current page visit
    pub session_recommendation_id: String,

    pub has_variant_family: bool,
    pub deep_key: String,

    // Scan state
    pub last_scan_date: Option<DateTime<Utc>>,
    pub variants: VariantMap,

    // User classification
    pub hidden: bool,
    pub interested: Option<bool>,
}

impl Item {
    /// Builds the catalog record for a descriptor seen for the first time.
    pub fn discovered(descriptor: ItemDescriptor, found_date: DateTime<Utc>) -> Self {
        Self {
            item_key: descriptor.item_key,
            found_date,
            marketplace_id: descriptor.marketplace_id,
            product_name: descriptor.product_name,
            image_url: descriptor.image_url,
            initial_recommendation_type: descriptor.initial_recommendation_type,
            session_recommendation_id: descriptor.session_recommendation_id,
            has_variant_family: descriptor.has_variant_family,
            deep_key: descriptor.deep_key,
            last_scan_date: None,
            variants: VariantMap::new(),
            hidden: false,
            interested: None,
        }
    }

    /// `interested == true` resets to undecided; anything else becomes
    /// interested and unhides the item.
    pub fn toggle_interested(&mut self) {
        if self.interested == Some(true) {
            self.interested = None;
        } else {
            self.hidden = false;
            self.interested = Some(true);
        }
    }

    /// `interested == false` resets to undecided; anything else becomes not
    /// interested. Hidden state is left alone.
    pub fn toggle_not_interested(&mut self) {
        if self.interested == Some(false) {
            self.interested = None;
        } else {
            self.interested = Some(false);
        }
    }

    /// Flips `hidden` and always clears the interest classification.
    pub fn toggle_hidden(&mut self) {
        self.hidden = !self.hidden;
        self.interested = None;
    }
}
