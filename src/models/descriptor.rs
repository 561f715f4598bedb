use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::error::{AppError, Result};

/// Raw attributes of one listed element, as extracted by the page scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    #[validate(length(min = 1))]
    pub item_key: String,
    #[validate(length(min = 1))]
    pub marketplace_id: String,
    #[validate(length(min = 1))]
    pub session_recommendation_id: String,
    pub product_name: String,
    pub image_url: String,
    pub initial_recommendation_type: String,
    pub has_variant_family: bool,
    #[validate(length(min = 1))]
    pub deep_key: String,
}

impl ItemDescriptor {
    /// Non-empty key fields, and a session recommendation id of the form
    /// `{marketplace}#{item key}` that addresses this descriptor's item.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::InvalidDescriptor(format!("{:?}: {}", self.item_key, e)))?;

        match split_recommendation_id(&self.session_recommendation_id) {
            Some((_, item_key)) if item_key == self.item_key => Ok(()),
            _ => Err(AppError::InvalidDescriptor(format!(
                "{:?}: recommendation id {:?} does not address this item",
                self.item_key, self.session_recommendation_id
            ))),
        }
    }
}

/// Splits a listing recommendation id of the form `{marketplace}#{item key}`.
pub fn split_recommendation_id(recommendation_id: &str) -> Option<(&str, &str)> {
    let (marketplace_id, item_key) = recommendation_id.split_once('#')?;
    if marketplace_id.is_empty() || item_key.is_empty() {
        return None;
    }
    Some((marketplace_id, item_key))
}
