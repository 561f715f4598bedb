pub mod api;
pub mod catalog;
pub mod config;
pub mod deep_scan;
pub mod feedback;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod scan_queue;
pub mod staleness;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use api::{RecommendationApi, VineApiClient};
pub use catalog::{CatalogStore, MemoryCatalog, SqliteCatalog};
pub use config::AppConfig;
pub use feedback::{FeedbackAction, FeedbackHandler};
pub use models::{Item, ItemDescriptor, Variant, VariantMap};
pub use orchestrator::{ScanOrchestrator, VisitSummary};
pub use render::{ConsoleRenderer, ElementHandle, ItemView, Renderer};
pub use scan_queue::ScanQueue;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
