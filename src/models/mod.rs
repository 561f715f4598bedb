pub mod descriptor;
pub mod item;
pub mod variant;

// Re-exports for convenience
pub use descriptor::*;
pub use item::*;
pub use variant::*;
