pub mod config;
pub mod harvest;
pub mod harvester;
pub mod model;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types for convenience
pub use config::*;
pub use harvest::*;
pub use harvester::*;
pub use model::*;
pub use traits::*;
