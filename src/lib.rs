// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod audit;
pub mod catalog;
pub mod denylist;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod reconcile;
pub mod runlog;
pub mod scrape;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::denylist::RejectList;
pub use crate::normalize::normalize;
