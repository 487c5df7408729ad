//! Database models.

pub mod listing;
pub mod product;
pub mod run;
pub mod run_item;
pub mod store;
pub mod sync_log;

pub use listing::{Listing, ListingStatus};
pub use product::{NewProduct, Product, ProductPatch};
pub use run::{CatalogRun, RunStatus, RunSummary, SyncOperation};
pub use run_item::{ItemAction, ItemStatus, ItemStatusCounts, NewRunItem, RunItem};
pub use store::{Store, StoreStatus};
pub use sync_log::{LogLevel, SyncLogEntry};
