//! # Catalog Synchronization Engine
//!
//! Keeps a merchant's internal catalog and a WooCommerce-compatible
//! storefront consistent. The engine is stateless between invocations:
//! durable rows (listings, runs, run items) are its only memory, so any
//! number of callers can drive it concurrently.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   preview    ┌─────────────┐   create_run   ┌──────────────┐
//! │  Caller  │─────────────►│ Diff Engine │───────────────►│ Orchestrator │
//! └──────────┘  (read-only) └─────────────┘                └──────┬───────┘
//!                                                                 │ queued items
//!                                 ┌───────────────┐               ▼
//!                                 │   Connector   │◄──────┌──────────────┐
//!                                 │ (storefront)  │       │    Worker    │
//!                                 └───────────────┘       └──────┬───────┘
//!                                                                │ ERROR / DEAD
//!                                 ┌───────────────┐              ▼
//!                                 │    Listing    │       ┌──────────────┐
//!                                 │   Registry    │       │ Retry Manager│
//!                                 └───────────────┘       └──────────────┘
//! ```
//!
//! The worker's claim step (`QUEUED → RUNNING`) is the single concurrency
//! choke point; the paired listing mutation on success happens in the same
//! transaction as the item transition.

pub mod backoff;
pub mod config;
pub mod error;
pub mod preview;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod runs;
pub mod worker;

pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use preview::{
    DiffOptions, FieldChange, ListingSnapshot, Preview, PreviewItem, PreviewService,
    PreviewSummary, ProductSnapshot,
};
pub use provider::ConnectorProvider;
pub use registry::{LinkResult, ListingRegistry};
pub use retry::{RetryManager, RetryOutcome};
pub use runs::RunOrchestrator;
pub use worker::{
    classify_failure, CatalogWorker, FailureDisposition, ItemOutcome, WorkerItemResult,
    WorkerReport,
};
