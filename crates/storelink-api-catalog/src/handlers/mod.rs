//! Request handlers.

pub mod catalog;
pub mod listings;
pub mod runs;
pub mod stores;
pub mod worker;

pub use catalog::*;
pub use listings::*;
pub use runs::*;
pub use stores::*;
pub use worker::*;
