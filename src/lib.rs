pub mod config;
pub mod dendrogram;
pub mod error;
pub mod labeler;
pub mod linkage;
pub mod metric;
pub mod orchestrator;
pub mod partition;
pub mod spec_cache;
pub mod table;
pub mod worker;

pub use error::*;
