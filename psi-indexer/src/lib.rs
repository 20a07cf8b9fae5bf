//! PSI Indexer — orchestrates normalize -> enumerate -> key -> store for
//! ingestion (C6, spec §4.6).

mod indexer;
mod infer;

pub use indexer::{BulkSummary, FieldHint, IngestItem, Indexer};
pub use infer::infer_field;
