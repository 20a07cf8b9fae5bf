//! PSI Service — dependency injection, collaborator mocks, background
//! retention sweep, and the CLI driver (spec §6, §9).

mod collaborators;
mod core;
mod response;
mod sweep;

pub use collaborators::{KeyManagementService, MockKms, MockRecordStore, RecordStore};
pub use core::{load_config, Core, ServiceError};
pub use response::{finalize, QueryResponse};
pub use sweep::{retention_sweep_task, SweepConfig, SweepMetrics, SweepSnapshot};
