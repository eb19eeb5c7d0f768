#![forbid(unsafe_code)]

//! Composite index definitions, the subset coverage catalog, and startup
//! verification of the definitions persisted in the store.

mod catalog;
mod maintenance;
mod types;

pub use catalog::{standard_definitions, Coverage, IndexCatalog};
pub use maintenance::{
    IndexMaintenance, MaintenanceReport, MaintenanceState, DEFAULT_DESIGN_ID,
};
pub use types::{IndexDef, IndexRule, ReduceRule};
