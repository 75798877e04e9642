pub mod config;
pub mod conflict;
pub mod error;
pub mod logging;
pub mod query;
pub mod reconcile;
pub mod store;

pub use config::StoreConfig;
pub use conflict::ConflictWarning;
pub use error::EngineError;
pub use logging::{default_log_level, init_logging, logging_status};
pub use query::{
    Direction, FieldRef, GroupTotal, Page, PageRequest, Predicate, Query, Sort, Summary, summarize, view,
};
pub use reconcile::{DroppedRecord, ImportMode, ImportPolicy, ImportReport};
pub use store::{Committed, EntityStore, Export, OnConflict, PersistenceWarning, read_payload};
