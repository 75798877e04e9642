pub mod domains;
pub mod entity;
pub mod error;
pub mod field_value;
pub mod ids;
pub mod schema;
pub mod timestamp;

pub use entity::{Entity, Fields};
pub use error::{CoreError, FieldIssue, Problem, ValidationError};
pub use field_value::FieldValue;
pub use ids::EntityId;
pub use schema::{ConflictRule, EntitySchema, FieldKind, FieldRule};
pub use timestamp::{Clock, Timestamp};
